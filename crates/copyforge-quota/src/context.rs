use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use copyforge_common::{ProfileSource, SessionProvider};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use crate::{GateDecision, QuotaLimits, QuotaStore, Result};

/// How often the periodic reconciliation task polls the profile endpoint.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Everything consumers observe: the current quota record plus whether the
/// session is authenticated.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaState {
    pub quota: QuotaLimits,
    pub is_authenticated: bool,
}

/// Process-wide holder of quota state.
///
/// One instance is built at startup and handed to every consumer; there is
/// no hidden global. State changes go out over a watch channel so the UI
/// can subscribe instead of polling. Local counters are an optimistic
/// cache: the backend count is authoritative and overwrites them on every
/// reconciliation.
pub struct QuotaContext {
    store: QuotaStore,
    profile: Arc<dyn ProfileSource>,
    state: watch::Sender<QuotaState>,
}

impl QuotaContext {
    /// Build a context from already-decided state. No I/O beyond the
    /// initial store read.
    pub fn new(store: QuotaStore, profile: Arc<dyn ProfileSource>, is_authenticated: bool) -> Arc<Self> {
        let quota = store.load();
        let (state, _) = watch::channel(QuotaState {
            quota,
            is_authenticated,
        });
        Arc::new(Self {
            store,
            profile,
            state,
        })
    }

    /// Build the context the way the app does at startup: read the
    /// persisted quota, ask the session whether it is valid, and if so run
    /// one reconciliation before returning. A failed first sync is logged
    /// and ignored.
    pub async fn initialize(
        store: QuotaStore,
        profile: Arc<dyn ProfileSource>,
        session: &dyn SessionProvider,
    ) -> Arc<Self> {
        let ctx = Self::new(store, profile, session.is_valid());
        if ctx.is_authenticated() {
            if let Err(err) = ctx.sync_with_backend().await {
                warn!("Initial quota sync failed: {}", err);
            }
        }
        ctx
    }

    pub fn snapshot(&self) -> QuotaState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Subscribe to state changes. The receiver immediately holds the
    /// current value.
    pub fn subscribe(&self) -> watch::Receiver<QuotaState> {
        self.state.subscribe()
    }

    /// Flip the authentication flag. The periodic sync task watches this
    /// and shuts down when it goes false; starting a task again after
    /// sign-in is the caller's call.
    pub fn set_authenticated(&self, is_authenticated: bool) {
        self.state.send_if_modified(|state| {
            if state.is_authenticated == is_authenticated {
                false
            } else {
                state.is_authenticated = is_authenticated;
                true
            }
        });
    }

    /// Pull authoritative counts from the profile endpoint and merge them
    /// over local state: plan (with its limit mirrors), both generation
    /// counters, and today's tool count. Local-only fields, the demo
    /// lockout and the weekly tool counter among them, are preserved. On
    /// failure local state stays untouched.
    pub async fn sync_with_backend(&self) -> Result<()> {
        let profile = self.profile.fetch_profile().await?;

        let mut quota = self.snapshot().quota;
        if quota.plan != profile.plan {
            info!("Plan changed: {} -> {}", quota.plan, profile.plan);
            quota.apply_plan(profile.plan);
        }
        quota.today_generations = profile.today_generations;
        quota.week_generations = profile.week_generations;
        quota.tools_today = profile.tools_today;

        self.update_quota(quota)?;
        debug!("Quota reconciled with profile");
        Ok(())
    }

    /// Replace the in-memory and persisted record as one step. The store
    /// write happens first so a failed save leaves memory and disk agreeing
    /// on the old value.
    pub fn update_quota(&self, quota: QuotaLimits) -> Result<()> {
        self.store.save(&quota)?;
        self.state.send_modify(|state| state.quota = quota);
        Ok(())
    }

    /// Re-read the persisted record into memory, dropping whatever was
    /// there. For callers that mutated storage behind the context's back.
    pub fn refresh(&self) {
        let quota = self.store.load();
        self.state.send_modify(|state| state.quota = quota);
    }

    pub fn check_article_gate(&self) -> GateDecision {
        let state = self.snapshot();
        state
            .quota
            .check_article_gate(state.is_authenticated, Utc::now())
    }

    pub fn check_tool_gate(&self) -> GateDecision {
        let state = self.snapshot();
        state.quota.check_tool_gate(state.is_authenticated)
    }

    /// Record a successful article generation against the local cache.
    pub fn record_article_generation(&self) -> Result<()> {
        let state = self.snapshot();
        let mut quota = state.quota;
        quota.record_article_generation(state.is_authenticated, Utc::now());
        self.update_quota(quota)
    }

    /// Record a successful tool call against the local cache.
    pub fn record_tool_usage(&self) -> Result<()> {
        let mut quota = self.snapshot().quota;
        quota.record_tool_usage(Utc::now());
        self.update_quota(quota)
    }

    /// Inspect a post-checkout redirect URL. `upgrade=success` in the query
    /// means Stripe sent the user back from a completed checkout, so pull
    /// the new plan from the server right away. Returns whether the
    /// parameter was present.
    pub async fn handle_checkout_return(&self, redirect_url: &str) -> Result<bool> {
        let url = Url::parse(redirect_url)?;
        let upgraded = url
            .query_pairs()
            .any(|(key, value)| key == "upgrade" && value == "success");

        if upgraded {
            info!("Checkout success detected, syncing plan");
            self.sync_with_backend().await?;
        }
        Ok(upgraded)
    }

    /// Spawn the recurring reconciliation task. It re-syncs every
    /// [`SYNC_INTERVAL`] while the session stays authenticated and ends on
    /// its own once it is not. Dropping the returned handle aborts the
    /// task.
    pub fn start_auto_sync(self: &Arc<Self>) -> AutoSyncHandle {
        let ctx = Arc::clone(self);
        let mut state_rx = self.state.subscribe();

        let task = tokio::spawn(async move {
            let mut ticker = interval(SYNC_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and initialization has
            // already synced once, so skip it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !ctx.is_authenticated() {
                            break;
                        }
                        if let Err(err) = ctx.sync_with_backend().await {
                            warn!("Periodic quota sync failed: {}", err);
                        }
                    }
                    changed = state_rx.changed() => {
                        if changed.is_err() || !state_rx.borrow().is_authenticated {
                            break;
                        }
                    }
                }
            }
            debug!("Quota auto-sync stopped");
        });

        AutoSyncHandle { task }
    }
}

/// Handle owning the background reconciliation task.
pub struct AutoSyncHandle {
    task: JoinHandle<()>,
}

impl AutoSyncHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for AutoSyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
