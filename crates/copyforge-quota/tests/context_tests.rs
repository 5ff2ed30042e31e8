use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use copyforge_common::{Plan, ProfileError, ProfileSnapshot, ProfileSource, SessionProvider};
use copyforge_quota::{
    MemoryStorage, QuotaContext, QuotaLimits, QuotaStore, Storage, SYNC_INTERVAL,
};

struct StubProfile {
    response: Mutex<Result<ProfileSnapshot, String>>,
    calls: AtomicUsize,
}

impl StubProfile {
    fn returning(snapshot: ProfileSnapshot) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(snapshot)),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(message.to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileSource for StubProfile {
    async fn fetch_profile(&self) -> Result<ProfileSnapshot, ProfileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .lock()
            .unwrap()
            .clone()
            .map_err(ProfileError::Request)
    }
}

struct StubSession {
    valid: bool,
}

impl SessionProvider for StubSession {
    fn token(&self) -> Option<String> {
        self.valid.then(|| "token".to_string())
    }

    fn is_valid(&self) -> bool {
        self.valid
    }
}

fn pro_snapshot() -> ProfileSnapshot {
    ProfileSnapshot {
        plan: Plan::Pro,
        today_generations: 3,
        week_generations: 12,
        tools_today: 2,
    }
}

fn context_with(
    profile: Arc<StubProfile>,
    authenticated: bool,
) -> (Arc<QuotaContext>, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let store = QuotaStore::new(storage.clone() as Arc<dyn Storage>);
    let ctx = QuotaContext::new(store, profile, authenticated);
    (ctx, storage)
}

// Lets spawned tasks and watch wakeups run on the current-thread runtime.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_initialize_syncs_when_authenticated() {
    let profile = StubProfile::returning(pro_snapshot());
    let storage = Arc::new(MemoryStorage::new());
    let store = QuotaStore::new(storage.clone() as Arc<dyn Storage>);

    let session = StubSession { valid: true };
    let ctx = QuotaContext::initialize(store, profile.clone(), &session).await;

    assert_eq!(profile.call_count(), 1);
    let state = ctx.snapshot();
    assert!(state.is_authenticated);
    assert_eq!(state.quota.plan, Plan::Pro);
    assert_eq!(state.quota.today_generations, 3);
    assert_eq!(state.quota.week_generations, 12);
    assert_eq!(state.quota.tools_today, 2);
    // Mirrors follow the plan reported by the server.
    assert_eq!(state.quota.articles_per_day, 10);

    // The merged record was persisted.
    let reloaded = QuotaStore::new(storage as Arc<dyn Storage>).load();
    assert_eq!(reloaded, state.quota);
}

#[tokio::test]
async fn test_initialize_without_session_does_not_sync() {
    let profile = StubProfile::returning(pro_snapshot());
    let storage = Arc::new(MemoryStorage::new());
    let store = QuotaStore::new(storage as Arc<dyn Storage>);

    let session = StubSession { valid: false };
    let ctx = QuotaContext::initialize(store, profile.clone(), &session).await;

    assert_eq!(profile.call_count(), 0);
    assert!(!ctx.snapshot().is_authenticated);
    assert_eq!(ctx.snapshot().quota, QuotaLimits::default());
}

#[tokio::test]
async fn test_sync_preserves_local_only_fields() {
    let storage = Arc::new(MemoryStorage::new());
    let seed_store = QuotaStore::new(storage.clone() as Arc<dyn Storage>);
    let mut seeded = QuotaLimits::default();
    seeded.demo_used = true;
    seeded.week_tools = 3;
    seed_store.save(&seeded).unwrap();

    let profile = StubProfile::returning(pro_snapshot());
    let store = QuotaStore::new(storage as Arc<dyn Storage>);
    let ctx = QuotaContext::new(store, profile, true);

    ctx.sync_with_backend().await.unwrap();

    let quota = ctx.snapshot().quota;
    assert_eq!(quota.plan, Plan::Pro);
    assert_eq!(quota.tools_today, 2);
    // Server data never touches the demo lockout or the weekly tool count.
    assert!(quota.demo_used);
    assert_eq!(quota.week_tools, 3);
}

#[tokio::test]
async fn test_sync_failure_leaves_local_state_untouched() {
    let profile = StubProfile::failing("connection refused");
    let (ctx, _storage) = context_with(profile, true);

    let before = ctx.snapshot();
    assert!(ctx.sync_with_backend().await.is_err());
    assert_eq!(ctx.snapshot(), before);
}

#[tokio::test]
async fn test_update_quota_persists_and_notifies() {
    let profile = StubProfile::returning(pro_snapshot());
    let (ctx, storage) = context_with(profile, true);

    let mut rx = ctx.subscribe();
    let mut quota = QuotaLimits::for_plan(Plan::Pro);
    quota.today_generations = 7;
    ctx.update_quota(quota.clone()).unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().quota, quota);

    let reloaded = QuotaStore::new(storage as Arc<dyn Storage>).load();
    assert_eq!(reloaded, quota);
}

#[tokio::test]
async fn test_refresh_rereads_persisted_record() {
    let profile = StubProfile::returning(pro_snapshot());
    let (ctx, storage) = context_with(profile, true);

    // Another component writes behind the context's back.
    let side_store = QuotaStore::new(storage as Arc<dyn Storage>);
    let mut external = QuotaLimits::for_plan(Plan::Pro);
    external.week_generations = 40;
    side_store.save(&external).unwrap();

    assert_eq!(ctx.snapshot().quota.plan, Plan::Free);
    ctx.refresh();
    assert_eq!(ctx.snapshot().quota, external);
}

#[tokio::test]
async fn test_record_article_generation_persists_counters() {
    let profile = StubProfile::returning(pro_snapshot());
    let (ctx, storage) = context_with(profile, true);

    ctx.record_article_generation().unwrap();

    let quota = ctx.snapshot().quota;
    assert_eq!(quota.today_generations, 1);
    assert_eq!(quota.week_generations, 1);
    assert!(quota.last_article_generated.is_some());

    let reloaded = QuotaStore::new(storage as Arc<dyn Storage>).load();
    assert_eq!(reloaded, quota);
}

#[tokio::test]
async fn test_record_article_generation_unauthenticated_marks_demo() {
    let profile = StubProfile::returning(pro_snapshot());
    let (ctx, _storage) = context_with(profile, false);

    ctx.record_article_generation().unwrap();

    let quota = ctx.snapshot().quota;
    assert!(quota.demo_used);
    assert!(quota.demo_used_at.is_some());
    assert_eq!(quota.today_generations, 0);
    assert_eq!(quota.week_generations, 0);
}

#[tokio::test]
async fn test_record_tool_usage_notifies_subscribers() {
    let profile = StubProfile::returning(pro_snapshot());
    let (ctx, _storage) = context_with(profile, true);

    let mut rx = ctx.subscribe();
    ctx.record_tool_usage().unwrap();

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.quota.tools_today, 1);
    assert_eq!(state.quota.week_tools, 1);
}

#[tokio::test]
async fn test_checkout_return_with_success_flag_syncs() {
    let profile = StubProfile::returning(pro_snapshot());
    let (ctx, _storage) = context_with(profile.clone(), true);

    let upgraded = ctx
        .handle_checkout_return("https://copyforge.app/dashboard?upgrade=success&session_id=cs_1")
        .await
        .unwrap();

    assert!(upgraded);
    assert_eq!(profile.call_count(), 1);
    assert_eq!(ctx.snapshot().quota.plan, Plan::Pro);
}

#[tokio::test]
async fn test_checkout_return_without_flag_is_ignored() {
    let profile = StubProfile::returning(pro_snapshot());
    let (ctx, _storage) = context_with(profile.clone(), true);

    let upgraded = ctx
        .handle_checkout_return("https://copyforge.app/dashboard?upgrade=cancelled")
        .await
        .unwrap();

    assert!(!upgraded);
    assert_eq!(profile.call_count(), 0);

    assert!(ctx.handle_checkout_return("not a url").await.is_err());
}

#[tokio::test]
async fn test_checkout_return_surfaces_sync_failure() {
    let profile = StubProfile::failing("connection refused");
    let (ctx, _storage) = context_with(profile, true);

    // Checkout confirmation is an explicit user action, so a failed plan
    // sync is reported instead of swallowed; the record keeps its last
    // known value.
    let result = ctx
        .handle_checkout_return("https://copyforge.app/dashboard?upgrade=success&session_id=cs_1")
        .await;
    assert!(result.is_err());
    assert_eq!(ctx.snapshot().quota, QuotaLimits::default());
}

#[tokio::test(start_paused = true)]
async fn test_auto_sync_polls_on_the_interval() {
    let profile = StubProfile::returning(pro_snapshot());
    let (ctx, _storage) = context_with(profile.clone(), true);

    let _handle = ctx.start_auto_sync();
    settle().await;
    assert_eq!(profile.call_count(), 0);

    tokio::time::advance(SYNC_INTERVAL).await;
    settle().await;
    assert_eq!(profile.call_count(), 1);

    tokio::time::advance(SYNC_INTERVAL).await;
    settle().await;
    assert_eq!(profile.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_auto_sync_stops_when_signed_out() {
    let profile = StubProfile::returning(pro_snapshot());
    let (ctx, _storage) = context_with(profile.clone(), true);

    let handle = ctx.start_auto_sync();
    settle().await;
    tokio::time::advance(SYNC_INTERVAL).await;
    settle().await;
    assert_eq!(profile.call_count(), 1);

    ctx.set_authenticated(false);
    settle().await;
    assert!(handle.is_finished());

    tokio::time::advance(SYNC_INTERVAL).await;
    settle().await;
    assert_eq!(profile.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_the_handle_aborts_auto_sync() {
    let profile = StubProfile::returning(pro_snapshot());
    let (ctx, _storage) = context_with(profile.clone(), true);

    let handle = ctx.start_auto_sync();
    drop(handle);
    settle().await;

    tokio::time::advance(SYNC_INTERVAL).await;
    settle().await;
    assert_eq!(profile.call_count(), 0);
}
