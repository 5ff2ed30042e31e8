use chrono::{DateTime, Datelike, Utc};
use copyforge_common::Plan;
use serde::{Deserialize, Serialize};

/// The persisted quota record, one per installation.
///
/// The `*_per_*` fields mirror the active plan's limit table for display;
/// enforcement always reads the table through [`Plan::limits`]. Counters are
/// advisory: the backend keeps the authoritative counts and overwrites these
/// on every reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub plan: Plan,
    pub articles_per_day: u32,
    pub articles_per_week: u32,
    pub tools_per_day: u32,
    pub tools_per_week: u32,

    // Unauthenticated demo lockout, independent of the counters below.
    #[serde(default)]
    pub demo_used: bool,
    #[serde(default)]
    pub demo_used_at: Option<DateTime<Utc>>,

    // Rollover anchor. Unset until the first authenticated generation.
    #[serde(default)]
    pub last_article_generated: Option<DateTime<Utc>>,

    #[serde(default)]
    pub today_generations: u32,
    #[serde(default)]
    pub week_generations: u32,
    #[serde(default)]
    pub tools_today: u32,
    #[serde(default)]
    pub week_tools: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self::for_plan(Plan::Free)
    }
}

impl QuotaLimits {
    /// Fresh record for `plan`: limit mirrors populated, everything else zero.
    pub fn for_plan(plan: Plan) -> Self {
        let limits = plan.limits();
        Self {
            plan,
            articles_per_day: limits.articles_per_day,
            articles_per_week: limits.articles_per_week,
            tools_per_day: limits.tools_per_day,
            tools_per_week: limits.tools_per_week,
            demo_used: false,
            demo_used_at: None,
            last_article_generated: None,
            today_generations: 0,
            week_generations: 0,
            tools_today: 0,
            week_tools: 0,
        }
    }

    /// Zero any counter whose period has rolled over since the last
    /// generation.
    ///
    /// Day identity is the UTC calendar date; week identity is the ISO 8601
    /// week number plus its week-based year, so late-December and
    /// early-January dates in the same ISO week compare equal. The two
    /// checks are independent: a day boundary can pass without a week
    /// boundary and the other way around. With no anchor set this is a
    /// no-op.
    pub fn reset_counters_if_needed(&mut self, now: DateTime<Utc>) {
        let Some(anchor) = self.last_article_generated else {
            return;
        };

        if anchor.date_naive() != now.date_naive() {
            self.today_generations = 0;
            self.tools_today = 0;
        }

        let anchor_week = anchor.iso_week();
        let now_week = now.iso_week();
        if anchor_week.week() != now_week.week() || anchor_week.year() != now_week.year() {
            self.week_generations = 0;
            self.week_tools = 0;
        }
    }

    /// Record one successful article generation.
    ///
    /// Unauthenticated callers consume their demo instead of a counter: the
    /// lockout flag is set and stamped, counters stay untouched.
    /// Authenticated callers roll stale counters over first, then both the
    /// day and the week counter go up by one and the anchor moves to `now`.
    ///
    /// This is an increment-only primitive. It does not re-check
    /// [`check_article_gate`](Self::check_article_gate); gating is the
    /// caller's job, before the billed request is made.
    pub fn record_article_generation(&mut self, is_authenticated: bool, now: DateTime<Utc>) {
        if !is_authenticated {
            self.demo_used = true;
            self.demo_used_at = Some(now);
            return;
        }

        self.reset_counters_if_needed(now);
        self.today_generations += 1;
        self.week_generations += 1;
        self.last_article_generated = Some(now);
    }

    /// Record one successful tool call. Rolls stale counters over, then
    /// bumps both tool counters. Callers gate with
    /// [`check_tool_gate`](Self::check_tool_gate) upstream; unauthenticated
    /// use never reaches this.
    pub fn record_tool_usage(&mut self, now: DateTime<Utc>) {
        self.reset_counters_if_needed(now);
        self.tools_today += 1;
        self.week_tools += 1;
    }

    /// Replace the plan and its limit mirrors, leaving counters and the demo
    /// lockout alone. Reconciliation uses this when the server reports a
    /// different plan, because server counts overwrite the counters anyway.
    pub(crate) fn apply_plan(&mut self, plan: Plan) {
        let limits = plan.limits();
        self.plan = plan;
        self.articles_per_day = limits.articles_per_day;
        self.articles_per_week = limits.articles_per_week;
        self.tools_per_day = limits.tools_per_day;
        self.tools_per_week = limits.tools_per_week;
    }

    /// Switch plans and hard-reset all four usage counters. Plan changes
    /// (checkout success) are a clean slate, not synchronized with rollover.
    pub fn update_plan(&mut self, plan: Plan) {
        self.apply_plan(plan);
        self.today_generations = 0;
        self.week_generations = 0;
        self.tools_today = 0;
        self.week_tools = 0;
    }

    /// Human-readable remaining-quota string for the dashboard header.
    pub fn remaining_quota_label(&self) -> String {
        match self.plan {
            Plan::Pro => {
                let remaining = self.articles_per_day.saturating_sub(self.today_generations);
                format!("{}/{}", remaining, self.articles_per_day)
            }
            Plan::Free | Plan::Unknown => {
                let remaining = self.articles_per_week.saturating_sub(self.week_generations);
                format!(
                    "{} of {} articles left this week",
                    remaining, self.articles_per_week
                )
            }
        }
    }
}
