use std::fmt;

use chrono::{DateTime, Utc};
use copyforge_common::Plan;

use crate::QuotaLimits;

/// Days an unauthenticated visitor is locked out after spending their demo.
pub const DEMO_LOCKOUT_DAYS: i64 = 30;

/// Outcome of a gate check. Denials carry a user-facing reason; they are
/// advisory, not errors, and the backend still enforces the real limit.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Allowed,
    Denied(DenialReason),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }

    pub fn denial(&self) -> Option<&DenialReason> {
        match self {
            GateDecision::Allowed => None,
            GateDecision::Denied(reason) => Some(reason),
        }
    }
}

/// Why a gated action was refused. `Display` is the banner text shown to
/// the user.
#[derive(Debug, Clone, PartialEq)]
pub enum DenialReason {
    /// Demo already spent. `days_remaining` is `None` when the stored record
    /// has the flag but no timestamp, in which case no countdown can be
    /// offered.
    DemoLockout { days_remaining: Option<i64> },
    WeeklyArticleLimit { limit: u32 },
    DailyArticleLimit { limit: u32 },
    SignInRequired,
    WeeklyToolLimit { limit: u32 },
    DailyToolLimit { limit: u32 },
    UnknownPlan,
}

impl DenialReason {
    /// True when switching to the pro plan would lift this denial. Only the
    /// free-plan limits qualify: pro limits have no higher tier, and the
    /// signed-out reasons call for signing up instead.
    pub fn upgrade_lifts_limit(&self) -> bool {
        matches!(
            self,
            DenialReason::WeeklyArticleLimit { .. } | DenialReason::WeeklyToolLimit { .. }
        )
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::DemoLockout {
                days_remaining: Some(days),
            } => {
                let unit = if *days == 1 { "day" } else { "days" };
                write!(
                    f,
                    "You already used your free demo article. Try again in {days} {unit}, or sign up to keep writing."
                )
            }
            DenialReason::DemoLockout {
                days_remaining: None,
            } => {
                write!(
                    f,
                    "You already used your free demo article. Sign up to keep writing."
                )
            }
            DenialReason::WeeklyArticleLimit { limit } => {
                let unit = if *limit == 1 { "article" } else { "articles" };
                write!(
                    f,
                    "Weekly limit reached. The free plan includes {limit} {unit} per week."
                )
            }
            DenialReason::DailyArticleLimit { limit } => {
                write!(
                    f,
                    "Daily limit reached. The pro plan includes {limit} articles per day."
                )
            }
            DenialReason::SignInRequired => write!(f, "Sign in to use tools."),
            DenialReason::WeeklyToolLimit { limit } => {
                let unit = if *limit == 1 { "tool use" } else { "tool uses" };
                write!(
                    f,
                    "Weekly tool limit reached. The free plan includes {limit} {unit} per week."
                )
            }
            DenialReason::DailyToolLimit { limit } => {
                write!(
                    f,
                    "Daily tool limit reached. The pro plan includes {limit} tool uses per day."
                )
            }
            DenialReason::UnknownPlan => {
                write!(f, "Your plan could not be determined. Contact support if this keeps happening.")
            }
        }
    }
}

impl QuotaLimits {
    /// Decide whether an article generation may be attempted right now.
    ///
    /// Unauthenticated visitors get one demo generation, then a
    /// [`DEMO_LOCKOUT_DAYS`]-day lockout counted from the stamp. Free
    /// accounts are held to the weekly counter, pro accounts to the daily
    /// one. The check is a pure read; it never rolls counters over.
    pub fn check_article_gate(&self, is_authenticated: bool, now: DateTime<Utc>) -> GateDecision {
        if !is_authenticated {
            if !self.demo_used {
                return GateDecision::Allowed;
            }
            return match self.demo_used_at {
                Some(used_at) => {
                    let elapsed = now.signed_duration_since(used_at).num_days();
                    if elapsed >= DEMO_LOCKOUT_DAYS {
                        GateDecision::Allowed
                    } else {
                        let days_remaining = (DEMO_LOCKOUT_DAYS - elapsed).clamp(1, DEMO_LOCKOUT_DAYS);
                        GateDecision::Denied(DenialReason::DemoLockout {
                            days_remaining: Some(days_remaining),
                        })
                    }
                }
                None => GateDecision::Denied(DenialReason::DemoLockout {
                    days_remaining: None,
                }),
            };
        }

        let limits = self.plan.limits();
        match self.plan {
            Plan::Free => {
                if self.week_generations < limits.articles_per_week {
                    GateDecision::Allowed
                } else {
                    GateDecision::Denied(DenialReason::WeeklyArticleLimit {
                        limit: limits.articles_per_week,
                    })
                }
            }
            Plan::Pro => {
                if self.today_generations < limits.articles_per_day {
                    GateDecision::Allowed
                } else {
                    GateDecision::Denied(DenialReason::DailyArticleLimit {
                        limit: limits.articles_per_day,
                    })
                }
            }
            Plan::Unknown => GateDecision::Denied(DenialReason::UnknownPlan),
        }
    }

    /// Decide whether a tool call may be attempted. Tools are never
    /// available to unauthenticated visitors.
    pub fn check_tool_gate(&self, is_authenticated: bool) -> GateDecision {
        if !is_authenticated {
            return GateDecision::Denied(DenialReason::SignInRequired);
        }

        let limits = self.plan.limits();
        match self.plan {
            Plan::Free => {
                if self.week_tools < limits.tools_per_week {
                    GateDecision::Allowed
                } else {
                    GateDecision::Denied(DenialReason::WeeklyToolLimit {
                        limit: limits.tools_per_week,
                    })
                }
            }
            Plan::Pro => {
                if self.tools_today < limits.tools_per_day {
                    GateDecision::Allowed
                } else {
                    GateDecision::Denied(DenialReason::DailyToolLimit {
                        limit: limits.tools_per_day,
                    })
                }
            }
            Plan::Unknown => GateDecision::Denied(DenialReason::UnknownPlan),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_free_plan_article_gate_tracks_weekly_counter() {
        let mut quota = QuotaLimits::for_plan(Plan::Free);
        assert!(quota.check_article_gate(true, now()).is_allowed());

        quota.week_generations = 1;
        let decision = quota.check_article_gate(true, now());
        assert_eq!(
            decision.denial(),
            Some(&DenialReason::WeeklyArticleLimit { limit: 1 })
        );
        assert!(decision
            .denial()
            .map(|r| r.to_string())
            .unwrap_or_default()
            .starts_with("Weekly limit reached"));

        // The daily counter is irrelevant on the free plan.
        quota.week_generations = 0;
        quota.today_generations = 50;
        assert!(quota.check_article_gate(true, now()).is_allowed());
    }

    #[test]
    fn test_pro_plan_article_gate_tracks_daily_counter() {
        let mut quota = QuotaLimits::for_plan(Plan::Pro);
        quota.today_generations = 9;
        assert!(quota.check_article_gate(true, now()).is_allowed());

        quota.today_generations = 10;
        assert_eq!(
            quota.check_article_gate(true, now()).denial(),
            Some(&DenialReason::DailyArticleLimit { limit: 10 })
        );

        // The weekly counter is irrelevant on the pro plan.
        quota.today_generations = 0;
        quota.week_generations = 500;
        assert!(quota.check_article_gate(true, now()).is_allowed());
    }

    #[test]
    fn test_unknown_plan_denies_both_gates() {
        let quota = QuotaLimits::for_plan(Plan::Unknown);
        assert_eq!(
            quota.check_article_gate(true, now()).denial(),
            Some(&DenialReason::UnknownPlan)
        );
        assert_eq!(
            quota.check_tool_gate(true).denial(),
            Some(&DenialReason::UnknownPlan)
        );
    }

    #[test]
    fn test_unauthenticated_demo_available() {
        let quota = QuotaLimits::default();
        assert!(quota.check_article_gate(false, now()).is_allowed());
    }

    #[test]
    fn test_demo_lockout_counts_down_days() {
        let mut quota = QuotaLimits::default();
        let current = now();
        quota.demo_used = true;
        quota.demo_used_at = Some(current - Duration::days(29));

        let decision = quota.check_article_gate(false, current);
        match decision.denial() {
            Some(DenialReason::DemoLockout {
                days_remaining: Some(days),
            }) => {
                assert_eq!(*days, 1);
                assert!(decision
                    .denial()
                    .map(|r| r.to_string())
                    .unwrap_or_default()
                    .contains("1 day"));
            }
            other => panic!("expected demo lockout, got {other:?}"),
        }
    }

    #[test]
    fn test_demo_lockout_expires_after_thirty_days() {
        let mut quota = QuotaLimits::default();
        let current = now();
        quota.demo_used = true;

        quota.demo_used_at = Some(current - Duration::days(30));
        assert!(quota.check_article_gate(false, current).is_allowed());

        quota.demo_used_at = Some(current - Duration::days(45));
        assert!(quota.check_article_gate(false, current).is_allowed());
    }

    #[test]
    fn test_demo_lockout_without_timestamp_denies_without_countdown() {
        let mut quota = QuotaLimits::default();
        quota.demo_used = true;
        quota.demo_used_at = None;

        assert_eq!(
            quota.check_article_gate(false, now()).denial(),
            Some(&DenialReason::DemoLockout {
                days_remaining: None
            })
        );
    }

    #[test]
    fn test_fresh_demo_use_denies_with_full_countdown() {
        let mut quota = QuotaLimits::default();
        let current = now();
        quota.record_article_generation(false, current);

        let decision = quota.check_article_gate(false, current);
        assert_eq!(
            decision.denial(),
            Some(&DenialReason::DemoLockout {
                days_remaining: Some(DEMO_LOCKOUT_DAYS)
            })
        );
    }

    #[test]
    fn test_tool_gate_requires_sign_in() {
        let quota = QuotaLimits::default();
        let decision = quota.check_tool_gate(false);
        assert_eq!(decision.denial(), Some(&DenialReason::SignInRequired));
        assert_eq!(
            decision.denial().map(|r| r.to_string()),
            Some("Sign in to use tools.".to_string())
        );
    }

    #[test]
    fn test_free_plan_tool_gate_tracks_weekly_counter() {
        let mut quota = QuotaLimits::for_plan(Plan::Free);
        assert!(quota.check_tool_gate(true).is_allowed());

        quota.week_tools = 1;
        assert_eq!(
            quota.check_tool_gate(true).denial(),
            Some(&DenialReason::WeeklyToolLimit { limit: 1 })
        );
    }

    #[test]
    fn test_pro_plan_tool_gate_tracks_daily_counter() {
        let mut quota = QuotaLimits::for_plan(Plan::Pro);
        quota.tools_today = 4;
        assert!(quota.check_tool_gate(true).is_allowed());

        quota.tools_today = 5;
        assert_eq!(
            quota.check_tool_gate(true).denial(),
            Some(&DenialReason::DailyToolLimit { limit: 5 })
        );
    }

    #[test]
    fn test_upgrade_lifts_only_free_plan_limits() {
        assert!(DenialReason::WeeklyArticleLimit { limit: 1 }.upgrade_lifts_limit());
        assert!(DenialReason::WeeklyToolLimit { limit: 1 }.upgrade_lifts_limit());

        assert!(!DenialReason::DailyArticleLimit { limit: 10 }.upgrade_lifts_limit());
        assert!(!DenialReason::DailyToolLimit { limit: 5 }.upgrade_lifts_limit());
        assert!(!DenialReason::SignInRequired.upgrade_lifts_limit());
        assert!(!DenialReason::UnknownPlan.upgrade_lifts_limit());
        assert!(!DenialReason::DemoLockout {
            days_remaining: Some(3)
        }
        .upgrade_lifts_limit());
    }

    #[test]
    fn test_free_scenario_generate_then_denied() {
        let mut quota = QuotaLimits::for_plan(Plan::Free);
        let current = now();
        assert!(quota.check_article_gate(true, current).is_allowed());

        quota.record_article_generation(true, current);
        assert_eq!(quota.week_generations, 1);

        let decision = quota.check_article_gate(true, current);
        assert!(!decision.is_allowed());
        assert!(decision
            .denial()
            .map(|r| r.to_string())
            .unwrap_or_default()
            .starts_with("Weekly limit reached"));
    }

    #[test]
    fn test_pro_scenario_tenth_article_exhausts_day() {
        let mut quota = QuotaLimits::for_plan(Plan::Pro);
        let current = now();
        quota.today_generations = 9;

        assert!(quota.check_article_gate(true, current).is_allowed());
        quota.record_article_generation(true, current);
        assert_eq!(quota.today_generations, 10);

        assert_eq!(
            quota.check_article_gate(true, current).denial(),
            Some(&DenialReason::DailyArticleLimit { limit: 10 })
        );
    }
}
