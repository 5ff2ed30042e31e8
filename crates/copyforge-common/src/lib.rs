// Re-export dependencies used in public interfaces of common types

use std::fmt::Display;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subscription plan attached to a Copyforge account.
///
/// The wire value is the lowercase plan string from `GET /api/profile`.
/// Plan strings this client does not recognize map to [`Plan::Unknown`]
/// instead of failing deserialization; gates deny for `Unknown` while its
/// limit table falls back to free-tier numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Unknown,
}

impl From<String> for Plan {
    fn from(value: String) -> Self {
        match value.as_str() {
            "free" => Plan::Free,
            "pro" => Plan::Pro,
            _ => Plan::Unknown,
        }
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Pro => write!(f, "pro"),
            Plan::Unknown => write!(f, "unknown"),
        }
    }
}

impl Plan {
    /// Limit table for the plan. `Unknown` reports free-tier numbers so a
    /// stale or mistyped plan string never unlocks pro volume.
    pub fn limits(&self) -> PlanLimits {
        match self {
            Plan::Pro => PlanLimits {
                articles_per_day: 10,
                articles_per_week: 70,
                tools_per_day: 5,
                tools_per_week: 35,
            },
            Plan::Free | Plan::Unknown => PlanLimits {
                articles_per_day: 1,
                articles_per_week: 1,
                tools_per_day: 1,
                tools_per_week: 1,
            },
        }
    }
}

/// Per-plan limit constants mirrored into the persisted quota record.
///
/// Free accounts are enforced against the weekly pair and pro accounts
/// against the daily pair; the other pair is carried for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub articles_per_day: u32,
    pub articles_per_week: u32,
    pub tools_per_day: u32,
    pub tools_per_week: u32,
}

/// Authoritative usage counts as reported by the profile endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub plan: Plan,
    pub today_generations: u32,
    pub week_generations: u32,
    pub tools_today: u32,
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Profile request failed: {0}")]
    Request(String),

    #[error("Session is not authenticated")]
    Unauthenticated,
}

/// Remote source of authoritative usage counts.
///
/// The API client implements this; quota reconciliation only sees the trait
/// so it can be exercised against a stub.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self) -> Result<ProfileSnapshot, ProfileError>;
}

/// Black-box view of the locally stored credential.
///
/// Token issuance, refresh, and revocation live outside this workspace.
/// Consumers only ask for the current bearer token and whether the session
/// is still usable.
pub trait SessionProvider: Send + Sync {
    fn token(&self) -> Option<String>;
    fn is_valid(&self) -> bool;
}

/// An article as stored by the backend. Fields other than the id are
/// optional or defaulted because list and detail payloads differ in shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
