// Client-side quota cache for Copyforge: local gate decisions reconciled
// against the backend profile.
use copyforge_common::ProfileError;
use thiserror::Error;

mod context;
mod gates;
mod prompt;
mod storage;
mod store;
mod types;

pub use context::{AutoSyncHandle, QuotaContext, QuotaState, SYNC_INTERVAL};
pub use gates::{DenialReason, GateDecision, DEMO_LOCKOUT_DAYS};
pub use prompt::{EngagementPrompt, PROMPT_COOLDOWN_HOURS};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{QuotaStore, QUOTA_STORAGE_KEY};
pub use types::QuotaLimits;

// Error Types
#[derive(Error, Debug)]
pub enum QuotaError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Profile sync failed: {0}")]
    Sync(#[from] ProfileError),

    #[error("Invalid redirect URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, QuotaError>;
