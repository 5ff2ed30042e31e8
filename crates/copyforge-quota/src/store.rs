use std::sync::Arc;

use tracing::warn;

use crate::{QuotaLimits, Result, Storage};

/// Storage key holding the serialized [`QuotaLimits`] blob.
pub const QUOTA_STORAGE_KEY: &str = "quota";

/// Synchronous persistence front for the quota record. Whole-record
/// semantics: every save overwrites the previous blob, there is no partial
/// patching.
pub struct QuotaStore {
    storage: Arc<dyn Storage>,
}

impl QuotaStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Read the persisted record. A missing key, an unreadable backend, or a
    /// blob this version cannot decode all fall back to defaults; load never
    /// fails.
    pub fn load(&self) -> QuotaLimits {
        match self.storage.get(QUOTA_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(quota) => quota,
                Err(err) => {
                    warn!("Stored quota is unreadable, using defaults: {}", err);
                    QuotaLimits::default()
                }
            },
            Ok(None) => QuotaLimits::default(),
            Err(err) => {
                warn!("Quota storage read failed, using defaults: {}", err);
                QuotaLimits::default()
            }
        }
    }

    /// Serialize and persist the full record.
    pub fn save(&self, quota: &QuotaLimits) -> Result<()> {
        let raw = serde_json::to_string(quota)?;
        self.storage.set(QUOTA_STORAGE_KEY, &raw)
    }

    /// The backing storage, for state that lives next to the quota blob.
    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }
}
