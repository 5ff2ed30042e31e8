use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{Result, Storage};

const PROMPT_SHOWN_KEY: &str = "prompt_shown";
const PROMPT_LAST_SHOWN_KEY: &str = "prompt_last_shown";

/// Hours before the upgrade prompt may be shown again.
pub const PROMPT_COOLDOWN_HOURS: i64 = 24;

/// Re-show policy for the upgrade prompt: once immediately, then at most
/// once per cooldown window. Uses the same storage namespace as the quota
/// blob, under its own keys.
pub struct EngagementPrompt {
    storage: Arc<dyn Storage>,
}

impl EngagementPrompt {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Whether the prompt may be shown at `now`. True when it has never been
    /// shown, or when the cooldown since the last showing has elapsed. An
    /// unreadable stamp counts as never shown.
    pub fn should_show(&self, now: DateTime<Utc>) -> bool {
        let shown_before = matches!(self.storage.get(PROMPT_SHOWN_KEY), Ok(Some(_)));
        if !shown_before {
            return true;
        }

        match self.storage.get(PROMPT_LAST_SHOWN_KEY) {
            Ok(Some(raw)) => match raw.parse::<DateTime<Utc>>() {
                Ok(last_shown) => {
                    let elapsed = now.signed_duration_since(last_shown);
                    elapsed.num_hours() >= PROMPT_COOLDOWN_HOURS
                }
                Err(_) => true,
            },
            _ => true,
        }
    }

    /// Stamp the prompt as shown at `now`, starting the cooldown.
    pub fn mark_shown(&self, now: DateTime<Utc>) -> Result<()> {
        self.storage.set(PROMPT_SHOWN_KEY, "true")?;
        self.storage.set(PROMPT_LAST_SHOWN_KEY, &now.to_rfc3339())
    }
}
