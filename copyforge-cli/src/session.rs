use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use copyforge_common::SessionProvider;
use serde::{Deserialize, Serialize};
use tracing::warn;

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Credential stored on disk between invocations.
///
/// The token itself comes from the browser sign-in flow; this file only
/// holds what the user pasted back. A missing or unreadable file means
/// signed out.
pub struct FileSession {
    path: PathBuf,
    session: Option<StoredSession>,
}

impl FileSession {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SESSION_FILE);
        let session = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(session) => Some(session),
                Err(err) => {
                    warn!("Session file is unreadable, treating as signed out: {}", err);
                    None
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                warn!("Could not read session file: {}", err);
                None
            }
        };
        Self { path, session }
    }

    pub fn store(&mut self, token: String, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        let session = StoredSession { token, expires_at };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let raw = serde_json::to_string_pretty(&session)?;
        fs::write(&self.path, raw).with_context(|| format!("write {}", self.path.display()))?;
        self.session = Some(session);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("remove {}", self.path.display()))
            }
        }
        self.session = None;
        Ok(())
    }
}

impl SessionProvider for FileSession {
    fn token(&self) -> Option<String> {
        self.session.as_ref().map(|session| session.token.clone())
    }

    fn is_valid(&self) -> bool {
        match &self.session {
            Some(StoredSession {
                expires_at: Some(expiry),
                ..
            }) => *expiry > Utc::now(),
            Some(_) => true,
            None => false,
        }
    }
}

/// Session for flows that run before sign-in.
pub struct Anonymous;

impl SessionProvider for Anonymous {
    fn token(&self) -> Option<String> {
        None
    }

    fn is_valid(&self) -> bool {
        false
    }
}
