//! Session-scoped flags.
//!
//! The dashboard runs the long 90-day sync by itself only once per session;
//! after that, syncing is manual. The flag lives in a small JSON file so that
//! restarting the dashboard within the same session does not trigger it again.
//!
//! The file itself never expires. Its lifetime comes from its name: the
//! default path is keyed by the login session id, or by the day when there
//! is none (`config::default_session_file_name`). An explicit `SESSION_FILE`
//! lasts until `order-desk reset-session` clears it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SessionFlags {
    #[serde(default, rename = "synced90days")]
    synced_90_days: bool,
}

#[derive(Debug)]
pub struct OrderDeskSession {
    path: Option<PathBuf>,
    flags: SessionFlags,
}

impl OrderDeskSession {
    /// Load the session file, starting fresh if it is missing or unreadable.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let flags = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), "ignoring unreadable session file: {e}");
                SessionFlags::default()
            }),
            Err(_) => SessionFlags::default(),
        };
        Self { path: Some(path), flags }
    }

    /// A session that is never written to disk.
    pub fn in_memory() -> Self {
        Self { path: None, flags: SessionFlags::default() }
    }

    pub fn synced_90_days(&self) -> bool {
        self.flags.synced_90_days
    }

    /// Returns true exactly once per session: the caller may start the
    /// automatic sync. The flag is set before the sync runs, so a failed
    /// automatic sync is not retried automatically either.
    pub fn claim_auto_sync(&mut self) -> bool {
        if self.flags.synced_90_days {
            return false;
        }
        self.flags.synced_90_days = true;
        if let Err(e) = self.save() {
            warn!("failed to persist session flag: {e}");
        }
        true
    }

    /// Forget the flag (end of session).
    pub fn reset(&mut self) -> Result<()> {
        self.flags = SessionFlags::default();
        self.save()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        let bytes = serde_json::to_vec(&self.flags)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
