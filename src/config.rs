use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const API_URL: &str = "http://localhost:5000";

/// Orders endpoint, relative to `API_URL`.
pub const ORDERS_PATH: &str = "/api/orders";

/// Products endpoint, relative to `API_URL`.
pub const PRODUCTS_PATH: &str = "/api/products";

/// Historical window covered by a full sync (days).
pub const SYNC_TOTAL_DAYS: u32 = 90;

/// Size of each sync sub-window (days). The small-chunk deployment runs with 5.
pub const SYNC_CHUNK_DAYS: u32 = 15;

/// Pause between two chunk requests so the upstream rate limit is not hit.
/// Observed deployments use 800ms–1500ms.
pub const SYNC_COOLDOWN_MS: u64 = 800;

/// Delay before the once-per-session automatic sync kicks in after the first load.
pub const AUTO_SYNC_DELAY_MS: u64 = 500;

/// How long the "sync complete" notice stays on screen.
pub const SYNC_NOTICE_SECS: u64 = 5;

/// Timeout for the products read. Order requests never set one.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Prefix of the default session file; see [`default_session_file_name`].
pub const SESSION_FILE_PREFIX: &str = "order-desk-session";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub log_level: String,
    /// Optional log destination for the TUI, which owns the terminal (LOG_FILE).
    pub log_file: Option<PathBuf>,
    /// SYNC_TOTAL_DAYS
    pub sync_total_days: u32,
    /// SYNC_CHUNK_DAYS
    pub sync_chunk_days: u32,
    /// SYNC_COOLDOWN_MS
    pub sync_cooldown: Duration,
    /// Send `clear=true` on the first chunk (SYNC_CLEAR_FIRST).
    pub sync_clear_first: bool,
    /// HTTP_TIMEOUT_SECS
    pub http_timeout: Duration,
    /// Where the per-session auto-sync flag lives (SESSION_FILE).
    pub session_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let sync_chunk_days = parse_env("SYNC_CHUNK_DAYS", SYNC_CHUNK_DAYS)?;
        if sync_chunk_days == 0 {
            return Err(AppError::Config("SYNC_CHUNK_DAYS must be at least 1".to_string()));
        }

        Ok(Self {
            api_url: std::env::var("API_URL")
                .unwrap_or_else(|_| API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: std::env::var("LOG_FILE").ok().filter(|s| !s.is_empty()).map(PathBuf::from),
            sync_total_days: parse_env("SYNC_TOTAL_DAYS", SYNC_TOTAL_DAYS)?,
            sync_chunk_days,
            sync_cooldown: Duration::from_millis(parse_env("SYNC_COOLDOWN_MS", SYNC_COOLDOWN_MS)?),
            sync_clear_first: parse_flag("SYNC_CLEAR_FIRST", true)?,
            http_timeout: Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS)?),
            session_file: std::env::var("SESSION_FILE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| {
                    let login = std::env::var("XDG_SESSION_ID").ok();
                    let today = chrono::Local::now().date_naive();
                    std::env::temp_dir().join(default_session_file_name(login.as_deref(), today))
                }),
        })
    }
}

/// Session file name scoped to the login session (`XDG_SESSION_ID`), or to
/// the calendar day when no login session id is available. A new login or a
/// new day gets a fresh file, so the automatic sync runs again.
pub fn default_session_file_name(login_session: Option<&str>, today: chrono::NaiveDate) -> String {
    let scope: String = match login_session.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => id.chars().filter(|c| c.is_ascii_alphanumeric()).collect(),
        None => today.format("%Y%m%d").to_string(),
    };
    format!("{SESSION_FILE_PREFIX}-{scope}.json")
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} must be a non-negative integer, got {raw:?}"))),
        _ => Ok(default),
    }
}

fn parse_flag(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config(format!("{key} must be true or false, got {raw:?}"))),
        },
        Err(_) => Ok(default),
    }
}
