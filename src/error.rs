use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-2xx answer from the backend. `message` is the body's `error` field,
    /// or the status text when the body was not JSON.
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("sync failed at offset {offset} days: {source}")]
    SyncChunk {
        offset: u32,
        #[source]
        source: Box<AppError>,
    },

    #[error("sync cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Offset of the failing sub-window, if this error came out of a sync run.
    pub fn sync_offset(&self) -> Option<u32> {
        match self {
            AppError::SyncChunk { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Text for the dashboard's error block: the backend's own message where
    /// there is one, prefixed with the failing window for sync errors.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Backend { message, .. } => message.clone(),
            AppError::SyncChunk { offset, source } => {
                format!("동기화 중 오류 (구간 {offset}): {}", source.user_message())
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_chunk_error_names_offset() {
        let err = AppError::SyncChunk {
            offset: 30,
            source: Box::new(AppError::Backend { status: 500, message: "sync failed".to_string() }),
        };
        assert_eq!(err.sync_offset(), Some(30));
        assert_eq!(err.to_string(), "sync failed at offset 30 days: backend error (500): sync failed");
        assert_eq!(err.user_message(), "동기화 중 오류 (구간 30): sync failed");
    }

    #[test]
    fn backend_error_shows_its_message() {
        let err = AppError::Backend { status: 400, message: "토큰 발급 실패".to_string() };
        assert_eq!(err.user_message(), "토큰 발급 실패");
        assert_eq!(err.sync_offset(), None);
        assert_eq!(AppError::Cancelled.user_message(), "sync cancelled");
    }
}
