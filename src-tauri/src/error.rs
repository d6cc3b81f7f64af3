use serde::Serialize;

/// Failure reported by the external platform collaborator.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("platform call {method} failed: {message}")]
    Call {
        method: &'static str,
        message: String,
    },

    #[error("platform does not support {0}")]
    Unsupported(&'static str),
}

/// Crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("unable to resolve the app config directory")]
    ConfigDir,

    #[error("cannot move app from {from} to {to}: list has {len} entries")]
    InvalidMove { from: usize, to: usize, len: usize },

    #[error("background task failed: {0}")]
    Task(String),
}

/// Tauri commands must return serializable errors; the webview only needs the message.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
