//! Error types for the notification engine.

/// Top-level error type for the schedule notification engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Schedule normalization or resolution error.
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Persistence bridge error (state load/save).
    #[error("store error: {0}")]
    Store(String),

    /// CSV or bulk-text import error.
    #[error("import error: {0}")]
    Import(String),

    /// Speech synthesis backend error.
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio device or playback error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, EngineError>;
