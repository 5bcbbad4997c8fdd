//! Error types for the engine.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Everything that can go wrong between a playback request and the speakers.
#[derive(Error, Debug)]
pub enum EngineError {
    /// An operation was called in a state that does not allow it,
    /// e.g. starting a frequency generator before `initialize`.
    #[error("invalid state: {reason}")]
    InvalidState { reason: &'static str },

    /// The output context could not be constructed.
    #[error("audio context unavailable: {reason}")]
    ContextUnavailable { reason: String },

    #[error("audio context is closed")]
    ContextClosed,

    /// Stopping a source that was never started, or has already stopped or ended.
    #[error("source is not playing")]
    NotPlaying,

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("audio resource {url} contains no samples")]
    EmptyAudio { url: String },

    /// A catalog entry with no audio file, no frequency recipe and no reserved id.
    #[error("sound {0} has nothing to play")]
    NothingToPlay(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EngineError {
    /// Teardown races (already stopped, already removed) are expected and never surfaced.
    pub fn is_teardown_race(&self) -> bool {
        matches!(self, EngineError::NotPlaying)
    }
}
