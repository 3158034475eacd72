use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] tokio::io::Error),

    #[error("yt-dlp failed: {0}")]
    YtdlpFailed(String),

    #[error("invalid yt-dlp output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    #[error("extraction returned no media")]
    EmptyExtraction,

    #[error("expected artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("unknown media kind")]
    UnknownMediaKind,

    #[error("unknown selector: {0:?}")]
    UnknownSelector(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("teloxide error: {0}")]
    Teloxide(#[from] teloxide::RequestError),

    #[error("other: {0}")]
    Other(String),
}

impl Error {
    #[inline]
    pub fn other(text: impl Into<String>) -> Self {
        Self::Other(text.into())
    }

    #[inline]
    pub fn ytdlp_failed(stderr: impl Into<String>) -> Self {
        Self::YtdlpFailed(stderr.into())
    }

    #[inline]
    pub fn config(text: impl Into<String>) -> Self {
        Self::Config(text.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
