use thiserror::Error;

/// Failures surfaced by the tagging core. Configuration errors are raised at
/// construction time, shape errors at call time; neither is ever coerced away.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {what} expects {expected} tags, got {actual}")]
    Config {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("shape error: {0}")]
    Shape(String),
    #[error("unknown tag index {index} (vocabulary has {len} tags)")]
    UnknownTag { index: usize, len: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
