//! Error kinds shared by adapters, stores and the search service.

/// Errors surfaced by the aggregation and ranking core.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Lookup by surrogate id or by identity found no live row.
    #[error("content not found: {0}")]
    NotFound(String),

    /// A provider answered with a payload that does not match its format.
    #[error("decode error from {provider}: {message}")]
    Decode { provider: String, message: String },

    /// Transport failure, timeout or non-2xx status from a provider.
    #[error("fetch error from {provider}: {message}")]
    Fetch { provider: String, message: String },

    /// Store-level failure, including a rolled back batch.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Caller supplied a value this layer rejects.
    #[error("validation error: {0}")]
    Validation(String),

    /// The refresh or fetch was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl ContentError {
    pub fn fetch(provider: &str, message: impl Into<String>) -> Self {
        Self::Fetch {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn decode(provider: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<rusqlite::Error> for ContentError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;
