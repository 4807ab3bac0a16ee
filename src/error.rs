use thiserror::Error;

/// Errors produced while fetching a page of articles from the remote feed.
///
/// The coordinator treats `NoConnectivity` specially: it is the only kind
/// eligible for the stale-cache fallback. Everything else crosses the
/// boundary unchanged so the user sees it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("API credential missing or rejected")]
    Auth,

    #[error("API rate limit exceeded")]
    RateLimit,

    #[error("Server error: {0}")]
    Server(u16),

    #[error("Failed to decode response: {0}")]
    Decoding(String),

    #[error("No internet connection")]
    NoConnectivity,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl FetchError {
    /// True for the one error kind the cache coordinator may recover from
    /// by serving stale data.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, FetchError::NoConnectivity)
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            FetchError::InvalidRequest(_) => "INVALID_REQUEST",
            FetchError::Auth => "AUTH",
            FetchError::RateLimit => "RATE_LIMIT",
            FetchError::Server(_) => "SERVER",
            FetchError::Decoding(_) => "DECODING",
            FetchError::NoConnectivity => "NO_CONNECTIVITY",
            FetchError::Unknown(_) => "UNKNOWN",
        }
    }
}

impl PartialEq for FetchError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FetchError::Server(a), FetchError::Server(b)) => a == b,
            (FetchError::InvalidRequest(a), FetchError::InvalidRequest(b)) => a == b,
            (FetchError::Decoding(a), FetchError::Decoding(b)) => a == b,
            (FetchError::Unknown(a), FetchError::Unknown(b)) => a == b,
            _ => self.error_code() == other.error_code(),
        }
    }
}

/// Errors from the local stores (bookmarks, page cache persistence).
///
/// These are never retried automatically; callers decide whether to surface
/// them. The page cache additionally downgrades its own persistence failures
/// to cache misses.
#[derive(Debug, Error, PartialEq)]
pub enum StorageError {
    #[error("Failed to save data to storage: {0}")]
    SaveFailed(String),

    #[error("Failed to fetch data from storage: {0}")]
    FetchFailed(String),

    #[error("Failed to update data in storage: {0}")]
    UpdateFailed(String),

    #[error("Failed to delete data from storage: {0}")]
    DeleteFailed(String),

    #[error("Data already exists")]
    AlreadyExists,

    #[error("Data not found")]
    NotFound,
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}
