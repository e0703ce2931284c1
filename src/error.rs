use thiserror::Error;

/// Main error type for the onboarding service
#[derive(Error, Debug)]
pub enum OnboardError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Ephemeral store errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Input errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Onboarding errors
    #[error("Failed to resolve onboarding state: {0}")]
    Resolution(String),

    #[error("Failed to generate link code: {0}")]
    LinkGeneration(String),

    #[error("Uniqueness conflict: {0}")]
    Conflict(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for OnboardError
pub type Result<T> = std::result::Result<T, OnboardError>;

impl OnboardError {
    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, OnboardError::Validation(_))
    }

    /// Wrap any lower-level failure that happened while reading onboarding facts.
    pub fn into_resolution(self) -> Self {
        match self {
            OnboardError::Validation(_) | OnboardError::Resolution(_) => self,
            other => OnboardError::Resolution(other.to_string()),
        }
    }

    /// Wrap any lower-level failure that happened while minting a link code.
    pub fn into_link_generation(self) -> Self {
        match self {
            OnboardError::Validation(_) | OnboardError::LinkGeneration(_) => self,
            other => OnboardError::LinkGeneration(other.to_string()),
        }
    }
}
