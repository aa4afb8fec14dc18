//! Errors returned by providers

use gitpr_hosting::{ApiError, AzureError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider {0:?} is not supported")]
    UnsupportedProvider(String),

    #[error("missing required option: {0}")]
    Configuration(String),

    #[error("{0}")]
    Parse(String),

    #[error("no commits were found for branch {0:?}, is the repository empty?")]
    EmptyRepository(String),

    #[error("{context}: {source}")]
    Api {
        context: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to push commit {message:?} to {branch:?}: {source}")]
    Push {
        branch: String,
        message: String,
        #[source]
        source: AzureError,
    },

    #[error("unable to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("provider has not been set up")]
    NotConfigured,
}

impl ProviderError {
    pub fn api(context: impl Into<String>, source: ApiError) -> Self {
        ProviderError::Api {
            context: context.into(),
            source,
        }
    }

    /// The underlying hosting error, if there is one
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ProviderError::Api { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Attach the failing step to a hosting error
pub(crate) trait ApiContext<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ApiContext<T> for std::result::Result<T, ApiError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| ProviderError::api(context, source))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| ProviderError::api(f(), source))
    }
}
