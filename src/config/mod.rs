//! Configuration management module

pub mod loader;
pub mod provider;
pub mod validation;

pub use loader::Config;
pub use provider::{ProviderConfig, ProviderOverrides};
pub use validation::{ValidationError, validate_config, validation_errors_to_anyhow};
