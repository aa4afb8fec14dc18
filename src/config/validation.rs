//! Configuration validation

use super::Config;
use crate::constants::providers;
use anyhow::anyhow;

/// Enumeration of possible validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Provider section with a name the factory does not know
    UnknownProvider(String),
    /// Hostname given but blank
    EmptyHostname(String),
    /// `git_host_types` entry naming an unknown provider
    UnknownHostType(String, String),
    /// `git_host_types` entry with a blank domain
    EmptyHostDomain,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::UnknownProvider(name) => {
                write!(
                    f,
                    "Unknown provider '{}', expected one of: {}",
                    name,
                    providers::ALL.join(", ")
                )
            }
            ValidationError::EmptyHostname(name) => {
                write!(f, "Provider '{}' hostname cannot be empty", name)
            }
            ValidationError::UnknownHostType(domain, name) => {
                write!(f, "Host '{}' maps to unknown provider '{}'", domain, name)
            }
            ValidationError::EmptyHostDomain => {
                write!(f, "git_host_types entries need a domain")
            }
        }
    }
}

fn is_known(name: &str) -> bool {
    providers::ALL.contains(&name)
}

/// Validates a complete configuration object
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();
    for name in names {
        if !is_known(name) {
            errors.push(ValidationError::UnknownProvider(name.clone()));
        }
        if let Some(hostname) = &config.providers[name].hostname
            && hostname.trim().is_empty()
        {
            errors.push(ValidationError::EmptyHostname(name.clone()));
        }
    }

    let mut hosts: Vec<(&String, &String)> = config.git_host_types.iter().collect();
    hosts.sort();
    for (domain, name) in hosts {
        if domain.trim().is_empty() {
            errors.push(ValidationError::EmptyHostDomain);
        }
        if !is_known(name) {
            errors.push(ValidationError::UnknownHostType(domain.clone(), name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Convert validation errors to anyhow error
pub fn validation_errors_to_anyhow(errors: Vec<ValidationError>) -> anyhow::Error {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    anyhow!("Configuration validation failed:\n  - {}", messages.join("\n  - "))
}
