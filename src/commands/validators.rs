//! Command argument validation utilities
//!
//! Validation rules for command arguments that go beyond what clap checks
//! while parsing.

use crate::constants::providers;
use crate::repo_url::parse_git_url;
use anyhow::{Result, anyhow};
use std::path::PathBuf;

/// Validation errors for command arguments
#[derive(Debug, PartialEq)]
pub enum CommandValidationError {
    /// Required argument was not provided
    MissingRequired {
        argument: String,
        alternatives: Vec<String>,
    },
    /// Argument that only makes sense together with another one
    RequiresArgument { argument: String, requires: String },
    /// Invalid argument value
    InvalidValue {
        argument: String,
        value: String,
        reason: String,
    },
}

impl std::fmt::Display for CommandValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandValidationError::MissingRequired {
                argument,
                alternatives,
            } => {
                if alternatives.is_empty() {
                    write!(f, "{} is required", argument)
                } else {
                    write!(
                        f,
                        "Either {} or {} must be provided",
                        alternatives.join(", "),
                        argument
                    )
                }
            }
            CommandValidationError::RequiresArgument { argument, requires } => {
                write!(f, "{} can only be used with {}", argument, requires)
            }
            CommandValidationError::InvalidValue {
                argument,
                value,
                reason,
            } => {
                write!(f, "Invalid value '{}' for {}: {}", value, argument, reason)
            }
        }
    }
}

impl std::error::Error for CommandValidationError {}

/// Convert validation error to anyhow::Error
pub fn validation_error_to_anyhow(error: CommandValidationError) -> anyhow::Error {
    anyhow!(error.to_string())
}

/// Validate provider name
///
/// Ensures an explicitly given provider is one the factory can build
pub fn validate_provider_name(provider: &Option<String>) -> Result<()> {
    if let Some(name) = provider
        && !providers::ALL.contains(&name.as_str())
    {
        return Err(validation_error_to_anyhow(
            CommandValidationError::InvalidValue {
                argument: "provider".to_string(),
                value: name.clone(),
                reason: format!("expected one of: {}", providers::ALL.join(", ")),
            },
        ));
    }
    Ok(())
}

/// Validate repository URL
pub fn validate_repo_url(repo: &str) -> Result<()> {
    if repo.trim().is_empty() {
        return Err(validation_error_to_anyhow(
            CommandValidationError::InvalidValue {
                argument: "repo".to_string(),
                value: repo.to_string(),
                reason: "repository URL cannot be empty or whitespace only".to_string(),
            },
        ));
    }

    parse_git_url(repo).map_err(|e| {
        validation_error_to_anyhow(CommandValidationError::InvalidValue {
            argument: "repo".to_string(),
            value: repo.to_string(),
            reason: e.to_string(),
        })
    })?;
    Ok(())
}

/// Validate branch name
///
/// Ensures branch names follow basic Git naming conventions
pub fn validate_branch_name(branch: &Option<String>) -> Result<()> {
    if let Some(name) = branch {
        if name.trim().is_empty() {
            return Err(validation_error_to_anyhow(
                CommandValidationError::InvalidValue {
                    argument: "branch".to_string(),
                    value: name.clone(),
                    reason: "branch name cannot be empty or whitespace only".to_string(),
                },
            ));
        }

        if name.starts_with('-')
            || name.ends_with('.')
            || name.ends_with('/')
            || name.contains("..")
            || name.contains(char::is_whitespace)
        {
            return Err(validation_error_to_anyhow(
                CommandValidationError::InvalidValue {
                    argument: "branch".to_string(),
                    value: name.clone(),
                    reason: "invalid Git branch name format".to_string(),
                },
            ));
        }
    }
    Ok(())
}

/// Validate commit message
///
/// Ensures commit messages are not empty when provided
pub fn validate_commit_message(message: &Option<String>) -> Result<()> {
    if let Some(msg) = message
        && msg.trim().is_empty()
    {
        return Err(validation_error_to_anyhow(
            CommandValidationError::InvalidValue {
                argument: "commit message".to_string(),
                value: msg.clone(),
                reason: "commit message cannot be empty or whitespace only".to_string(),
            },
        ));
    }
    Ok(())
}

/// Validate the file sources of create-pr
///
/// At least one of `--dir`, `--file` or `--delete` is needed, and `--prefix`
/// only applies to `--dir`
pub fn validate_create_pr_sources(
    dir: &Option<PathBuf>,
    prefix: &Option<String>,
    files: &[String],
    deletes: &[String],
) -> Result<()> {
    if prefix.is_some() && dir.is_none() {
        return Err(validation_error_to_anyhow(
            CommandValidationError::RequiresArgument {
                argument: "--prefix".to_string(),
                requires: "--dir".to_string(),
            },
        ));
    }

    if dir.is_none() && files.is_empty() && deletes.is_empty() {
        return Err(validation_error_to_anyhow(
            CommandValidationError::MissingRequired {
                argument: "--delete".to_string(),
                alternatives: vec!["--dir".to_string(), "--file".to_string()],
            },
        ));
    }

    if let Some(path) = deletes.iter().find(|p| p.trim_matches('/').trim().is_empty()) {
        return Err(validation_error_to_anyhow(
            CommandValidationError::InvalidValue {
                argument: "delete".to_string(),
                value: path.clone(),
                reason: "path cannot be empty".to_string(),
            },
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_provider_name() {
        assert!(validate_provider_name(&None).is_ok());
        assert!(validate_provider_name(&Some("azure-devops".to_string())).is_ok());

        let result = validate_provider_name(&Some("gitea".to_string()));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid value 'gitea' for provider")
        );
    }

    #[test]
    fn test_validate_repo_url() {
        assert!(validate_repo_url("git@github.com:org/repo.git").is_ok());
        assert!(validate_repo_url("https://dev.azure.com/org/project/_git/repo").is_ok());
        assert!(validate_repo_url("  ").is_err());
        assert!(validate_repo_url("not a url").is_err());
    }

    #[test]
    fn test_validate_branch_name_valid() {
        assert!(validate_branch_name(&Some("feature/cluster-01".to_string())).is_ok());
        assert!(validate_branch_name(&None).is_ok());
    }

    #[test]
    fn test_validate_branch_name_invalid() {
        for name in ["", "-x", "x.", "a..b", "a b", "x/"] {
            assert!(
                validate_branch_name(&Some(name.to_string())).is_err(),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_validate_commit_message() {
        assert!(validate_commit_message(&Some("Add cluster".to_string())).is_ok());
        assert!(validate_commit_message(&None).is_ok());
        assert!(
            validate_commit_message(&Some("   ".to_string()))
                .unwrap_err()
                .to_string()
                .contains("commit message cannot be empty")
        );
    }

    #[test]
    fn test_validate_create_pr_sources() {
        let dir = Some(PathBuf::from("out"));
        assert!(validate_create_pr_sources(&dir, &Some("clusters".to_string()), &[], &[]).is_ok());
        assert!(validate_create_pr_sources(&None, &None, &[], &["a.yaml".to_string()]).is_ok());

        let err = validate_create_pr_sources(&None, &None, &[], &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Either --dir, --file or --delete must be provided"
        );

        let err = validate_create_pr_sources(&None, &Some("x".to_string()), &["a".to_string()], &[])
            .unwrap_err();
        assert_eq!(err.to_string(), "--prefix can only be used with --dir");

        assert!(validate_create_pr_sources(&None, &None, &[], &["/".to_string()]).is_err());
    }

    #[test]
    fn test_command_validation_error_display() {
        let error = CommandValidationError::MissingRequired {
            argument: "--repo".to_string(),
            alternatives: vec![],
        };
        assert_eq!(error.to_string(), "--repo is required");

        let error = CommandValidationError::InvalidValue {
            argument: "branch".to_string(),
            value: "-invalid".to_string(),
            reason: "invalid format".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value '-invalid' for branch: invalid format"
        );
    }
}
