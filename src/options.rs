//! Provider options and their composable setters

use crate::constants::defaults;
use crate::error::{ProviderError, Result};

/// Flat option bag handed to [`crate::Provider::setup`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOption {
    pub hostname: String,
    pub oauth2_token: String,
    pub token_type: String,
    pub token: String,
    pub username: String,
    pub conditional_requests: bool,
}

impl ProviderOption {
    /// The configured token: the OAuth2 token when set, otherwise the personal token
    pub fn any_token(&self) -> Option<&str> {
        if !self.oauth2_token.is_empty() {
            Some(&self.oauth2_token)
        } else if !self.token.is_empty() {
            Some(&self.token)
        } else {
            None
        }
    }
}

/// A single option setter, applied in order by the factory
pub type OptionFn = Box<dyn Fn(&mut ProviderOption) -> Result<()> + Send + Sync>;

pub fn with_domain(domain: impl Into<String>) -> OptionFn {
    let domain = domain.into();
    Box::new(move |option| {
        if domain.trim().is_empty() {
            return Err(ProviderError::Configuration("Hostname".into()));
        }
        option.hostname = domain.clone();
        Ok(())
    })
}

pub fn with_oauth2_token(token: impl Into<String>) -> OptionFn {
    let token = token.into();
    Box::new(move |option| {
        option.oauth2_token = token.clone();
        option.token_type = defaults::OAUTH2_TOKEN_TYPE.to_string();
        Ok(())
    })
}

/// A token of a named type (`pat`, `personal`, `oauth2`, ...)
pub fn with_token(token_type: impl Into<String>, token: impl Into<String>) -> OptionFn {
    let token_type = token_type.into();
    let token = token.into();
    Box::new(move |option| {
        option.token_type = token_type.clone();
        option.token = token.clone();
        Ok(())
    })
}

pub fn with_username(username: impl Into<String>) -> OptionFn {
    let username = username.into();
    Box::new(move |option| {
        option.username = username.clone();
        Ok(())
    })
}

pub fn with_conditional_requests(enabled: bool) -> OptionFn {
    Box::new(move |option| {
        option.conditional_requests = enabled;
        Ok(())
    })
}

/// Fold setters over a fresh option, stopping at the first error
pub fn fold_options(options: &[OptionFn]) -> Result<ProviderOption> {
    let mut option = ProviderOption::default();
    for apply in options {
        apply(&mut option)?;
    }
    Ok(option)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_options() {
        let option = fold_options(&[
            with_domain("gitlab.example.com"),
            with_token("personal", "abc"),
            with_username("bot"),
            with_conditional_requests(true),
        ])
        .unwrap();

        assert_eq!(option.hostname, "gitlab.example.com");
        assert_eq!(option.token_type, "personal");
        assert_eq!(option.token, "abc");
        assert_eq!(option.username, "bot");
        assert!(option.conditional_requests);
        assert_eq!(option.any_token(), Some("abc"));
    }

    #[test]
    fn test_oauth2_token_takes_precedence() {
        let option =
            fold_options(&[with_token("pat", "personal"), with_oauth2_token("oauth")]).unwrap();
        assert_eq!(option.any_token(), Some("oauth"));
        assert_eq!(option.token_type, "oauth2");
    }

    #[test]
    fn test_empty_domain_short_circuits() {
        let err = fold_options(&[with_domain(""), with_token("pat", "x")]).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_no_token() {
        assert_eq!(ProviderOption::default().any_token(), None);
    }
}
