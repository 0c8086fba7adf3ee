//! Token access gate
//!
//! Shared-secret check in front of every RPC method.

use chunkwise_core::error::{AppError, Result};
use chunkwise_core::port::{AccessGate, Credentials};
use std::collections::HashSet;

pub struct TokenAccessGate {
    tokens: HashSet<String>,
    allow_anonymous: bool,
}

impl TokenAccessGate {
    pub fn new<I, S>(tokens: I, allow_anonymous: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
            allow_anonymous,
        }
    }
}

impl AccessGate for TokenAccessGate {
    fn check(&self, credentials: &Credentials) -> Result<()> {
        match credentials.token.as_deref() {
            Some(token) if self.tokens.contains(token) => Ok(()),
            Some(_) => Err(AppError::AccessDenied("unknown token".to_string())),
            None if self.allow_anonymous => Ok(()),
            None => Err(AppError::AccessDenied("token required".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_token_passes() {
        let gate = TokenAccessGate::new(["s3cret"], false);
        assert!(gate.check(&Credentials::token("s3cret")).is_ok());
        assert!(gate.check(&Credentials::token("guess")).is_err());
        assert!(gate.check(&Credentials::anonymous()).is_err());
    }

    #[test]
    fn test_anonymous_allowed_but_wrong_token_is_not() {
        let gate = TokenAccessGate::new(Vec::<String>::new(), true);
        assert!(gate.check(&Credentials::anonymous()).is_ok());
        assert!(matches!(
            gate.check(&Credentials::token("guess")).unwrap_err(),
            AppError::AccessDenied(_)
        ));
    }

    #[test]
    fn test_empty_tokens_are_ignored() {
        let gate = TokenAccessGate::new([""], false);
        assert!(gate.check(&Credentials::token("")).is_err());
    }
}
