//! Operator credentials
//!
//! Operators present a shared token either as `Bearer <token>` or as the
//! password half of HTTP Basic credentials. Only SHA-256 digests of the
//! configured tokens are kept in memory.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use super::AuthError;

/// An authenticated operator. `label` is the Basic username when one was sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operator {
    pub label: Option<String>,
}

#[derive(Clone)]
pub struct OperatorCredentials {
    digests: Vec<[u8; 32]>,
}

impl std::fmt::Debug for OperatorCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorCredentials")
            .field("tokens", &self.digests.len())
            .finish()
    }
}

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

impl OperatorCredentials {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            digests: tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_string())
                .filter(|t| !t.is_empty())
                .map(|t| digest(&t))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Compares against every configured digest without short-circuiting.
    fn accepts(&self, token: &str) -> bool {
        let presented = digest(token);
        self.digests.iter().fold(false, |matched, known| {
            let same = known
                .iter()
                .zip(presented.iter())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0;
            matched | same
        })
    }

    /// Validate the raw value of an `Authorization` header.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Operator, AuthError> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::AuthenticationRequired)?;

        let (scheme, value) = header
            .split_once(' ')
            .ok_or(AuthError::MalformedCredentials)?;
        let value = value.trim();

        let (label, token) = if scheme.eq_ignore_ascii_case("bearer") {
            (None, value.to_string())
        } else if scheme.eq_ignore_ascii_case("basic") {
            let decoded = STANDARD
                .decode(value)
                .map_err(|_| AuthError::MalformedCredentials)?;
            let decoded =
                String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;
            let (user, password) = decoded
                .split_once(':')
                .ok_or(AuthError::MalformedCredentials)?;
            let label = (!user.is_empty()).then(|| user.to_string());
            (label, password.to_string())
        } else {
            return Err(AuthError::UnsupportedScheme);
        };

        if token.is_empty() || !self.accepts(&token) {
            return Err(AuthError::InvalidToken);
        }

        Ok(Operator { label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> OperatorCredentials {
        OperatorCredentials::new(["s3cret", "  second-token "])
    }

    #[test]
    fn test_bearer_token_accepted() {
        let operator = credentials().verify_header(Some("Bearer s3cret")).unwrap();
        assert_eq!(operator.label, None);
        assert!(credentials().verify_header(Some("bearer second-token")).is_ok());
    }

    #[test]
    fn test_basic_password_accepted() {
        let header = format!("Basic {}", STANDARD.encode("ops:s3cret"));
        let operator = credentials().verify_header(Some(&header)).unwrap();
        assert_eq!(operator.label.as_deref(), Some("ops"));
    }

    #[test]
    fn test_missing_header_rejected() {
        assert_eq!(
            credentials().verify_header(None),
            Err(AuthError::AuthenticationRequired)
        );
        assert_eq!(
            credentials().verify_header(Some("   ")),
            Err(AuthError::AuthenticationRequired)
        );
    }

    #[test]
    fn test_wrong_token_rejected() {
        assert_eq!(
            credentials().verify_header(Some("Bearer nope")),
            Err(AuthError::InvalidToken)
        );
        let header = format!("Basic {}", STANDARD.encode("ops:nope"));
        assert_eq!(
            credentials().verify_header(Some(&header)),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn test_unknown_scheme_and_garbage_rejected() {
        assert_eq!(
            credentials().verify_header(Some("Digest abc")),
            Err(AuthError::UnsupportedScheme)
        );
        assert_eq!(
            credentials().verify_header(Some("Basic !!!")),
            Err(AuthError::MalformedCredentials)
        );
        assert_eq!(
            credentials().verify_header(Some("s3cret")),
            Err(AuthError::MalformedCredentials)
        );
    }

    #[test]
    fn test_empty_tokens_are_ignored() {
        let creds = OperatorCredentials::new(["", "  "]);
        assert!(creds.is_empty());
        assert_eq!(
            creds.verify_header(Some("Bearer ")),
            Err(AuthError::MalformedCredentials)
        );
    }
}
