//! Restate handler authentication helpers
//!
//! Extract and validate operator credentials from Restate handler request headers.

use restate_sdk::prelude::*;

use super::{AuthError, Operator, OperatorCredentials};

/// Raw operator credential carried by the handler headers.
///
/// Prefers `x-operator-token` (set by proxies that consume `Authorization`
/// themselves) and falls back to `authorization`.
pub fn credential_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-operator-token")
        .or_else(|| headers.get("authorization"))
        .map(|value| &value[..])
}

/// Validate operator credentials carried by the handler headers.
pub fn authenticate(
    headers: &HeaderMap,
    credentials: &OperatorCredentials,
) -> Result<Operator, AuthError> {
    credentials.verify_header(credential_header(headers))
}

/// Like [`authenticate`], mapped to a terminal 401 for handler use.
pub fn require_operator(
    headers: &HeaderMap,
    credentials: &OperatorCredentials,
) -> Result<Operator, HandlerError> {
    authenticate(headers, credentials)
        .map_err(|e| TerminalError::new_with_code(401, e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_headers(value: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::default();
        if let Some(v) = value {
            map.insert(reqwest::header::AUTHORIZATION, v.to_string());
        }
        map
    }

    #[test]
    fn test_authenticate_valid_token() {
        let creds = OperatorCredentials::new(["test_secret"]);
        let headers = make_headers(Some("Bearer test_secret"));
        assert!(authenticate(&headers, &creds).is_ok());
    }

    #[test]
    fn test_authenticate_missing_header() {
        let creds = OperatorCredentials::new(["test_secret"]);
        let headers = make_headers(None);
        assert_eq!(
            authenticate(&headers, &creds),
            Err(AuthError::AuthenticationRequired)
        );
    }

    #[test]
    fn test_require_operator_rejects_invalid_token() {
        let creds = OperatorCredentials::new(["test_secret"]);
        let headers = make_headers(Some("Bearer other"));
        assert!(require_operator(&headers, &creds).is_err());
    }
}
