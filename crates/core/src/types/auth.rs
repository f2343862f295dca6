//! Observable authentication state.
//!
//! Token issuance lives outside this workspace; the cart only needs to know
//! whether the session is signed in and which bearer token to present.

use core::fmt;

use secrecy::{ExposeSecret, SecretString};

/// A bearer access token issued by the backend's auth endpoint.
///
/// `Debug` never prints the token. Equality compares the secret value so that
/// a refreshed token counts as an authentication change.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Expose the raw token (for building an `Authorization` header).
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AccessToken {}

impl From<SecretString> for AccessToken {
    fn from(secret: SecretString) -> Self {
        Self(secret)
    }
}

/// Snapshot of the session's authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthState {
    /// Whether the user is signed in.
    pub is_authenticated: bool,
    /// Bearer token for the signed-in user, if any.
    pub credential: Option<AccessToken>,
}

impl AuthState {
    /// A signed-out (guest) session.
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            is_authenticated: false,
            credential: None,
        }
    }

    /// A signed-in session holding `token`.
    #[must_use]
    pub const fn signed_in(token: AccessToken) -> Self {
        Self {
            is_authenticated: true,
            credential: Some(token),
        }
    }

    /// The token to use for account-backed cart operations.
    ///
    /// Returns `Some` only when the session is authenticated *and* holds a
    /// token; a flag without a token is treated as a guest session.
    #[must_use]
    pub const fn account_token(&self) -> Option<&AccessToken> {
        match (&self.credential, self.is_authenticated) {
            (Some(token), true) => Some(token),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let state = AuthState::signed_in(AccessToken::new("eyJhbGciOi.secret"));
        let debug = format!("{state:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_token_equality_compares_value() {
        assert_eq!(AccessToken::new("abc"), AccessToken::new("abc"));
        assert_ne!(AccessToken::new("abc"), AccessToken::new("abd"));
    }

    #[test]
    fn test_account_token_requires_flag_and_token() {
        assert!(AuthState::guest().account_token().is_none());
        assert!(
            AuthState::signed_in(AccessToken::new("t"))
                .account_token()
                .is_some()
        );

        let flag_only = AuthState {
            is_authenticated: true,
            credential: None,
        };
        assert!(flag_only.account_token().is_none());

        let stale_token = AuthState {
            is_authenticated: false,
            credential: Some(AccessToken::new("t")),
        };
        assert!(stale_token.account_token().is_none());
    }

    #[test]
    fn test_auth_state_equality() {
        assert_eq!(AuthState::guest(), AuthState::default());
        assert_ne!(
            AuthState::signed_in(AccessToken::new("a")),
            AuthState::signed_in(AccessToken::new("b"))
        );
    }
}
