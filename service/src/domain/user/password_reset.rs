//! [`PasswordReset`] definitions.

use std::{str::FromStr, time::Duration};

#[cfg(doc)]
use common::DateTime;
use common::{unit::Expiration, DateTimeOf};
use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use sha2::{Digest as _, Sha256};

#[cfg(doc)]
use crate::domain::User;

/// Pending password reset of a [`User`].
///
/// Only the [`TokenHash`] is stored, the [`Token`] itself is sent to the
/// [`User`] and never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct PasswordReset {
    /// [`TokenHash`] of the issued [`Token`].
    pub token_hash: TokenHash,

    /// [`DateTime`] when this [`PasswordReset`] expires.
    pub expires_at: ExpirationDateTime,
}

impl PasswordReset {
    /// Issues a new [`PasswordReset`] living for the provided `ttl`.
    ///
    /// Returns the plain [`Token`] to be delivered to the [`User`].
    #[must_use]
    pub fn issue(ttl: Duration) -> (Token, Self) {
        let token = Token::generate();
        let reset = Self {
            token_hash: TokenHash::of(&token),
            expires_at: ExpirationDateTime::now() + ttl,
        };
        (token, reset)
    }

    /// Checks whether the provided [`Token`] redeems this [`PasswordReset`].
    #[must_use]
    pub fn accepts(&self, token: &Token) -> bool {
        !self.expires_at.is_elapsed() && self.token_hash == TokenHash::of(token)
    }
}

/// Secret password reset token: 32 random bytes, hex-encoded.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
pub struct Token(String);

impl Token {
    /// Generates a new random [`Token`].
    #[must_use]
    pub fn generate() -> Self {
        Self(hex::encode(rand::random::<[u8; 32]>()))
    }

    /// Creates a new [`Token`] if the given `token` looks like one.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (token.len() == 64 && token.bytes().all(|b| b.is_ascii_hexdigit()))
            .then_some(Self(token))
    }
}

impl FromStr for Token {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid password reset `Token`")
    }
}

/// SHA-256 hash of a [`Token`], hex-encoded.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct TokenHash(String);

impl TokenHash {
    /// Calculates the [`TokenHash`] of the given [`Token`].
    #[must_use]
    pub fn of(token: &Token) -> Self {
        Self(hex::encode(Sha256::digest(token.0.as_bytes())))
    }
}

/// [`DateTime`] when a [`PasswordReset`] expires.
pub type ExpirationDateTime = DateTimeOf<(PasswordReset, Expiration)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::{ExpirationDateTime, PasswordReset, Token, TokenHash};

    #[test]
    fn accepts_issued_token_only() {
        let (token, reset) = PasswordReset::issue(Duration::from_secs(3600));

        assert!(reset.accepts(&token));
        assert!(!reset.accepts(&Token::generate()));
        assert_ne!(reset.token_hash.as_ref(), token.as_ref());
    }

    #[test]
    fn rejects_expired() {
        let (token, mut reset) = PasswordReset::issue(Duration::from_secs(60));
        reset.expires_at = ExpirationDateTime::now() - Duration::from_secs(1);

        assert!(!reset.accepts(&token));
    }

    #[test]
    fn token_format() {
        let token = Token::generate();
        assert_eq!(token.as_ref().len(), 64);
        assert_eq!(Token::new(token.to_string()), Some(token.clone()));
        assert!(Token::new("abc").is_none());
        assert_eq!(TokenHash::of(&token), TokenHash::of(&token));
    }
}
