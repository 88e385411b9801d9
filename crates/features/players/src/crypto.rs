//! Password digests.

use argon2::Argon2;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use getrandom::fill;
use std::borrow::Cow;
use std::fmt::Debug;

const SALT_LEN: usize = 16;

#[fauna_derive::fauna_error]
pub enum CryptoError {
    #[error("Entropy source failed{}: {message}", format_context(.context))]
    Entropy { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Password hashing failed{}: {message}", format_context(.context))]
    Hash { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A stored digest is not a valid PHC string.
    #[error("Malformed digest{}: {message}", format_context(.context))]
    Digest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Turns passwords into digests and checks them.
pub trait Authenticator: Debug + Send + Sync {
    /// # Errors
    /// [`CryptoError`] when no digest can be produced.
    fn hash(&self, password: &str) -> Result<String, CryptoError>;

    /// `Ok(false)` for a wrong password; errors are reserved for broken digests.
    ///
    /// # Errors
    /// [`CryptoError::Digest`] when `digest` cannot be parsed.
    fn verify(&self, password: &str, digest: &str) -> Result<bool, CryptoError>;
}

/// Argon2id with the crate's default cost, PHC encoded.
#[derive(Debug, Default, Clone)]
pub struct Argon2Authenticator {
    argon: Argon2<'static>,
}

impl Argon2Authenticator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn salt() -> Result<SaltString, CryptoError> {
        let mut bytes = [0u8; SALT_LEN];
        fill(&mut bytes).map_err(|e| CryptoError::Entropy {
            message: e.to_string().into(),
            context: Some("Failed to generate salt".into()),
        })?;
        SaltString::encode_b64(&bytes)
            .map_err(|e| CryptoError::Hash { message: e.to_string().into(), context: Some("Encoding salt".into()) })
    }
}

impl Authenticator for Argon2Authenticator {
    fn hash(&self, password: &str) -> Result<String, CryptoError> {
        let salt = Self::salt()?;
        let digest = self
            .argon
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CryptoError::Hash { message: e.to_string().into(), context: None })?;
        Ok(digest.to_string())
    }

    fn verify(&self, password: &str, digest: &str) -> Result<bool, CryptoError> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| CryptoError::Digest { message: e.to_string().into(), context: None })?;

        match self.argon.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CryptoError::Digest { message: e.to_string().into(), context: None }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digests_verify_and_are_salted() {
        let auth = Argon2Authenticator::new();
        let first = auth.hash("correct horse").unwrap();
        let second = auth.hash("correct horse").unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(auth.verify("correct horse", &first).unwrap());
        assert!(!auth.verify("battery staple", &first).unwrap());
    }

    #[test]
    fn malformed_digest_is_an_error() {
        let err = Argon2Authenticator::new().verify("anything", "plain-text").unwrap_err();
        assert!(matches!(err, CryptoError::Digest { .. }));
    }
}
