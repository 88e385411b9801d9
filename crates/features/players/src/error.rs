use crate::crypto::CryptoError;
use crate::repository::PlayerStoreError;
use std::borrow::Cow;

/// A specialized [`PlayerError`] enum of this crate.
#[fauna_derive::fauna_error]
pub enum PlayerError {
    #[error("Invalid {field}: {message}")]
    Validation { field: Cow<'static, str>, message: Cow<'static, str> },

    #[error("{message}")]
    Conflict { message: Cow<'static, str> },

    /// Unknown email or wrong password; the two are not told apart.
    #[error("{message}")]
    Unauthorized { message: Cow<'static, str> },

    #[error("Storage failure{}: {source}", format_context(.context))]
    Storage { source: PlayerStoreError, context: Option<Cow<'static, str>> },

    #[error("Crypto failure{}: {source}", format_context(.context))]
    Crypto { source: CryptoError, context: Option<Cow<'static, str>> },
}

impl PlayerError {
    pub(crate) fn invalid(field: &'static str, message: &'static str) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }
}
