use crate::repository::StoreError;
use fauna_kernel::security::resource::ResourceGuardError;
use std::borrow::Cow;

/// A specialized [`SpawnError`] enum of this crate.
#[fauna_derive::fauna_error]
pub enum SpawnError {
    /// Bad client input, reported per field.
    #[error("Invalid {field}: {message}")]
    Validation { field: Cow<'static, str>, message: Cow<'static, str> },

    #[error("{message}")]
    NotFound { message: Cow<'static, str> },

    /// The request is well formed but the current state forbids it.
    #[error("{message}")]
    Conflict { message: Cow<'static, str> },

    #[error("Storage failure{}: {source}", format_context(.context))]
    Storage { source: StoreError, context: Option<Cow<'static, str>> },

    /// Invalid `[spawns]` settings.
    #[error("Spawn configuration error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Seed file error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Seed fixture error{}: {source}", format_context(.context))]
    Fixture { source: serde_json::Error, context: Option<Cow<'static, str>> },
}

impl SpawnError {
    pub(crate) fn invalid(
        field: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub(crate) fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict { message: message.into() }
    }
}

impl From<ResourceGuardError> for SpawnError {
    fn from(err: ResourceGuardError) -> Self {
        match err {
            ResourceGuardError::Validation { field, message } => Self::Validation { field, message },
        }
    }
}
