use std::borrow::Cow;

/// A specialized [`DatabaseError`] enum of this crate.
#[fauna_derive::fauna_error]
pub enum DatabaseError {
    /// Builder misuse, e.g. a missing URL.
    #[error("Validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The store could not be opened or stayed unhealthy.
    #[error("Database connection failed{}: {message}", format_context(.context))]
    Connection { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A wrapper for underlying `sqlx` errors.
    #[error("SQLx error{}: {source}", format_context(.context))]
    Sqlx { source: sqlx::Error, context: Option<Cow<'static, str>> },

    /// Migration failures or checksum drift.
    #[error("Migration error{}: {message}", format_context(.context))]
    Migration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal database error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
