use crate::model::Player;
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt::Debug;

#[fauna_derive::fauna_error]
pub enum PlayerStoreError {
    #[error("SQL error{}: {source}", format_context(.context))]
    Sqlx { source: sqlx::Error, context: Option<Cow<'static, str>> },

    /// The email is already registered.
    #[error("Duplicate email{}", format_context(.context))]
    Duplicate { context: Option<Cow<'static, str>> },

    #[error("Corrupt row{}: {message}", format_context(.context))]
    Corrupt { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[async_trait]
pub trait PlayerRepository: Debug + Send + Sync {
    /// Fails with [`PlayerStoreError::Duplicate`] when the email is taken.
    async fn insert(&self, player: &Player) -> Result<(), PlayerStoreError>;

    /// Lookup by normalized email.
    async fn by_email(&self, email: &str) -> Result<Option<Player>, PlayerStoreError>;

    async fn by_id(&self, id: &str) -> Result<Option<Player>, PlayerStoreError>;
}
