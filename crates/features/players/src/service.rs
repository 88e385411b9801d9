use crate::crypto::{Authenticator, CryptoError};
use crate::error::{PlayerError, PlayerErrorExt};
use crate::model::{NewPlayer, Player, PlayerProfile};
use crate::repository::{PlayerRepository, PlayerStoreError};
use chrono::{SubsecRound, Utc};
use fauna_kernel::safe_nanoid;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument};

pub const MIN_PASSWORD_LEN: usize = 8;
const BAD_CREDENTIALS: &str = "Invalid email or password";
const DECOY_PASSWORD: &str = "decoy-password-never-matches";

/// Signup and login.
#[derive(Debug, Clone)]
pub struct PlayerService {
    players: Arc<dyn PlayerRepository>,
    auth: Arc<dyn Authenticator>,
    /// Digest verified against when the email is unknown, so both login failures cost one hash.
    decoy: Arc<OnceLock<String>>,
}

impl PlayerService {
    pub fn new(players: Arc<dyn PlayerRepository>, auth: Arc<dyn Authenticator>) -> Self {
        Self { players, auth, decoy: Arc::default() }
    }

    /// Registers an account. Emails are stored lower-cased.
    ///
    /// # Errors
    /// * [`PlayerError::Validation`] for empty names, an email without `@` or a short password.
    /// * [`PlayerError::Conflict`] when the email is already registered.
    /// * [`PlayerError::Storage`], [`PlayerError::Crypto`] on infrastructure failures.
    #[instrument(skip_all, fields(email = %input.email.trim()))]
    pub async fn signup(&self, input: NewPlayer) -> Result<PlayerProfile, PlayerError> {
        let first_name = required(&input.first_name, "firstName")?;
        let last_name = required(&input.last_name, "lastName")?;
        let email = normalize_email(&input.email)?;
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PlayerError::invalid("password", "must be at least 8 characters"));
        }

        let password_hash = self.hash(input.password).await?;
        let player = Player {
            id: safe_nanoid!(),
            first_name,
            last_name,
            email,
            password_hash,
            created_at: Utc::now().trunc_subsecs(3),
        };

        match self.players.insert(&player).await {
            Ok(()) => {
                info!(player = %player.id, "Player registered");
                Ok(player.into())
            }
            Err(PlayerStoreError::Duplicate { .. }) => {
                Err(PlayerError::Conflict { message: "Email already registered".into() })
            }
            Err(err) => Err(err).context("Registering player"),
        }
    }

    /// # Errors
    /// * [`PlayerError::Validation`] for an empty email or password.
    /// * [`PlayerError::Unauthorized`] for an unknown email or a wrong password.
    /// * [`PlayerError::Storage`], [`PlayerError::Crypto`] on infrastructure failures.
    #[instrument(skip_all, fields(email = %email.trim()))]
    pub async fn login(&self, email: &str, password: &str) -> Result<PlayerProfile, PlayerError> {
        let email = required(email, "email")?.to_lowercase();
        if password.is_empty() {
            return Err(PlayerError::invalid("password", "must not be empty"));
        }

        let Some(player) = self.players.by_email(&email).await.context("Loading player")? else {
            debug!("Unknown email");
            let decoy = self.decoy_digest().await?;
            self.verify(password.to_owned(), decoy).await?;
            return Err(unauthorized());
        };

        if !self.verify(password.to_owned(), player.password_hash.clone()).await? {
            debug!(player = %player.id, "Wrong password");
            return Err(unauthorized());
        }

        info!(player = %player.id, "Player logged in");
        Ok(player.into())
    }

    async fn decoy_digest(&self) -> Result<String, PlayerError> {
        if let Some(digest) = self.decoy.get() {
            return Ok(digest.clone());
        }
        let digest = self.hash(DECOY_PASSWORD.to_owned()).await?;
        Ok(self.decoy.get_or_init(|| digest).clone())
    }

    async fn hash(&self, password: String) -> Result<String, PlayerError> {
        let auth = Arc::clone(&self.auth);
        tokio::task::spawn_blocking(move || auth.hash(&password)).await.map_err(join_error)?.map_err(Into::into)
    }

    async fn verify(&self, password: String, digest: String) -> Result<bool, PlayerError> {
        let auth = Arc::clone(&self.auth);
        tokio::task::spawn_blocking(move || auth.verify(&password, &digest))
            .await
            .map_err(join_error)?
            .map_err(Into::into)
    }
}

fn join_error(err: tokio::task::JoinError) -> PlayerError {
    PlayerError::Crypto {
        source: CryptoError::Hash { message: err.to_string().into(), context: None },
        context: Some("Password task".into()),
    }
}

fn unauthorized() -> PlayerError {
    PlayerError::Unauthorized { message: BAD_CREDENTIALS.into() }
}

fn required(value: &str, field: &'static str) -> Result<String, PlayerError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PlayerError::invalid(field, "must not be empty"));
    }
    Ok(value.to_owned())
}

fn normalize_email(email: &str) -> Result<String, PlayerError> {
    let email = required(email, "email")?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(PlayerError::invalid("email", "must be a valid email address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(normalize_email("ana.example.com").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("").is_err());
    }
}
