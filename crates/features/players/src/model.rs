use chrono::{DateTime, Utc};
use fauna_derive::api_model;

/// Stored account. Only the digest of the password is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// What clients get to see of an account.
#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<Player> for PlayerProfile {
    fn from(player: Player) -> Self {
        Self {
            id: player.id,
            first_name: player.first_name,
            last_name: player.last_name,
            email: player.email,
            created_at: player.created_at,
        }
    }
}

/// Input of a signup.
#[derive(Debug, Clone, Default)]
pub struct NewPlayer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}
