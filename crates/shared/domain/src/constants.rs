//! Names shared between configuration, logging and the HTTP surface.

pub const APP_NAME: &str = "fauna";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix of environment overrides, e.g. `FAUNA__SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "FAUNA";
pub const ENV_SEPARATOR: &str = "__";

// OpenAPI tags
pub const SYSTEM_TAG: &str = "System";
pub const BRANCHES_TAG: &str = "Branches";
pub const BAG_TAG: &str = "Bag";
pub const PLAYERS_TAG: &str = "Players";
