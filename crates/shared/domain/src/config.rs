use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Every configuration section of the service.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub spawns: SpawnsConfig,
    pub logging: LoggingConfig,
}

/// Arc-wrapped configuration, cloned freely into slices and background tasks.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten, default)]
    inner: Arc<ApiConfigInner>,
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// HTTP listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
}

/// TLS certificate/key paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// `SQLite` connection settings. `sqlite::memory:` keeps everything in process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

/// Spawn pool tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpawnsConfig {
    /// Lower bound of a fresh spawn's lifetime.
    pub min_ttl_ms: u64,
    /// Upper bound of a fresh spawn's lifetime.
    pub max_ttl_ms: u64,
    /// Radius used by nearby lookups that omit `maxDistance`.
    pub default_max_distance_m: f64,
    /// How many times a replenishment is tried while the store reports contention.
    pub replenish_attempts: u32,
    /// Optional JSON fixture with habitats, species and branches imported at startup.
    pub seed_file: Option<PathBuf>,
    /// Period of the expired spawn sweep; `0` disables it.
    pub sweep_interval_secs: u64,
    /// How long a spawn stays in storage after it expired.
    pub sweep_grace_secs: u64,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Extra `EnvFilter` directives, e.g. `sqlx=warn,tower_http=debug`.
    pub filter: Option<String>,
    /// Enables the rolling file layer when set.
    pub directory: Option<PathBuf>,
    pub json: bool,
    pub max_files: usize,
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 4583, ssl: None }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite::memory:".to_owned(), max_connections: 8, busy_timeout_ms: 5_000 }
    }
}

impl Default for SpawnsConfig {
    fn default() -> Self {
        Self {
            min_ttl_ms: 3_600_000,
            max_ttl_ms: 36_000_000,
            default_max_distance_m: 1_000.0,
            replenish_attempts: 3,
            seed_file: None,
            sweep_interval_secs: 300,
            sweep_grace_secs: 3_600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            filter: None,
            directory: None,
            json: false,
            max_files: 7,
        }
    }
}
