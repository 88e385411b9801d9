use crate::domain::constants::{ENV_PREFIX, ENV_SEPARATOR};
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

#[fauna_derive::fauna_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads configuration from a file layered with environment overrides.
///
/// 1. **Base file**: `path` (any format the `config` crate detects by extension), or
///    `server` in the working directory when `None`. The file is required.
/// 2. **Environment**: variables prefixed with `FAUNA__`, nested with `__`
///    (`FAUNA__SPAWNS__MAX_TTL_MS` maps to `spawns.max_ttl_ms`).
///
/// # Errors
/// Fails when the file is missing or the merged values do not fit `T`.
///
/// # Example
/// ```rust
/// use fauna_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let path = path.map_or_else(|| PathBuf::from("server"), |p| p.as_ref().to_path_buf());
    info!("Loading config from {}", path.display());

    Config::builder()
        .add_source(File::from(path.as_path()).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}
