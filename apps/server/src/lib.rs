//! # Fauna Server
//!
//! HTTP front of the spawn pool: `Axum` routes over a shared `SQLite` database,
//! with Scalar API docs at `/api` and a background sweep of expired spawns.
//!
//! ## Example
//! ```no_run
//! use fauna_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(4583)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod router;

pub use router::app;

use anyhow::{Context, Result, anyhow};
use axum_server::Handle;
use chrono::Utc;
use fauna::domain::config::ApiConfig;
use fauna::features::spawns::Spawns;
use fauna::kernel::server::ApiState;
use fauna_database::Database;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);
const MAX_SWEEP_GRACE: chrono::Duration = chrono::Duration::days(3_650);

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    async fn init_database(&self) -> Result<Database> {
        Database::builder()
            .config(&self.cfg.database)
            .migrations(fauna::migrations())
            .init()
            .await
            .context("Failed to open the database")
    }

    fn validate_ssl_config(&self) -> Result<()> {
        if let Some(ssl) = &self.cfg.server.ssl {
            if !ssl.cert.exists() {
                anyhow::bail!("SSL certificate not found at: {}", ssl.cert.display());
            }
            if !ssl.key.exists() {
                anyhow::bail!("SSL key not found at: {}", ssl.key.display());
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let metadata = ssl.key.metadata()?;
                if metadata.permissions().mode() & 0o077 != 0 {
                    warn!(
                        "SECURITY: SSL Private Key {} has insecure permissions (should be 600)",
                        ssl.key.display()
                    );
                }
            }
        }
        Ok(())
    }

    /// Consumes the builder and initializes the server.
    ///
    /// # Process
    /// 1. Checks the TLS files when `[server.ssl]` is set
    /// 2. Opens the database and applies every slice's migrations
    /// 3. Initializes the feature slices (seed import included)
    /// 4. Registers the slices in the application state
    ///
    /// # Errors
    /// Returns an error if:
    /// * The database URL is malformed or a migration fails
    /// * The `[spawns]` section is invalid or the seed fixture cannot be imported
    /// * SSL certificate/key files are missing
    pub async fn build(self) -> Result<Server> {
        self.validate_ssl_config()?;

        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, database = %self.cfg.database.url, "Initializing server");

        let db = self.init_database().await?;
        let slices = fauna::init(&self.cfg, &db)
            .await
            .map_err(|e| anyhow!("Platform bootstrap failed: {e}"))?;

        let state = ApiState::builder()
            .config(self.cfg)
            .db(db)
            .register_slices(slices)
            .build()
            .context("Failed to finalize API state registry")?;
        info!(slices = ?state.slice_names().collect::<Vec<_>>(), "Slices registered");

        Ok(Server { state })
    }
}

/// A fully initialized server instance ready to run.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: ApiState,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Starts the server and runs until the shutdown signal is received.
    ///
    /// # Errors
    /// Returns an error if the router cannot be assembled, the server fails to
    /// bind to the configured address or TLS setup fails.
    pub async fn run(self) -> Result<()> {
        let cfg = self.state.config.clone();
        let address = SocketAddr::new(cfg.server.address, cfg.server.port);

        info!(address = %address, ssl = cfg.server.ssl.is_some(), "Starting server");

        let app = router::app(self.state.clone())?;
        let sweeper = spawn_sweeper(&self.state);

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();

        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        let served = if let Some(ssl_config) = &cfg.server.ssl {
            info!("Starting HTTPS server on https://{address}");

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &ssl_config.cert,
                &ssl_config.key,
            )
            .await
            .context("Failed to load SSL/TLS certificates")?;

            axum_server::bind_rustls(address, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")
        } else {
            info!("Starting HTTP server on http://{address}");

            axum_server::bind(address)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTP server failed")
        };

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        served?;

        info!("Server shutdown complete");
        Ok(())
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub const fn state(&self) -> &ApiState {
        &self.state
    }
}

/// Periodically deletes spawns that expired more than `sweep_grace_secs` ago.
///
/// Returns `None` when the sweep is disabled or the spawns slice is not registered.
fn spawn_sweeper(state: &ApiState) -> Option<JoinHandle<()>> {
    let settings = &state.config.spawns;
    if settings.sweep_interval_secs == 0 {
        info!("Expired spawn sweep disabled");
        return None;
    }

    let Some(spawns) = state.get_slice::<Spawns>().cloned() else {
        warn!("Spawns slice missing, sweep not started");
        return None;
    };
    let period = Duration::from_secs(settings.sweep_interval_secs);
    let grace = i64::try_from(settings.sweep_grace_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(MAX_SWEEP_GRACE);

    Some(tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; start sweeping one period in.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(err) = spawns.service.sweep(Utc::now(), grace).await {
                warn!(error = %err, "Expired spawn sweep failed");
            }
        }
    }))
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
