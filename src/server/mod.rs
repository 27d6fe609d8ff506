// src/server/mod.rs

//! Local dev server.
//!
//! - edit mode serves the build output first, the vendor directory under its
//!   mount point, then the raw source tree; it exposes the live-reload
//!   endpoints, injects the client script into HTML pages and never
//!   compresses.
//! - optimized mode serves the build output only, gzip-encoded for clients
//!   that accept it.

pub mod livereload;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::model::ConfigFile;
use crate::types::ServeMode;

pub use livereload::ReloadBroadcaster;

/// How long `stop` waits for open connections before aborting the listener.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Everything needed to build the router and bind the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub mode: ServeMode,
    pub hostname: String,
    pub port: u16,
    /// Directory served first.
    pub root: PathBuf,
    /// Directory consulted when `root` has no such file.
    pub fallback_root: Option<PathBuf>,
    /// `(mount point, directory)` for vendored packages.
    pub vendor: Option<(String, PathBuf)>,
    pub compress: bool,
    pub livereload: bool,
}

impl ServerConfig {
    pub fn edit(cfg: &ConfigFile) -> Self {
        Self {
            mode: ServeMode::Edit,
            hostname: cfg.server().hostname.clone(),
            port: cfg.server().port,
            root: cfg.dist_dir(),
            fallback_root: Some(cfg.src_dir()),
            vendor: Some((cfg.server().vendor_mount.clone(), cfg.vendor_dir())),
            compress: false,
            livereload: true,
        }
    }

    pub fn optimized(cfg: &ConfigFile) -> Self {
        Self {
            mode: ServeMode::Optimized,
            hostname: cfg.server().hostname.clone(),
            port: cfg.server().port,
            root: cfg.dist_dir(),
            fallback_root: None,
            vendor: None,
            compress: true,
            livereload: false,
        }
    }

    /// Bind every interface instead of the configured hostname.
    pub fn allow_remote(mut self, allow: bool) -> Self {
        if allow {
            self.hostname = "0.0.0.0".to_string();
        }
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Build the HTTP service for `config`.
pub fn router(config: &ServerConfig, reload: ReloadBroadcaster) -> Router {
    let files: Router = match &config.fallback_root {
        Some(fallback) => Router::new()
            .fallback_service(ServeDir::new(&config.root).fallback(ServeDir::new(fallback))),
        None => Router::new().fallback_service(ServeDir::new(&config.root)),
    };

    let mut app: Router<ReloadBroadcaster> = Router::new();
    if let Some((mount, dir)) = &config.vendor {
        app = app.nest_service(mount, ServeDir::new(dir));
    }
    if config.livereload {
        app = app
            .route(livereload::EVENTS_PATH, get(livereload::events))
            .route(livereload::SCRIPT_PATH, get(livereload::script));
    }

    let mut app = app.with_state(reload).merge(files);
    if config.livereload {
        app = app.layer(middleware::from_fn(livereload::inject_script));
    }
    if config.compress {
        app = app.layer(CompressionLayer::new());
    }
    app.layer(TraceLayer::new_for_http())
}

/// A running server. Dropping the handle shuts it down.
#[derive(Debug)]
pub struct DevServer {
    local_addr: SocketAddr,
    mode: ServeMode,
    reload: ReloadBroadcaster,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl DevServer {
    /// Bind `hostname:port` (port 0 picks a free port) and start serving.
    pub async fn start(config: ServerConfig, reload: ReloadBroadcaster) -> Result<Self> {
        let listener = TcpListener::bind((config.hostname.as_str(), config.port))
            .await
            .with_context(|| format!("binding {}:{}", config.hostname, config.port))?;
        let local_addr = listener.local_addr()?;

        let app = router(&config, reload.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(
            url = %format!("http://{local_addr}"),
            mode = ?config.mode,
            root = %config.root.display(),
            "dev server listening"
        );

        Ok(Self {
            local_addr,
            mode: config.mode,
            reload,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn mode(&self) -> ServeMode {
        self.mode
    }

    /// Graceful shutdown; waits for the listener task to finish.
    pub async fn stop(mut self) -> Result<()> {
        self.signal_shutdown();
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let abort = task.abort_handle();

        match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
            Ok(joined) => {
                joined.context("dev server task panicked")?.context("dev server")?;
            }
            Err(_) => {
                warn!("dev server did not stop in time; aborting");
                abort.abort();
            }
        }
        info!(addr = %self.local_addr, "dev server stopped");
        Ok(())
    }

    fn signal_shutdown(&mut self) {
        self.reload.close();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}
