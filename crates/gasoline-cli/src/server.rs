//! Server mode: owns the bound listener, the HTTP router, the alarm
//! scheduler, and (unless `--server`) the stdio MCP transport, wired
//! together for the lifetime of one daemon process.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use gasoline_server::AppState;
use tokio::net::TcpListener;

use crate::{paths, singleton};

pub struct RunningServer {
    pub app: Arc<AppState>,
    listener: TcpListener,
    http_only: bool,
    persist: bool,
}

impl RunningServer {
    pub fn new(listener: TcpListener, api_key: Option<String>, http_only: bool, persist: bool) -> Self {
        let app = AppState::new(paths::kv_root(), api_key, HashSet::new());
        Self { app, listener, http_only, persist }
    }

    /// Runs the HTTP surface, the alarm tasks, and (unless HTTP-only) the
    /// stdio MCP transport, until shutdown is requested by SIGTERM or,
    /// absent `--persist`, stdin closing on the MCP side.
    pub async fn run(self, pid_path: &Path) -> anyhow::Result<()> {
        let RunningServer { app, listener, http_only, persist } = self;

        let http_state = gasoline_http::HttpState::new(app.clone(), app.api_key.clone());
        let router = gasoline_http::build_router(http_state.clone());
        let make_service = router.into_make_service_with_connect_info::<SocketAddr>();

        let background_handles = gasoline_server::spawn_background_tasks(app.clone());

        let http_task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, make_service).await {
                tracing::error!(%err, "http server task exited with error");
            }
        });

        let mcp = http_state.mcp.clone();
        let stdio_task = if http_only {
            None
        } else {
            Some(tokio::spawn(async move { gasoline_stdio::run_stdio(mcp).await }))
        };

        tokio::select! {
            _ = shutdown_signal() => {
                tracing::info!("shutdown signal received, draining");
            }
            result = wait_for_stdio(stdio_task, persist) => {
                if let Err(err) = result {
                    tracing::warn!(%err, "stdio transport ended with an error");
                }
            }
        }

        http_task.abort();
        for handle in background_handles {
            handle.abort();
        }
        let _ = app.kv.flush().await;
        singleton::remove_pid_file(pid_path);

        Ok(())
    }
}

/// Awaits the stdio task if present; when absent (HTTP-only mode) or when
/// `--persist` is set, never resolves, leaving SIGTERM as the only exit.
async fn wait_for_stdio(
    stdio_task: Option<tokio::task::JoinHandle<std::io::Result<()>>>,
    persist: bool,
) -> std::io::Result<()> {
    match stdio_task {
        Some(task) if !persist => task.await.unwrap_or_else(|err| {
            Err(std::io::Error::other(err.to_string()))
        }),
        _ => std::future::pending().await,
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
