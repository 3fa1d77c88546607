//! compat-relay binary.
//!
//! - Frames in on stdin, frames out on stdout
//! - Logs on stderr (stdout is reserved for frames)
//! - Bridge listener (`/v1/bridge`, ops endpoints) when the bridge invoker is selected
//! - Exit 0 on clean end of input or signal, 1 on a fatal error

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use compat_relay_core::error::{RelayError, Result};
use compat_relay_runner::{app_state::AppState, config, relay::Relay, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(class = e.class().as_str(), error = %e, "relay stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load_from_env()?;
    let state = AppState::new(cfg)?;

    if state.uses_bridge() {
        let listen: SocketAddr = state.cfg().bridge.listen.parse().map_err(|e| {
            RelayError::BadConfig(format!("bridge.listen must be a valid SocketAddr: {e}"))
        })?;
        let listener = tokio::net::TcpListener::bind(listen)
            .await
            .map_err(|e| RelayError::BadConfig(format!("bind {listen} failed: {e}")))?;
        let app = router::build_router(state.clone());

        tracing::info!(%listen, "bridge listener starting");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "bridge listener failed");
            }
        });
    }

    let mut relay = Relay::new(
        tokio::io::stdin(),
        tokio::io::stdout(),
        state.invoker(),
        state.watchdog(),
        state.metrics(),
    );

    tokio::select! {
        result = relay.run() => result,
        _ = shutdown_signal() => {
            tracing::info!("signal received, stopping relay");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
