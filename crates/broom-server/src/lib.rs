//! HTTP surface of the `/broom` slash command.
//!
//! Receives slash-command webhooks and confirmation dialog submissions, and wires the
//! hot-reloadable configuration and the Mattermost REST client into the core runtime.

mod bootstrap;
mod cli_args;
mod server_config;
mod server_routes;
mod server_state;

use std::sync::Arc;

use anyhow::{Context, Result};
use broom_mattermost::{MattermostApiClient, MattermostClientConfig};
use tokio::net::TcpListener;

pub use bootstrap::init_tracing;
pub use cli_args::Cli;
pub use server_config::BroomServerConfig;
pub use server_routes::{
    build_broom_router, ROUTE_COMMAND, ROUTE_COMMAND_AUTOCOMPLETE, ROUTE_CONFIG_RELOAD,
    ROUTE_HEALTH,
};
pub use server_state::BroomServerState;

/// Builds shared state against the Mattermost REST API described by `config`.
pub fn build_server_state(config: &BroomServerConfig) -> Result<Arc<BroomServerState>> {
    let platform = MattermostApiClient::new(&MattermostClientConfig {
        api_base: config.api_base.clone(),
        access_token: config.access_token.clone(),
        request_timeout_ms: config.request_timeout_ms,
    })?;
    Ok(Arc::new(BroomServerState::new(config, Arc::new(platform))?))
}

/// Run the broom slash-command server until Ctrl-C.
pub async fn run_broom_server(config: BroomServerConfig) -> Result<()> {
    let bind_addr = config.validate()?;
    let state = build_server_state(&config)?;

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind broom server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve broom server listen address")?;
    tracing::info!(
        addr = %local_addr,
        public_url = %config.public_url,
        api_base = %config.api_base,
        config_path = %config.config_path.display(),
        "broom server listening"
    );

    spawn_reload_on_hangup(state.clone())?;

    let app = build_broom_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("broom server exited unexpectedly")?;
    Ok(())
}

#[cfg(unix)]
fn spawn_reload_on_hangup(state: Arc<BroomServerState>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup =
        signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            // Failures are logged inside; the previous config stays active.
            let _ = state.reload_config();
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_state: Arc<BroomServerState>) -> Result<()> {
    Ok(())
}
