use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `BroomServerConfig` used across broom components.
pub struct BroomServerConfig {
    pub bind: String,
    pub public_url: String,
    pub api_base: String,
    pub access_token: String,
    pub command_token: Option<String>,
    /// Secret carried by dialog callback URLs and required by the admin routes.
    pub dialog_secret: String,
    pub config_path: PathBuf,
    pub request_timeout_ms: u64,
}

impl BroomServerConfig {
    /// Startup checks. A failure here keeps the server from ever becoming ready.
    pub fn validate(&self) -> Result<SocketAddr> {
        if self.public_url.trim().is_empty() {
            bail!("--public-url must be provided: dialog callbacks need an externally reachable base URL");
        }
        if !self.public_url.starts_with("http://") && !self.public_url.starts_with("https://") {
            bail!(
                "invalid --public-url '{}': expected an http(s) URL",
                self.public_url
            );
        }
        if self.api_base.trim().is_empty() {
            bail!("--api-base must be provided");
        }
        if self.access_token.trim().is_empty() {
            bail!("--access-token cannot be empty");
        }
        if self.dialog_secret.trim().is_empty() {
            bail!("--dialog-secret must be provided: dialog submissions are authenticated with it");
        }
        self.bind
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid --bind '{}': expected host:port", self.bind))
    }
}
