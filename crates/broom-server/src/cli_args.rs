use std::path::PathBuf;

use clap::Parser;

use crate::server_config::BroomServerConfig;

#[derive(Debug, Parser)]
#[command(
    name = "broom-server",
    about = "Slash-command server that bulk deletes chat posts",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "BROOM_BIND",
        default_value = "127.0.0.1:8065",
        help = "Socket address the HTTP server listens on"
    )]
    pub bind: String,

    #[arg(
        long = "public-url",
        env = "BROOM_PUBLIC_URL",
        help = "Externally reachable base URL of this server, used for dialog callbacks"
    )]
    pub public_url: Option<String>,

    #[arg(
        long = "api-base",
        env = "BROOM_API_BASE",
        default_value = "http://127.0.0.1:8065",
        help = "Base URL of the Mattermost server (without /api/v4)"
    )]
    pub api_base: String,

    #[arg(
        long = "access-token",
        env = "BROOM_ACCESS_TOKEN",
        hide_env_values = true,
        help = "Bot or personal access token used for Mattermost API calls"
    )]
    pub access_token: String,

    #[arg(
        long = "command-token",
        env = "BROOM_COMMAND_TOKEN",
        hide_env_values = true,
        help = "Optional slash-command verification token; requests with another token are rejected"
    )]
    pub command_token: Option<String>,

    #[arg(
        long = "dialog-secret",
        env = "BROOM_DIALOG_SECRET",
        hide_env_values = true,
        help = "Secret embedded in dialog callback URLs; also guards /config/reload"
    )]
    pub dialog_secret: Option<String>,

    #[arg(
        long = "config",
        env = "BROOM_CONFIG",
        default_value = "broom-config.json",
        help = "Path of the JSON config file holding restrictToAdminsOnly and confirmationPolicy"
    )]
    pub config_path: PathBuf,

    #[arg(
        long = "request-timeout-ms",
        env = "BROOM_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        help = "Timeout applied to every Mattermost API request"
    )]
    pub request_timeout_ms: u64,
}

impl Cli {
    pub fn into_server_config(self) -> BroomServerConfig {
        BroomServerConfig {
            bind: self.bind,
            public_url: self.public_url.unwrap_or_default(),
            api_base: self.api_base,
            access_token: self.access_token,
            command_token: self.command_token.filter(|token| !token.trim().is_empty()),
            dialog_secret: self.dialog_secret.unwrap_or_default(),
            config_path: self.config_path,
            request_timeout_ms: self.request_timeout_ms,
        }
    }
}
