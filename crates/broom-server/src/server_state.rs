//! Shared request state: one hot-reloadable configuration and the chat platform.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use broom_core::{load_broom_config_file, BroomConfig, ChatPlatform, CommandContext};

use crate::server_config::BroomServerConfig;

#[derive(Clone)]
/// Public struct `BroomServerState` used across broom components.
pub struct BroomServerState {
    config: Arc<ArcSwap<BroomConfig>>,
    config_path: PathBuf,
    platform: Arc<dyn ChatPlatform>,
    public_url: String,
    command_token: Option<String>,
    dialog_secret: String,
}

impl BroomServerState {
    pub fn new(settings: &BroomServerConfig, platform: Arc<dyn ChatPlatform>) -> Result<Self> {
        let config = load_broom_config_file(&settings.config_path)?;
        tracing::info!(
            path = %settings.config_path.display(),
            restrict_to_admins_only = config.restrict_to_admins_only,
            confirmation_policy = config.confirmation_policy.as_str(),
            "loaded broom config"
        );
        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: settings.config_path.clone(),
            platform,
            public_url: settings.public_url.trim_end_matches('/').to_string(),
            command_token: settings.command_token.clone(),
            dialog_secret: settings.dialog_secret.clone(),
        })
    }

    /// Immutable snapshot used for the whole of one request.
    pub fn config_snapshot(&self) -> Arc<BroomConfig> {
        self.config.load_full()
    }

    /// Re-reads the config file. The active config is only replaced when loading succeeds.
    pub fn reload_config(&self) -> Result<Arc<BroomConfig>> {
        match load_broom_config_file(&self.config_path) {
            Ok(config) => {
                let config = Arc::new(config);
                self.config.store(config.clone());
                tracing::info!(
                    path = %self.config_path.display(),
                    restrict_to_admins_only = config.restrict_to_admins_only,
                    confirmation_policy = config.confirmation_policy.as_str(),
                    "reloaded broom config"
                );
                Ok(config)
            }
            Err(error) => {
                tracing::error!(
                    path = %self.config_path.display(),
                    error = %format!("{error:#}"),
                    "config reload failed; keeping previous config"
                );
                Err(error)
            }
        }
    }

    pub fn command_context<'a>(&'a self, config: &'a BroomConfig) -> CommandContext<'a> {
        CommandContext {
            config,
            platform: self.platform.as_ref(),
            public_url: &self.public_url,
            dialog_token: &self.dialog_secret,
        }
    }

    /// `true` only for the configured dialog secret. An empty secret accepts nothing.
    pub fn accepts_dialog_token(&self, token: Option<&str>) -> bool {
        !self.dialog_secret.is_empty() && token == Some(self.dialog_secret.as_str())
    }

    /// `true` when no verification token is configured or `token` matches it.
    pub fn accepts_command_token(&self, token: &str) -> bool {
        self.command_token
            .as_deref()
            .map(|expected| expected == token)
            .unwrap_or(true)
    }
}
