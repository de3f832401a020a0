use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const BROOM_CONFIG_SCHEMA_VERSION: u32 = 1;
pub const BROOM_CONFIG_FILE_NAME: &str = "broom-config.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `ConfirmationPolicy` values.
pub enum ConfirmationPolicy {
    #[default]
    Always,
    Never,
    Optional,
}

impl ConfirmationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Never => "never",
            Self::Optional => "optional",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Read-only settings consulted by every command and dialog submission.
pub struct BroomConfig {
    pub schema_version: u32,
    #[serde(default, rename = "restrictToAdminsOnly")]
    pub restrict_to_admins_only: bool,
    #[serde(default, rename = "confirmationPolicy")]
    pub confirmation_policy: ConfirmationPolicy,
}

impl Default for BroomConfig {
    fn default() -> Self {
        Self {
            schema_version: BROOM_CONFIG_SCHEMA_VERSION,
            restrict_to_admins_only: false,
            confirmation_policy: ConfirmationPolicy::default(),
        }
    }
}

pub fn load_broom_config_file(path: &Path) -> Result<BroomConfig> {
    if !path.exists() {
        return Ok(BroomConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read broom config {}", path.display()))?;
    let parsed = serde_json::from_str::<BroomConfig>(&raw)
        .with_context(|| format!("failed to parse broom config {}", path.display()))?;
    validate_broom_config(&parsed)?;
    Ok(parsed)
}

fn validate_broom_config(config: &BroomConfig) -> Result<()> {
    if config.schema_version != BROOM_CONFIG_SCHEMA_VERSION {
        bail!(
            "unsupported broom config schema_version {} (expected {})",
            config.schema_version,
            BROOM_CONFIG_SCHEMA_VERSION
        );
    }
    Ok(())
}
