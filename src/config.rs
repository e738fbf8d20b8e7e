use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::traits::FileSystem;

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = ".o11y-export.yaml";

const DEFAULT_BOOTSTRAP_URL: &str = "https://raw.githubusercontent.com/strk1204/Splunk-Observability-Terraform-Exporter/main/adt-resources/main.tf";

/// Exporter settings, loaded from YAML and overridden by CLI flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    /// Platform realm, e.g. `us1` or `au0`
    pub realm: String,

    /// API domain; requests go to `https://api.<realm>.<apiDomain>`
    pub api_domain: String,

    /// State backend binary (`terraform` or `tofu`)
    pub backend_binary: String,

    /// Upper bound for each backend invocation
    pub command_timeout_secs: u64,

    /// Where to download `main.tf` from when it is missing
    pub bootstrap_url: String,

    /// Output directory, relative to the working directory
    pub output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            realm: "au0".to_string(),
            api_domain: "signalfx.com".to_string(),
            backend_binary: "terraform".to_string(),
            command_timeout_secs: 300,
            bootstrap_url: DEFAULT_BOOTSTRAP_URL.to_string(),
            output_dir: "terraform_output".to_string(),
        }
    }
}

impl ExportConfig {
    /// Load the config at `path`. A missing file yields the defaults.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        if !fs.exists(path) {
            return Ok(Self::default());
        }

        let content = fs.read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: ExportConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
