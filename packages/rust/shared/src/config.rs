//! Configuration for contextual enrichment.
//!
//! Two layers:
//! - Host blobs (JSON): the module-wide [`GlobalConfig`], resolved once when
//!   the module is built, and the per-invocation [`AccountConfig`].
//! - Harness file (TOML): [`AppConfig`] at `~/.contextual/contextual.toml`,
//!   used by the CLI. CLI flags override file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContextualError, Result};

/// Placeholder in the endpoint template that is replaced by the account's silo.
pub const SILO_PLACEHOLDER: &str = "{{.SILO}}";

/// Endpoint template used when the global config does not override it.
pub const DEFAULT_ENDPOINT: &str = "http://pbs{{.SILO}}.p7cloud.net/ctx";

/// Default deadline for one classification fetch, body included.
pub const DEFAULT_TIMEOUT_MS: u64 = 1_000;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "contextual.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".contextual";

// ---------------------------------------------------------------------------
// Response framing
// ---------------------------------------------------------------------------

/// How the classification body is wrapped around its JSON payload.
///
/// Deployments differ: some answer with bare JSON, some with a JSONP-style
/// `callback({...})` wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseFraming {
    /// The body is the JSON document.
    #[default]
    Plain,

    /// The body is `callback(<json>)`, optionally followed by `;`.
    Jsonp {
        /// Require this exact callback name (e.g. `aspan.setIAB`).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        callback: Option<String>,
    },

    /// Strip exactly `prefix` leading and `suffix` trailing bytes.
    Fixed { prefix: usize, suffix: usize },
}

// ---------------------------------------------------------------------------
// Host blobs
// ---------------------------------------------------------------------------

/// Module-wide settings, resolved once at start-up and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Endpoint template containing [`SILO_PLACEHOLDER`].
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Deadline for one fetch in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Wrapper framing of the classification response.
    #[serde(default)]
    pub framing: ResponseFraming,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            framing: ResponseFraming::default(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl GlobalConfig {
    /// Resolve the global config from the host's optional JSON blob.
    ///
    /// Unknown keys (`enabled`, ...) are ignored. An empty endpoint falls back
    /// to [`DEFAULT_ENDPOINT`].
    pub fn from_json(blob: Option<&[u8]>) -> Result<Self> {
        let config = match blob {
            None => Self::default(),
            Some(bytes) => serde_json::from_slice::<Self>(bytes).map_err(|e| {
                ContextualError::config(format!("error reading global config: {e}"))
            })?,
        };
        config.normalized()
    }

    /// Apply fallbacks and reject values that can never work.
    pub fn normalized(mut self) -> Result<Self> {
        if self.endpoint.trim().is_empty() {
            self.endpoint = default_endpoint();
        }
        if self.timeout_ms == 0 {
            return Err(ContextualError::config("timeout_ms must be greater than zero"));
        }
        if !self.endpoint.contains(SILO_PLACEHOLDER) {
            tracing::debug!(endpoint = %self.endpoint, "endpoint template has no silo placeholder");
        }
        Ok(self)
    }
}

/// Per-account settings supplied by the host with each invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Classification-service partition for this account.
    #[serde(default)]
    pub silo: String,
}

impl AccountConfig {
    /// Decode and validate the account's JSON blob.
    pub fn from_json(blob: &[u8]) -> Result<Self> {
        let account: Self = serde_json::from_slice(blob).map_err(|e| {
            ContextualError::config(format!("error reading account information: {e}"))
        })?;
        account.validate()?;
        Ok(account)
    }

    /// The silo must be present.
    pub fn validate(&self) -> Result<()> {
        if self.silo.is_empty() {
            return Err(ContextualError::config("invalid silo ID provided"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness config file
// ---------------------------------------------------------------------------

/// Top-level harness config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Module-wide classification settings.
    #[serde(default)]
    pub classification: GlobalConfig,

    /// Account used when the CLI is not given `--silo`.
    #[serde(default)]
    pub account: AccountDefaults,
}

/// `[account]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silo: Option<String>,
}

/// Get the path to the config directory (`~/.contextual/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ContextualError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.contextual/contextual.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the harness config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the harness config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ContextualError::io(path, e))?;

    let mut config: AppConfig = toml::from_str(&content).map_err(|e| {
        ContextualError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.classification = config.classification.normalized()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ContextualError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| ContextualError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ContextualError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
