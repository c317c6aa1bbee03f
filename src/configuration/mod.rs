//! Configuration entities and the seam to the configuration subsystem.
//!
//! Retrieval and composition of server configuration live outside the
//! supervisor; it only needs something that resolves an id to a fully
//! joined [`ServerConfiguration`] and materializes it into the files the
//! server executable reads on start.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A fully joined, ready-to-run server configuration.
///
/// The payload is opaque to the supervisor: it is produced and validated
/// elsewhere and only flows through to the materializer. The id composes
/// the per-run log file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfiguration {
    pub id: i64,
    #[serde(default)]
    pub payload: Value,
}

/// The two on-disk files a launched server consumes, passed to it via the
/// `-c` and `-r` flags.
#[derive(Debug, Clone)]
pub struct MaterializedConfig {
    pub config_path: PathBuf,
    pub roster_path: PathBuf,
}

/// Resolves a configuration id to a full configuration.
pub trait ConfigurationStore: Send + Sync {
    fn load(&self, id: i64) -> Result<ServerConfiguration>;
}

/// Writes a configuration to the well-known file paths.
pub trait ConfigurationMaterializer: Send + Sync {
    fn write(&self, config: &ServerConfiguration) -> Result<MaterializedConfig>;
}

/// File-backed store reading a JSON array of configurations from disk.
pub struct FileConfigurationStore {
    file_path: PathBuf,
}

impl FileConfigurationStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

impl ConfigurationStore for FileConfigurationStore {
    fn load(&self, id: i64) -> Result<ServerConfiguration> {
        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("reading {}", self.file_path.display()))?;
        let configurations: Vec<ServerConfiguration> =
            serde_json::from_str(&content).context("parsing configuration store")?;

        configurations
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow::anyhow!("configuration not found: {}", id))
    }
}

/// Materializes configurations as JSON into a fixed output directory:
/// `server_cfg.json` for the `server` section of the payload and
/// `roster.json` for the `roster` section. A missing section produces an
/// empty object so the server always receives both paths.
pub struct JsonMaterializer {
    out_dir: PathBuf,
}

impl JsonMaterializer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    fn section(config: &ServerConfiguration, key: &str) -> Value {
        config
            .payload
            .get(key)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}

impl ConfigurationMaterializer for JsonMaterializer {
    fn write(&self, config: &ServerConfiguration) -> Result<MaterializedConfig> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("creating {}", self.out_dir.display()))?;

        let config_path = self.out_dir.join("server_cfg.json");
        let roster_path = self.out_dir.join("roster.json");

        fs::write(
            &config_path,
            serde_json::to_string_pretty(&Self::section(config, "server"))?,
        )
        .with_context(|| format!("writing {}", config_path.display()))?;
        fs::write(
            &roster_path,
            serde_json::to_string_pretty(&Self::section(config, "roster"))?,
        )
        .with_context(|| format!("writing {}", roster_path.display()))?;

        Ok(MaterializedConfig {
            config_path,
            roster_path,
        })
    }
}
