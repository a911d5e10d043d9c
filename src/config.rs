//! Runtime configuration for the `devptr-probe` binary.
//!
//! Configuration can be loaded from a JSON file or constructed programmatically.
//! CLI flags override the corresponding file settings.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "devptr-probe", about = "Allocate, alias and release device buffers")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "probe.json")]
    pub config: PathBuf,

    /// Memory backend (overrides the config file).
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Number of buffers to allocate (overrides the config file).
    #[arg(long)]
    pub buffers: Option<usize>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

/// Where device buffers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Device memory simulated in host RAM.
    #[default]
    Host,
    /// CUDA device memory (requires the `cuda` feature).
    Cuda,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device selection.
    pub device: DeviceConfig,

    /// Probe workload.
    pub probe: ProbeConfig,
}

/// Device selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Memory backend.
    pub backend: Backend,

    /// CUDA device ordinal.
    pub ordinal: usize,

    /// Cap on live bytes for the host backend (None = unbounded).
    pub host_capacity: Option<usize>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Host,
            ordinal: 0,
            host_capacity: None,
        }
    }
}

/// Probe workload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Number of owning buffers to allocate.
    pub buffers: usize,

    /// `f32` elements per buffer.
    pub elements_per_buffer: usize,

    /// Append a non-owning alias of the first buffer to the group.
    pub alias_first: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            buffers: 4,
            elements_per_buffer: 1 << 20,
            alias_first: true,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply CLI overrides.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(backend) = cli.backend {
            self.device.backend = backend;
        }
        if let Some(buffers) = cli.buffers {
            self.probe.buffers = buffers;
        }
    }

    /// Size of one probe buffer in bytes.
    pub fn bytes_per_buffer(&self) -> DeviceResult<usize> {
        let elem_size = std::mem::size_of::<f32>();
        self.probe
            .elements_per_buffer
            .checked_mul(elem_size)
            .ok_or(DeviceError::SizeOverflow {
                len: self.probe.elements_per_buffer,
                elem_size,
            })
    }

    /// Bytes owned by the whole probe group.
    pub fn total_bytes(&self) -> DeviceResult<usize> {
        let per_buffer = self.bytes_per_buffer()?;
        per_buffer
            .checked_mul(self.probe.buffers)
            .ok_or(DeviceError::SizeOverflow {
                len: self.probe.buffers,
                elem_size: per_buffer,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.device.backend, Backend::Host);
        assert_eq!(cfg.probe.buffers, 4);
        assert_eq!(cfg.bytes_per_buffer().unwrap(), 4 << 20);
        assert_eq!(cfg.total_bytes().unwrap(), 16 << 20);
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{"device": {"backend": "cuda", "ordinal": 1}}"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.device.backend, Backend::Cuda);
        assert_eq!(cfg.device.ordinal, 1);
        assert_eq!(cfg.probe.buffers, 4);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["devptr-probe", "--backend", "cuda", "--buffers", "2"]);
        let mut cfg = Config::default();
        cfg.merge_cli(&cli);
        assert_eq!(cfg.device.backend, Backend::Cuda);
        assert_eq!(cfg.probe.buffers, 2);
    }

    #[test]
    fn test_huge_buffer_count_is_an_error() {
        let count = usize::MAX.to_string();
        let cli = Cli::parse_from(["devptr-probe", "--buffers", count.as_str()]);
        let mut cfg = Config::default();
        cfg.merge_cli(&cli);

        assert!(cfg.bytes_per_buffer().is_ok());
        assert!(matches!(
            cfg.total_bytes(),
            Err(DeviceError::SizeOverflow { len: usize::MAX, .. })
        ));
    }

    #[test]
    fn test_huge_buffer_size_is_an_error() {
        let mut cfg = Config::default();
        cfg.probe.elements_per_buffer = usize::MAX / 2;

        assert!(matches!(
            cfg.bytes_per_buffer(),
            Err(DeviceError::SizeOverflow { elem_size: 4, .. })
        ));
        assert!(cfg.total_bytes().is_err());
    }
}
