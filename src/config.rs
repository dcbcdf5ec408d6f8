//! Run configuration file (`fpga-link.toml`)
//!
//! Every field is optional; command-line flags override what is set here.
//! Line framing (115200 8N1) is fixed and not configurable.

use crate::coefficients::DEFAULT_COEFF_THRESHOLD;
use crate::link::port::DEFAULT_DEVICE;
use crate::link::LinkConfig;
use crate::stream::{Progress, DEFAULT_SAMPLE_THRESHOLD};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "fpga-link.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub link: LinkSection,
    pub stream: StreamSection,
    pub coefficients: CoefficientSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkSection {
    /// Serial device path
    pub device: String,
    /// Reply timeout in milliseconds; 0 waits forever
    pub timeout_ms: u64,
}

impl Default for LinkSection {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            timeout_ms: 0,
        }
    }
}

impl LinkSection {
    pub fn to_link_config(&self) -> LinkConfig {
        let timeout = (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms));
        LinkConfig::new(&self.device).with_timeout(timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamSection {
    pub threshold: u64,
    pub input: PathBuf,
    pub output: PathBuf,
    pub progress: Progress,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SAMPLE_THRESHOLD,
            input: PathBuf::from("waveform_sample.txt"),
            output: PathBuf::from("fpga_sampling.txt"),
            progress: Progress::Dots,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoefficientSection {
    pub threshold: u64,
    pub input: PathBuf,
}

impl Default for CoefficientSection {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_COEFF_THRESHOLD,
            input: PathBuf::from("coeffs.txt"),
        }
    }
}

impl AppConfig {
    /// Load the explicit config file, else `fpga-link.toml` if present,
    /// else the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
