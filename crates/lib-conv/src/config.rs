//! Convolution configuration loading and validation.

use crate::block::BlockStrategy;
use crate::error::{ConvError, ConvResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Block convolution method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Sum the overlapping tails of independently convolved blocks.
    #[default]
    OverlapAdd,
    /// Reuse trailing input as context and discard wraparound output.
    OverlapSave,
}

/// Top-level convolution configuration.
///
/// # Example
///
/// ```toml
/// method = "overlap_save"
/// block_len = 256
/// strategy = "spectral"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvolutionConfig {
    /// Block method.
    #[serde(default)]
    pub method: Method,

    /// Block length `N1`. For overlap-save this is the window length and
    /// must exceed the kernel length minus one.
    #[serde(default = "default_block_len")]
    pub block_len: usize,

    /// Per-block convolution step.
    #[serde(default)]
    pub strategy: BlockStrategy,
}

fn default_block_len() -> usize { 1024 }

impl Default for ConvolutionConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            block_len: default_block_len(),
            strategy: BlockStrategy::default(),
        }
    }
}

impl ConvolutionConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ConvResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConvError::Config(format!("Failed to parse config as TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(content: &str) -> ConvResult<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| ConvError::Config(format!("Failed to parse config as JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    ///
    /// `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: &Path) -> ConvResult<Self> {
        tracing::info!("Loading convolution config from {:?}", path);
        let content = std::fs::read_to_string(path)?;

        if path.extension().map_or(false, |e| e == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Validate parameters that do not depend on the kernel.
    ///
    /// The overlap-save constraint against the kernel length is checked when
    /// an engine is built.
    pub fn validate(&self) -> ConvResult<()> {
        if self.block_len == 0 {
            return Err(ConvError::invalid("block_len", "block length must be at least 1"));
        }
        Ok(())
    }
}
