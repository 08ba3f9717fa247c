//! cpel.toml configuration
//!
//! # Example cpel.toml
//!
//! ```toml
//! [g2]
//! track = "cpu"
//! atomic_write = true
//! ```

use crate::error::{CpelError, Result};
use crate::event::TrackMode;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CpelConfig {
    /// Options for the track-oriented viewer output
    #[serde(default)]
    pub g2: G2Config,
}

/// `[g2]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct G2Config {
    /// "pid" or "cpu"; validated by [`CpelConfig::track_mode`]
    pub track: String,

    /// Write through a temporary file renamed into place
    pub atomic_write: bool,
}

impl Default for G2Config {
    fn default() -> Self {
        Self {
            track: TrackMode::default().to_string(),
            atomic_write: true,
        }
    }
}

impl CpelConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cpel::config::CpelConfig;
    ///
    /// # fn main() -> cpel::error::Result<()> {
    /// let config = CpelConfig::from_file("cpel.toml")?;
    /// println!("Track mode: {}", config.track_mode()?);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CpelError::Config(e.to_string()))
    }

    /// Configured track mode; unknown values are rejected here
    pub fn track_mode(&self) -> Result<TrackMode> {
        self.g2.track.parse()
    }
}
