// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the spectral estimation engine
//!
//! The configuration is backed by a YAML file; every field has a default so
//! a minimal (or absent) file works. Loaded values seed the
//! [`EngineSettings`](crate::session::registry::EngineSettings) that new
//! stream sessions start from; command line overrides are applied on top
//! with [`PsdConfig::apply_args`].

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::session::registry::EngineSettings;

/// Engine configuration, one field per reconfigurable parameter plus the
/// worker scheduling bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsdConfig {
    /// Time-domain samples per analysis frame.
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,

    /// Samples shared between consecutive frames; must stay below `fft_size`.
    #[serde(default)]
    pub overlap: usize,

    /// Power spectra per averaged output; 1 disables averaging.
    #[serde(default = "default_num_average")]
    pub num_average: usize,

    /// Log compression coefficient; values <= 0 disable compression.
    #[serde(default)]
    pub log_coefficient: f32,

    /// Express output frequencies against the stream's RF centre keyword.
    #[serde(default)]
    pub rf_units: bool,

    /// Produce the complex spectrum output.
    #[serde(default = "default_output_enabled")]
    pub do_spectrum: bool,

    /// Produce the power spectral density output.
    #[serde(default = "default_output_enabled")]
    pub do_power: bool,

    /// Worker input poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bounded wait for a worker to stop, in milliseconds.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_fft_size() -> usize {
    1024
}

fn default_num_average() -> usize {
    1
}

fn default_output_enabled() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_shutdown_timeout_ms() -> u64 {
    1000
}

impl Default for PsdConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            overlap: 0,
            num_average: default_num_average(),
            log_coefficient: 0.0,
            rf_units: false,
            do_spectrum: default_output_enabled(),
            do_power: default_output_enabled(),
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl PsdConfig {
    /// Load configuration from a YAML file, creating a default file when
    /// none exists yet.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;
        let config: PsdConfig = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;
        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line overrides; only explicitly provided values win.
    pub fn apply_args(
        &mut self,
        fft_size: Option<usize>,
        overlap: Option<usize>,
        num_average: Option<usize>,
        log_coefficient: Option<f32>,
        rf_units: Option<bool>,
    ) {
        if let Some(fft_size) = fft_size {
            debug!("Overriding fft size from command line: {}", fft_size);
            self.fft_size = fft_size;
        }
        if let Some(overlap) = overlap {
            debug!("Overriding overlap from command line: {}", overlap);
            self.overlap = overlap;
        }
        if let Some(num_average) = num_average {
            debug!("Overriding averaging depth from command line: {}", num_average);
            self.num_average = num_average;
        }
        if let Some(coeff) = log_coefficient {
            debug!("Overriding log coefficient from command line: {}", coeff);
            self.log_coefficient = coeff;
        }
        if let Some(rf_units) = rf_units {
            debug!("Overriding RF units from command line: {}", rf_units);
            self.rf_units = rf_units;
        }
    }

    /// The engine settings this configuration describes.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            fft_size: self.fft_size,
            overlap: self.overlap,
            num_average: self.num_average,
            log_coefficient: self.log_coefficient,
            rf_units: self.rf_units,
            do_spectrum: self.do_spectrum,
            do_power: self.do_power,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_roundtrip_preserves_fields() {
        let mut config = PsdConfig::default();
        config.fft_size = 4096;
        config.overlap = 1024;
        config.log_coefficient = 10.0;
        config.rf_units = true;

        let yaml = serde_yml::to_string(&config).unwrap();
        let parsed: PsdConfig = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.fft_size, 4096);
        assert_eq!(parsed.overlap, 1024);
        assert_eq!(parsed.log_coefficient, 10.0);
        assert!(parsed.rf_units);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: PsdConfig = serde_yml::from_str("fft_size: 2048\n").unwrap();
        assert_eq!(parsed.fft_size, 2048);
        assert_eq!(parsed.num_average, 1);
        assert!(parsed.do_spectrum);
        assert!(parsed.do_power);
        assert_eq!(parsed.poll_interval_ms, 100);
    }

    #[test]
    fn overrides_only_apply_when_provided() {
        let mut config = PsdConfig::default();
        config.apply_args(Some(8192), None, Some(4), None, Some(true));
        assert_eq!(config.fft_size, 8192);
        assert_eq!(config.overlap, 0);
        assert_eq!(config.num_average, 4);
        assert_eq!(config.log_coefficient, 0.0);
        assert!(config.rf_units);
    }
}
