// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Stream metadata and output-axis derivation
//!
//! The input side describes a stream's sampling (sample period, real or
//! complex representation) plus keyed numeric side-channel values. From that
//! and the current parameter snapshot this module derives the descriptive
//! parameters of the two output streams: frequency step and start frequency
//! of the spectral axis, window length, and the time step between output
//! frames. The spectrum output is always complex-valued, the power output
//! always real-valued.

use std::collections::HashMap;

use log::warn;
use serde::Serialize;

use crate::params::ParamSnapshot;

/// Keyword names that can carry the absolute RF centre frequency, in lookup
/// order; the first one present wins.
pub const RF_KEYWORDS: [&str; 2] = ["CHAN_RF", "COL_RF"];

/// Sampling description of an input stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMetadata {
    /// Seconds between consecutive samples.
    pub sample_period: f64,
    /// Samples are complex (interleaved re/im pairs) rather than real.
    pub complex: bool,
    /// Keyed numeric side-channel values, carried through to the outputs.
    pub keywords: HashMap<String, f64>,
}

impl SignalMetadata {
    pub fn new(sample_period: f64, complex: bool) -> Self {
        Self {
            sample_period,
            complex,
            keywords: HashMap::new(),
        }
    }

    pub fn with_keyword(mut self, name: &str, value: f64) -> Self {
        self.keywords.insert(name.to_string(), value);
        self
    }

    /// The RF centre frequency, if any of the known keywords is present.
    pub fn rf_center(&self) -> Option<f64> {
        RF_KEYWORDS
            .iter()
            .find_map(|name| self.keywords.get(*name).copied())
    }
}

/// Axis unit tags of an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AxisUnits {
    Frequency,
    Time,
}

/// Descriptive parameters of one output stream's axes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectralMetadata {
    /// Hz between consecutive frequency bins.
    pub freq_step: f64,
    /// Frequency of the first bin, in Hz (IF or RF depending on settings).
    pub start_freq: f64,
    /// Bins per output frame.
    pub subsize: usize,
    /// Seconds between consecutive output frames.
    pub time_step: f64,
    pub x_units: AxisUnits,
    pub y_units: AxisUnits,
    /// Output values are complex (spectrum) rather than real (power).
    pub complex_output: bool,
    /// Keywords passed along from the input stream.
    pub keywords: HashMap<String, f64>,
}

/// Derive the output metadata pair (spectrum, power) for the current input
/// sampling and parameter snapshot.
pub fn derive_output_metadata(
    input: &SignalMetadata,
    params: &ParamSnapshot,
) -> (SpectralMetadata, SpectralMetadata) {
    let period_in = input.sample_period;
    let freq_step = 1.0 / (period_in * params.fft_size as f64);

    // baseband (IF) start of the spectral axis: DC for real input, the
    // centered convention for complex input
    let if_start = if input.complex {
        -(((params.fft_size / 2) as f64 - 1.0) * freq_step)
    } else {
        0.0
    };

    let start_freq = if params.rf_units {
        match input.rf_center() {
            Some(rf) => {
                // real data sits at fs/4, complex data at 0
                let if_center = if input.complex {
                    0.0
                } else {
                    1.0 / period_in / 4.0
                };
                if_start + (rf - if_center)
            }
            None => {
                warn!("RF frequency units requested but no RF keyword present");
                if_start
            }
        }
    } else {
        if_start
    };

    let subsize = if input.complex {
        params.fft_size
    } else {
        params.fft_size / 2 + 1
    };

    let spectrum = SpectralMetadata {
        freq_step,
        start_freq,
        subsize,
        time_step: period_in * params.stride as f64,
        x_units: AxisUnits::Frequency,
        y_units: AxisUnits::Time,
        complex_output: true,
        keywords: input.keywords.clone(),
    };

    let mut power = SpectralMetadata {
        complex_output: false,
        ..spectrum.clone()
    };
    if params.num_average > 2 {
        power.time_step *= params.num_average as f64;
    }

    (spectrum, power)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(fft_size: usize, overlap: usize, num_average: usize, rf_units: bool) -> ParamSnapshot {
        ParamSnapshot {
            fft_size,
            overlap,
            stride: fft_size - overlap,
            num_average,
            do_spectrum: true,
            do_power: true,
            rf_units,
            log_coeff: 0.0,
            ..ParamSnapshot::default()
        }
    }

    #[test]
    fn frequency_step_from_sample_period() {
        let input = SignalMetadata::new(1.0 / 48000.0, false);
        let (spec, pow) = derive_output_metadata(&input, &snapshot(1024, 0, 1, false));
        let expected = 48000.0 / 1024.0;
        assert!((spec.freq_step - expected).abs() < 1e-9);
        assert!((pow.freq_step - expected).abs() < 1e-9);
    }

    #[test]
    fn real_axis_starts_at_dc() {
        let input = SignalMetadata::new(1e-3, false);
        let (spec, pow) = derive_output_metadata(&input, &snapshot(64, 0, 1, false));
        assert_eq!(spec.start_freq, 0.0);
        assert_eq!(pow.start_freq, 0.0);
        assert_eq!(spec.subsize, 33);
    }

    #[test]
    fn complex_axis_is_centered() {
        let input = SignalMetadata::new(1e-3, true);
        let params = snapshot(64, 0, 1, false);
        let (spec, _) = derive_output_metadata(&input, &params);
        let step = 1.0 / (1e-3 * 64.0);
        assert!((spec.start_freq + 31.0 * step).abs() < 1e-9);
        assert_eq!(spec.subsize, 64);
    }

    #[test]
    fn rf_units_translate_real_input_by_if_center() {
        // with sample period T and RF tag R: start = R - 1/(4T)
        let t = 1.0 / 48000.0;
        let input = SignalMetadata::new(t, false).with_keyword("CHAN_RF", 1.0e9);
        let (spec, _) = derive_output_metadata(&input, &snapshot(1024, 0, 1, true));
        assert!((spec.start_freq - (1.0e9 - 12000.0)).abs() < 1e-6);
    }

    #[test]
    fn rf_units_translate_complex_input_directly() {
        let t = 1.0 / 48000.0;
        let input = SignalMetadata::new(t, true).with_keyword("COL_RF", 1.0e9);
        let params = snapshot(1024, 0, 1, true);
        let (spec, _) = derive_output_metadata(&input, &params);
        let if_start = -(((1024 / 2) as f64 - 1.0) / (t * 1024.0));
        assert!((spec.start_freq - (if_start + 1.0e9)).abs() < 1e-6);
    }

    #[test]
    fn first_rf_keyword_wins() {
        let input = SignalMetadata::new(1e-3, true)
            .with_keyword("CHAN_RF", 5.0e8)
            .with_keyword("COL_RF", 7.0e8);
        let (with_both, _) = derive_output_metadata(&input, &snapshot(64, 0, 1, true));
        let only_chan = SignalMetadata::new(1e-3, true).with_keyword("CHAN_RF", 5.0e8);
        let (expected, _) = derive_output_metadata(&only_chan, &snapshot(64, 0, 1, true));
        assert_eq!(with_both.start_freq, expected.start_freq);
    }

    #[test]
    fn missing_rf_keyword_falls_back_to_if() {
        let input = SignalMetadata::new(1e-3, true);
        let rf = snapshot(64, 0, 1, true);
        let baseband = snapshot(64, 0, 1, false);
        let (with_rf, _) = derive_output_metadata(&input, &rf);
        let (without, _) = derive_output_metadata(&input, &baseband);
        assert_eq!(with_rf.start_freq, without.start_freq);
    }

    #[test]
    fn time_step_scales_with_stride() {
        let input = SignalMetadata::new(1e-3, false);
        let (spec, _) = derive_output_metadata(&input, &snapshot(64, 16, 1, false));
        assert!((spec.time_step - 48.0e-3).abs() < 1e-12);
    }

    #[test]
    fn averaging_multiplies_power_time_step_only_above_two() {
        let input = SignalMetadata::new(1e-3, false);

        for depth in [1usize, 2] {
            let (spec, pow) = derive_output_metadata(&input, &snapshot(64, 0, depth, false));
            assert_eq!(pow.time_step, spec.time_step, "depth {} must not scale", depth);
        }

        let (spec, pow) = derive_output_metadata(&input, &snapshot(64, 0, 3, false));
        assert!((pow.time_step - spec.time_step * 3.0).abs() < 1e-12);
    }

    #[test]
    fn output_value_tags() {
        let input = SignalMetadata::new(1e-3, false).with_keyword("COL_RF", 1.0);
        let (spec, pow) = derive_output_metadata(&input, &snapshot(64, 0, 1, false));
        assert!(spec.complex_output);
        assert!(!pow.complex_output);
        assert_eq!(spec.x_units, AxisUnits::Frequency);
        assert_eq!(spec.y_units, AxisUnits::Time);
        // keywords ride along on both outputs
        assert_eq!(spec.keywords.get("COL_RF"), Some(&1.0));
        assert_eq!(pow.keywords.get("COL_RF"), Some(&1.0));
    }
}
