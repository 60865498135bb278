// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use super::transform::{SampleMode, TransformSession};
use std::f32::consts::PI;

#[cfg(test)]
mod tests {
    use super::*;

    fn peak_index(power: &[f32]) -> usize {
        power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn real_mode_output_lengths() {
        let mut session = TransformSession::new(1024);
        assert!(session.ensure_mode(SampleMode::Real));

        let frame = vec![0.0f32; 1024];
        let out = session.process(&frame);
        assert_eq!(out.spectrum.len(), 513);
        assert_eq!(out.power.len(), 513);
    }

    #[test]
    fn real_cosine_peaks_at_its_bin() {
        let n = 16usize;
        let mut session = TransformSession::new(n);
        session.ensure_mode(SampleMode::Real);

        // unit cosine at exactly bin 2: X[2] = n/2, power = (n/2)^2
        let frame: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 2.0 * i as f32 / n as f32).cos())
            .collect();
        let out = session.process(&frame);

        assert_eq!(peak_index(out.power), 2);
        let expected = (n as f32 / 2.0).powi(2);
        assert!((out.power[2] - expected).abs() < expected * 1e-3);
    }

    #[test]
    fn complex_mode_is_centered() {
        let n = 8usize;
        let mut session = TransformSession::new(n);
        session.ensure_mode(SampleMode::Complex);

        // complex exponential at bin 1: with the centered ordering starting
        // at -(n/2 - 1) frequency steps, bin k lands at index k + n/2 - 1
        let mut frame = Vec::with_capacity(2 * n);
        for i in 0..n {
            let phase = 2.0 * PI * 1.0 * i as f32 / n as f32;
            frame.push(phase.cos());
            frame.push(phase.sin());
        }
        let out = session.process(&frame);

        assert_eq!(out.spectrum.len(), n);
        assert_eq!(out.power.len(), n);
        assert_eq!(peak_index(out.power), 1 + n / 2 - 1);
        let expected = (n as f32).powi(2);
        assert!((out.power[4] - expected).abs() < expected * 1e-3);
    }

    #[test]
    fn complex_dc_lands_left_of_center() {
        let n = 8usize;
        let mut session = TransformSession::new(n);
        session.ensure_mode(SampleMode::Complex);

        let mut frame = Vec::with_capacity(2 * n);
        for _ in 0..n {
            frame.push(1.0);
            frame.push(0.0);
        }
        let out = session.process(&frame);
        assert_eq!(peak_index(out.power), n / 2 - 1);
    }

    #[test]
    fn mode_transitions_are_reported() {
        let mut session = TransformSession::new(64);
        assert_eq!(session.mode(), None);
        assert!(session.ensure_mode(SampleMode::Real));
        assert!(!session.ensure_mode(SampleMode::Real));
        assert!(session.ensure_mode(SampleMode::Complex));
        assert_eq!(session.mode(), Some(SampleMode::Complex));
        assert!(session.ensure_mode(SampleMode::Real));
    }

    #[test]
    fn size_change_rebuilds_the_live_kernel() {
        let mut session = TransformSession::new(64);
        session.ensure_mode(SampleMode::Real);
        assert_eq!(session.process(&vec![0.0; 64]).power.len(), 33);

        session.set_fft_size(128);
        assert_eq!(session.mode(), Some(SampleMode::Real));
        let out = session.process(&vec![0.0; 128]);
        assert_eq!(out.spectrum.len(), 65);
        assert_eq!(out.power.len(), 65);
    }

    #[test]
    fn power_is_squared_magnitude_of_spectrum() {
        let n = 32usize;
        let mut session = TransformSession::new(n);
        session.ensure_mode(SampleMode::Real);

        let frame: Vec<f32> = (0..n).map(|i| (i as f32 * 0.37).sin()).collect();
        let out = session.process(&frame);
        for (c, &p) in out.spectrum.iter().zip(out.power) {
            assert!((c.norm_sqr() - p).abs() <= f32::EPSILON * p.max(1.0));
        }
    }

    #[test]
    fn reset_drops_the_kernel() {
        let mut session = TransformSession::new(64);
        session.ensure_mode(SampleMode::Complex);
        session.reset();
        assert_eq!(session.mode(), None);
    }
}
