// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Live processing parameters with hot reload
//!
//! Parameter updates may arrive from a control thread at any time while a
//! stream's worker is processing. The worker never computes under the lock:
//! once per processing cycle it copies the whole parameter set into a local
//! snapshot, so it always sees a mutually consistent set of fields. Change
//! flags tell the worker what to rebuild; the `refresh_metadata` flag is
//! sticky across cycles until actually consumed, the others are single-shot
//! because they are always fully applied within the cycle that sees them.

use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;

/// One consistent copy of the parameter set, including pending change flags.
#[derive(Debug, Clone, Default)]
pub struct ParamSnapshot {
    pub fft_size: usize,
    pub overlap: usize,
    pub stride: usize,
    pub num_average: usize,
    pub do_spectrum: bool,
    pub do_power: bool,
    pub rf_units: bool,
    pub log_coeff: f32,
    pub fft_size_changed: bool,
    pub num_average_changed: bool,
    pub refresh_metadata: bool,
}

/// Shared, externally updatable parameter set for one stream session.
///
/// Cloning shares the underlying state; the control path keeps one handle,
/// the worker another.
#[derive(Clone)]
pub struct SharedParams {
    inner: Arc<Mutex<ParamSnapshot>>,
}

impl SharedParams {
    pub fn new(
        fft_size: usize,
        overlap: usize,
        num_average: usize,
        log_coeff: f32,
        do_spectrum: bool,
        do_power: bool,
        rf_units: bool,
    ) -> Self {
        let overlap = clamp_overlap(overlap, fft_size);
        Self {
            inner: Arc::new(Mutex::new(ParamSnapshot {
                fft_size,
                overlap,
                stride: fft_size - overlap,
                num_average: num_average.max(1),
                do_spectrum,
                do_power,
                rf_units,
                log_coeff,
                // a fresh session builds its structures and pushes output
                // metadata on its first cycle
                fft_size_changed: true,
                num_average_changed: true,
                refresh_metadata: true,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ParamSnapshot> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_fft_size(&self, fft_size: usize) {
        let mut p = self.lock();
        p.fft_size = fft_size;
        p.overlap = clamp_overlap(p.overlap, fft_size);
        p.stride = p.fft_size - p.overlap;
        p.fft_size_changed = true;
        p.refresh_metadata = true;
    }

    pub fn set_overlap(&self, overlap: usize) {
        let mut p = self.lock();
        p.overlap = clamp_overlap(overlap, p.fft_size);
        p.stride = p.fft_size - p.overlap;
        p.refresh_metadata = true;
    }

    pub fn set_num_average(&self, num_average: usize) {
        let mut p = self.lock();
        if num_average == 0 {
            warn!("averaging depth 0 requested, using 1");
        }
        p.num_average = num_average.max(1);
        p.num_average_changed = true;
        p.refresh_metadata = true;
    }

    pub fn set_log_coefficient(&self, log_coeff: f32) {
        self.lock().log_coeff = log_coeff;
    }

    pub fn set_output_selection(&self, do_power: bool, do_spectrum: bool) {
        let mut p = self.lock();
        p.do_power = do_power;
        p.do_spectrum = do_spectrum;
    }

    pub fn set_rf_units(&self, enable: bool) {
        let mut p = self.lock();
        p.rf_units = enable;
        p.refresh_metadata = true;
    }

    pub fn force_metadata_refresh(&self) {
        self.lock().refresh_metadata = true;
    }

    /// Plain copy of the current state; change flags are left untouched.
    pub fn read(&self) -> ParamSnapshot {
        self.lock().clone()
    }

    /// Capture the parameter set into `cache`, exactly once per processing
    /// cycle. A `refresh_metadata` still pending in `cache` from an earlier
    /// cycle is preserved; the single-shot change flags in the shared state
    /// are cleared since the caller addresses them this cycle.
    pub fn snapshot(&self, cache: &mut ParamSnapshot) {
        let mut p = self.lock();
        let pending = cache.refresh_metadata;
        *cache = p.clone();
        cache.refresh_metadata = p.refresh_metadata || pending;
        p.fft_size_changed = false;
        p.num_average_changed = false;
        p.refresh_metadata = false;
    }
}

fn clamp_overlap(overlap: usize, fft_size: usize) -> usize {
    let max = fft_size.saturating_sub(1);
    if overlap > max {
        warn!(
            "overlap {} must stay below the transform size {}, clamping to {}",
            overlap, fft_size, max
        );
        max
    } else {
        overlap
    }
}
