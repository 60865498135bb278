// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Grouped element-wise averaging of power spectra

/// Accumulates power vectors and emits their element-wise mean once a full
/// group of `depth` vectors has been collected.
///
/// With depth 1 every input is immediately ready. A depth change or an
/// upstream mode/size change invalidates any partial group.
pub struct Averager {
    depth: usize,
    accum: Vec<f32>,
    count: usize,
    mean: Vec<f32>,
}

impl Averager {
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            accum: Vec::new(),
            count: 0,
            mean: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// A group is underway and not yet complete.
    pub fn in_progress(&self) -> bool {
        self.count > 0
    }

    /// Change the group size, discarding any partial accumulation; averaging
    /// across two different depths is not meaningful.
    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth.max(1);
        self.clear();
    }

    /// Discard the current group. Must be called whenever the upstream mode
    /// or transform size changes: accumulated bins from a different transform
    /// are invalid.
    pub fn clear(&mut self) {
        self.accum.fill(0.0);
        self.count = 0;
    }

    /// Add one power vector; returns the group mean when the group completes.
    pub fn accumulate(&mut self, power: &[f32]) -> Option<&[f32]> {
        if self.depth <= 1 {
            self.mean.clear();
            self.mean.extend_from_slice(power);
            return Some(&self.mean);
        }

        if self.accum.len() != power.len() {
            self.accum.clear();
            self.accum.resize(power.len(), 0.0);
            self.count = 0;
        }
        for (a, &p) in self.accum.iter_mut().zip(power) {
            *a += p;
        }
        self.count += 1;

        if self.count < self.depth {
            return None;
        }
        let inv = 1.0 / self.depth as f32;
        self.mean.clear();
        self.mean.extend(self.accum.iter().map(|&a| a * inv));
        self.accum.fill(0.0);
        self.count = 0;
        Some(&self.mean)
    }
}
