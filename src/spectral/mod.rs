// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Spectral analysis module
//!
//! This module owns the per-stream transform state (real or complex kernel
//! plus working buffers) and the grouped averaging of power spectra.

mod averager;
mod transform;

#[cfg(test)]
mod transform_test;

pub use averager::Averager;
pub use transform::{SampleMode, TransformOutput, TransformSession};
