// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Real/complex transform kernels and per-frame processing

use std::sync::Arc;

use log::{debug, error};
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::{num_complex::Complex32, Fft, FftPlanner};

/// Sample representation of the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    Real,
    Complex,
}

impl SampleMode {
    /// Underlying `f32` elements per logical sample.
    pub fn elements_per_sample(&self) -> usize {
        match self {
            SampleMode::Real => 1,
            SampleMode::Complex => 2,
        }
    }
}

/// One frame's worth of transform results, borrowed from the session's
/// working buffers.
pub struct TransformOutput<'a> {
    /// Complex spectrum: `fft_size/2 + 1` bins in real mode (DC to Nyquist),
    /// `fft_size` bins in complex mode (centered, first bin at
    /// `-(fft_size/2 - 1)` frequency steps).
    pub spectrum: &'a [Complex32],
    /// Squared magnitude of each spectrum bin.
    pub power: &'a [f32],
}

struct RealKernel {
    fft: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    power: Vec<f32>,
}

struct ComplexKernel {
    fft: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex32>,
    power: Vec<f32>,
}

/// Exactly one of: no kernel yet, real kernel, complex kernel.
enum Kernel {
    Idle,
    Real(RealKernel),
    Complex(ComplexKernel),
}

/// Owns the choice of transform kernel and its working buffers.
///
/// The kernel variant follows the sample representation of the input stream;
/// a mode or size change swaps the kernel and all dependent buffers in one
/// step so their lengths can never disagree.
pub struct TransformSession {
    fft_size: usize,
    kernel: Kernel,
    real_planner: RealFftPlanner<f32>,
    complex_planner: FftPlanner<f32>,
}

impl TransformSession {
    pub fn new(fft_size: usize) -> Self {
        Self {
            fft_size,
            kernel: Kernel::Idle,
            real_planner: RealFftPlanner::new(),
            complex_planner: FftPlanner::new(),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Current kernel variant, `None` before the first frame.
    pub fn mode(&self) -> Option<SampleMode> {
        match self.kernel {
            Kernel::Idle => None,
            Kernel::Real(_) => Some(SampleMode::Real),
            Kernel::Complex(_) => Some(SampleMode::Complex),
        }
    }

    /// Change the transform size. The live kernel and every dependent buffer
    /// are rebuilt together; with no kernel yet, the size is simply recorded
    /// and used when the first frame arrives.
    pub fn set_fft_size(&mut self, fft_size: usize) {
        if fft_size == self.fft_size {
            return;
        }
        self.fft_size = fft_size;
        match self.mode() {
            None => {}
            Some(SampleMode::Real) => self.kernel = Kernel::Real(self.build_real()),
            Some(SampleMode::Complex) => self.kernel = Kernel::Complex(self.build_complex()),
        }
    }

    /// Make the kernel match the given sample representation, building it on
    /// first use. Returns `true` when a transition happened, in which case
    /// the caller must reset averaging and refit its framing, since state
    /// accumulated under the previous mode is invalid.
    pub fn ensure_mode(&mut self, mode: SampleMode) -> bool {
        if self.mode() == Some(mode) {
            return false;
        }
        debug!("building {:?} transform kernel, size {}", mode, self.fft_size);
        self.kernel = match mode {
            SampleMode::Real => Kernel::Real(self.build_real()),
            SampleMode::Complex => Kernel::Complex(self.build_complex()),
        };
        true
    }

    /// Drop the kernel entirely; the next frame rebuilds it from scratch.
    pub fn reset(&mut self) {
        self.kernel = Kernel::Idle;
    }

    /// Transform one frame. `frame` holds `fft_size` elements in real mode
    /// and `2 * fft_size` interleaved re/im elements in complex mode.
    pub fn process(&mut self, frame: &[f32]) -> TransformOutput<'_> {
        match &mut self.kernel {
            Kernel::Idle => {
                error!("transform invoked with no kernel; frame dropped");
                TransformOutput {
                    spectrum: &[],
                    power: &[],
                }
            }
            Kernel::Real(k) => {
                if frame.len() != k.input.len() {
                    error!(
                        "real frame length {} does not match transform size {}; frame dropped",
                        frame.len(),
                        k.input.len()
                    );
                    return TransformOutput {
                        spectrum: &[],
                        power: &[],
                    };
                }
                k.input.copy_from_slice(frame);
                if k.fft.process(&mut k.input, &mut k.spectrum).is_err() {
                    error!("real transform failed; emitting silence");
                    k.spectrum.fill(Complex32::new(0.0, 0.0));
                }
                for (p, c) in k.power.iter_mut().zip(&k.spectrum) {
                    *p = c.norm_sqr();
                }
                TransformOutput {
                    spectrum: &k.spectrum,
                    power: &k.power,
                }
            }
            Kernel::Complex(k) => {
                if frame.len() != 2 * k.spectrum.len() {
                    error!(
                        "complex frame length {} does not match transform size {}; frame dropped",
                        frame.len() / 2,
                        k.spectrum.len()
                    );
                    return TransformOutput {
                        spectrum: &[],
                        power: &[],
                    };
                }
                for (bin, pair) in k.spectrum.iter_mut().zip(frame.chunks_exact(2)) {
                    *bin = Complex32::new(pair[0], pair[1]);
                }
                k.fft.process(&mut k.spectrum);
                // reorder to the centered convention the output metadata
                // advertises: first bin at -(fft_size/2 - 1) frequency steps
                let n = k.spectrum.len();
                k.spectrum.rotate_left(n / 2 + 1);
                for (p, c) in k.power.iter_mut().zip(&k.spectrum) {
                    *p = c.norm_sqr();
                }
                TransformOutput {
                    spectrum: &k.spectrum,
                    power: &k.power,
                }
            }
        }
    }

    fn build_real(&mut self) -> RealKernel {
        let fft = self.real_planner.plan_fft_forward(self.fft_size);
        let input = fft.make_input_vec();
        let spectrum = fft.make_output_vec();
        let bins = spectrum.len();
        RealKernel {
            fft,
            input,
            spectrum,
            power: vec![0.0; bins],
        }
    }

    fn build_complex(&mut self) -> ComplexKernel {
        let fft = self.complex_planner.plan_fft_forward(self.fft_size);
        ComplexKernel {
            fft,
            spectrum: vec![Complex32::new(0.0, 0.0); self.fft_size],
            power: vec![0.0; self.fft_size],
        }
    }
}
