// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Per-stream processing sessions
//!
//! A [`StreamSession`] owns the complete processing state of one input
//! stream: framing, transform kernel, averaging, and a locally cached
//! parameter snapshot. It is driven one event at a time and is fully
//! synchronous; [`processor`] wraps it in a worker task and
//! [`registry`] maps stream keys to workers.

pub mod processor;
pub mod registry;
pub mod transport;


use chrono::{DateTime, Utc};
use log::{debug, trace, warn};

use crate::framing::{Frame, FrameBuffer};
use crate::metadata::derive_output_metadata;
use crate::metadata::SignalMetadata;
use crate::params::{ParamSnapshot, SharedParams};
use crate::spectral::{Averager, SampleMode, TransformSession};

pub use processor::StreamProcessor;
pub use registry::{EngineSettings, StreamRegistry};
pub use transport::{
    ChannelSink, NullSink, OutputRecord, SampleBlock, SpectralSink, StreamEvent,
};

/// Complete processing state of one stream.
///
/// Handles real/complex transitions, parameter hot reload, overlap
/// buffering, averaging and log compression; you give it time-domain events
/// and it pushes frequency-domain frames into the two sinks.
pub struct StreamSession {
    stream_id: String,
    params: SharedParams,
    cache: ParamSnapshot,
    frames: FrameBuffer,
    transform: TransformSession,
    averager: Averager,
    input_meta: Option<SignalMetadata>,
    input_meta_changed: bool,
    /// Timestamp of the first frame of the averaging group in progress.
    group_start: Option<DateTime<Utc>>,
    scratch: Vec<f32>,
    spectrum_out: Box<dyn SpectralSink>,
    power_out: Box<dyn SpectralSink>,
    finished: bool,
}

impl StreamSession {
    pub fn new(
        stream_id: String,
        params: SharedParams,
        spectrum_out: Box<dyn SpectralSink>,
        power_out: Box<dyn SpectralSink>,
    ) -> Self {
        let initial = params.read();
        Self {
            stream_id,
            frames: FrameBuffer::new(initial.fft_size, initial.overlap),
            transform: TransformSession::new(initial.fft_size),
            averager: Averager::new(initial.num_average),
            cache: initial,
            params,
            input_meta: None,
            input_meta_changed: false,
            group_start: None,
            scratch: Vec::new(),
            spectrum_out,
            power_out,
            finished: false,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// The stream signalled end-of-stream.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Start a processing cycle: capture the parameter snapshot and bring
    /// the data structures up to date before any data is touched.
    pub fn begin_cycle(&mut self) {
        self.params.snapshot(&mut self.cache);

        if self.cache.fft_size_changed {
            self.cache.fft_size_changed = false;
            trace!(
                "stream {}: rebuilding for transform size {}",
                self.stream_id,
                self.cache.fft_size
            );
            // kernel, working buffers and framing change together
            self.transform.set_fft_size(self.cache.fft_size);
            let mult = self
                .transform
                .mode()
                .map(|m| m.elements_per_sample())
                .unwrap_or(1);
            self.frames
                .set_framing(self.cache.fft_size * mult, self.cache.overlap * mult);
            self.averager.clear();
            self.group_start = None;
        }

        if self.cache.num_average_changed {
            self.cache.num_average_changed = false;
            trace!(
                "stream {}: averaging depth now {}",
                self.stream_id,
                self.cache.num_average
            );
            self.averager.set_depth(self.cache.num_average);
            self.group_start = None;
        }
    }

    /// Handle one inbound event. Returns `false` once the stream is done.
    pub fn handle_event(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Metadata(meta) => {
                debug!(
                    "stream {}: input metadata update (period {} s, {})",
                    self.stream_id,
                    meta.sample_period,
                    if meta.complex { "complex" } else { "real" }
                );
                self.input_meta = Some(meta);
                self.input_meta_changed = true;
                true
            }
            StreamEvent::Data(block) => {
                self.process_block(block);
                true
            }
            StreamEvent::Flush => {
                warn!(
                    "stream {}: input queue flushed, discarding buffered state",
                    self.stream_id
                );
                self.discard_state();
                true
            }
            StreamEvent::Eos => {
                debug!("stream {}: end of stream", self.stream_id);
                self.finished = true;
                false
            }
        }
    }

    /// Drop everything derived from past samples; continuity is void.
    fn discard_state(&mut self) {
        self.frames.flush();
        self.transform.reset();
        self.averager.clear();
        self.group_start = None;
    }

    fn process_block(&mut self, block: SampleBlock) {
        let (sample_period, is_complex) = match &self.input_meta {
            Some(m) => (m.sample_period, m.complex),
            None => {
                warn!(
                    "stream {}: data before any metadata, dropping {} elements",
                    self.stream_id,
                    block.data.len()
                );
                return;
            }
        };

        let mode = if is_complex {
            SampleMode::Complex
        } else {
            SampleMode::Real
        };
        let mult = mode.elements_per_sample();
        if self.transform.ensure_mode(mode) {
            // mode switch: old-mode residual and averages are meaningless
            self.frames.flush();
            self.frames
                .set_framing(self.cache.fft_size * mult, self.cache.overlap * mult);
            self.averager.clear();
            self.group_start = None;
        }
        self.frames
            .set_element_period(sample_period / mult as f64);

        if self.cache.refresh_metadata || self.input_meta_changed {
            self.cache.refresh_metadata = false;
            self.input_meta_changed = false;
            if let Some(meta) = &self.input_meta {
                let (spectrum_meta, power_meta) = derive_output_metadata(meta, &self.cache);
                self.spectrum_out.push_metadata(&spectrum_meta);
                self.power_out.push_metadata(&power_meta);
            }
        }

        trace!(
            "stream {}: got block of {} elements",
            self.stream_id,
            block.data.len()
        );
        let frames: Vec<Frame> = self.frames.push(&block.data, block.timestamp).collect();
        for frame in frames {
            self.process_frame(frame);
        }
    }

    fn process_frame(&mut self, frame: Frame) {
        let out = self.transform.process(&frame.data);

        if self.cache.do_power {
            let depth = self.averager.depth();
            if depth > 1 && !self.averager.in_progress() {
                self.group_start = Some(frame.timestamp);
            }
            if let Some(mean) = self.averager.accumulate(out.power) {
                let timestamp = if depth > 1 {
                    self.group_start.take().unwrap_or(frame.timestamp)
                } else {
                    frame.timestamp
                };
                let coeff = self.cache.log_coeff;
                self.scratch.clear();
                if coeff > 0.0 {
                    self.scratch
                        .extend(mean.iter().map(|&p| coeff * p.max(f32::MIN_POSITIVE).log10()));
                } else {
                    self.scratch.extend_from_slice(mean);
                }
                self.power_out.push_frame(&self.scratch, timestamp);
            }
        }

        if self.cache.do_spectrum {
            self.scratch.clear();
            self.scratch.reserve(out.spectrum.len() * 2);
            for c in out.spectrum {
                self.scratch.push(c.re);
                self.scratch.push(c.im);
            }
            self.spectrum_out.push_frame(&self.scratch, frame.timestamp);
        }
    }
}
