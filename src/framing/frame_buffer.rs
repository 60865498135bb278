// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Residual buffering and overlapped frame extraction

use chrono::{DateTime, Duration, Utc};

/// A fixed-length analysis frame sliced out of the residual buffer.
///
/// `data` holds underlying storage elements: one `f32` per sample in real
/// mode, two (interleaved re/im) per sample in complex mode. The caller
/// configures the element counts accordingly.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<f32>,
    /// Time of the first element of this frame.
    pub timestamp: DateTime<Utc>,
}

/// Accumulates sample bursts and emits overlapping fixed-length frames.
///
/// Samples are appended to an internal residual; frames of `frame_len`
/// elements are drained at `stride = frame_len - overlap` boundaries. The
/// last partial remainder is retained for the next push and never emitted.
pub struct FrameBuffer {
    frame_len: usize,
    overlap: usize,
    /// Seconds per underlying element, used to advance frame timestamps.
    elem_period: f64,
    tail: Vec<f32>,
    tail_time: Option<DateTime<Utc>>,
}

impl FrameBuffer {
    pub fn new(frame_len: usize, overlap: usize) -> Self {
        Self {
            frame_len,
            overlap,
            elem_period: 0.0,
            tail: Vec::new(),
            tail_time: None,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Elements the next frame start advances by.
    pub fn stride(&self) -> usize {
        self.frame_len.saturating_sub(self.overlap).max(1)
    }

    /// Elements currently buffered and not yet consumed.
    pub fn buffered(&self) -> usize {
        self.tail.len()
    }

    /// Change future framing. Already-buffered samples are kept; only the
    /// slicing of frames not yet emitted is affected.
    pub fn set_framing(&mut self, frame_len: usize, overlap: usize) {
        self.frame_len = frame_len;
        self.overlap = overlap;
    }

    /// Seconds per underlying element (half the sample period in complex
    /// mode, where each sample spans two elements).
    pub fn set_element_period(&mut self, seconds: f64) {
        self.elem_period = seconds;
    }

    /// Discard all buffered residual. Used on upstream discontinuity, when
    /// continuity of the sample history can no longer be assumed.
    pub fn flush(&mut self) {
        self.tail.clear();
        self.tail_time = None;
    }

    /// Append a burst and drain all complete frames.
    ///
    /// `timestamp` is the time of the first element of `samples`. A burst
    /// shorter than one stride yields no frames; that is not an error.
    pub fn push(&mut self, samples: &[f32], timestamp: DateTime<Utc>) -> FrameDrain<'_> {
        if self.tail.is_empty() {
            self.tail_time = Some(timestamp);
        }
        self.tail.extend_from_slice(samples);
        FrameDrain { buf: self }
    }
}

/// Draining iterator over the complete frames currently buffered.
pub struct FrameDrain<'a> {
    buf: &'a mut FrameBuffer,
}

impl Iterator for FrameDrain<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let frame_len = self.buf.frame_len;
        if frame_len == 0 || self.buf.tail.len() < frame_len {
            return None;
        }
        let timestamp = self.buf.tail_time.unwrap_or_else(Utc::now);
        let data = self.buf.tail[..frame_len].to_vec();

        let stride = self.buf.stride();
        self.buf.tail.drain(..stride);
        let advance = stride as f64 * self.buf.elem_period;
        self.buf.tail_time =
            Some(timestamp + Duration::nanoseconds((advance * 1e9).round() as i64));

        Some(Frame { data, timestamp })
    }
}
