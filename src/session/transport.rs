// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Interface types toward the transport collaborator
//!
//! The transport that moves samples in and results out lives outside this
//! crate. Inbound it delivers [`StreamEvent`]s; outbound it provides a
//! [`SpectralSink`] per output channel.

use chrono::{DateTime, Utc};
use log::debug;
use rustfft::num_complex::Complex32;
use tokio::sync::mpsc;

use crate::metadata::{SignalMetadata, SpectralMetadata};

/// A burst of samples with the time of its first sample.
///
/// Complex data is carried as interleaved re/im pairs, matching the stream's
/// current [`SignalMetadata`].
#[derive(Debug, Clone)]
pub struct SampleBlock {
    pub data: Vec<f32>,
    pub timestamp: DateTime<Utc>,
}

impl SampleBlock {
    pub fn real(data: Vec<f32>, timestamp: DateTime<Utc>) -> Self {
        Self { data, timestamp }
    }

    pub fn complex(samples: &[Complex32], timestamp: DateTime<Utc>) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            data.push(s.re);
            data.push(s.im);
        }
        Self { data, timestamp }
    }
}

/// One inbound notification for a stream session.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The stream's sampling description changed (or is first announced).
    Metadata(SignalMetadata),
    /// A burst of samples.
    Data(SampleBlock),
    /// The upstream queue was flushed; sample continuity is void.
    Flush,
    /// End of stream; the session finishes framed data and terminates.
    Eos,
}

/// Consumer of one output channel (spectrum or power) of a stream session.
///
/// `push_metadata` is called before the first frame and again after any
/// reconfiguration that changes the output axes. Frame data is real-valued
/// for the power output and interleaved re/im for the spectrum output, as
/// tagged by the metadata's `complex_output`.
pub trait SpectralSink: Send {
    fn push_metadata(&mut self, meta: &SpectralMetadata);
    fn push_frame(&mut self, data: &[f32], timestamp: DateTime<Utc>);
}

/// One record delivered through a [`ChannelSink`].
#[derive(Debug, Clone)]
pub enum OutputRecord {
    Metadata(SpectralMetadata),
    Frame {
        data: Vec<f32>,
        timestamp: DateTime<Utc>,
    },
}

/// Channel-backed sink: forwards every record to an unbounded receiver.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutputRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutputRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SpectralSink for ChannelSink {
    fn push_metadata(&mut self, meta: &SpectralMetadata) {
        if self.tx.send(OutputRecord::Metadata(meta.clone())).is_err() {
            debug!("output receiver dropped, discarding metadata");
        }
    }

    fn push_frame(&mut self, data: &[f32], timestamp: DateTime<Utc>) {
        let record = OutputRecord::Frame {
            data: data.to_vec(),
            timestamp,
        };
        if self.tx.send(record).is_err() {
            debug!("output receiver dropped, discarding frame");
        }
    }
}

/// Sink that discards everything, for outputs nobody listens to.
pub struct NullSink;

impl SpectralSink for NullSink {
    fn push_metadata(&mut self, _meta: &SpectralMetadata) {}
    fn push_frame(&mut self, _data: &[f32], _timestamp: DateTime<Utc>) {}
}
