// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Multi-stream spectral estimation engine
//!
//! This library turns bursts of time-domain samples into per-stream FFT
//! spectra and power spectral densities. Each logical input stream gets its
//! own processing session (framing, transform, averaging) running on its own
//! worker; parameters can be reconfigured from a control thread while
//! processing is in flight. The transport that moves samples in and results
//! out is external: it delivers [`session::StreamEvent`]s through the
//! [`session::StreamRegistry`] and receives output through
//! [`session::SpectralSink`] implementations.

pub mod config;
pub mod framing;
pub mod metadata;
pub mod params;
pub mod session;
pub mod spectral;

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced across the session boundary.
///
/// Recoverable per-stream conditions (duplicate stream keys, missing RF
/// keywords, input discontinuities, starvation) are logged and handled with
/// defined fallbacks inside the session; they never appear here.
#[derive(Debug, Error)]
pub enum PsdError {
    /// A worker did not observe the stop request within the shutdown window.
    #[error("worker for stream `{stream_id}` did not stop within {timeout:?}")]
    StopTimeout {
        stream_id: String,
        timeout: Duration,
    },

    /// No session is registered under the given stream key.
    #[error("no session registered for stream `{0}`")]
    UnknownStream(String),
}

pub use config::PsdConfig;
pub use metadata::{SignalMetadata, SpectralMetadata};
pub use session::registry::{EngineSettings, StreamRegistry};
pub use session::transport::{
    ChannelSink, NullSink, OutputRecord, SampleBlock, SpectralSink, StreamEvent,
};
