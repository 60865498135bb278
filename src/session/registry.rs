// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Stream key to session mapping and engine-wide control

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, error, warn};

use crate::params::SharedParams;
use crate::PsdError;

use super::processor::StreamProcessor;
use super::transport::{SpectralSink, StreamEvent};

/// Engine-wide settings: the parameter values new streams start from and the
/// worker scheduling bounds.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub fft_size: usize,
    pub overlap: usize,
    pub num_average: usize,
    pub log_coefficient: f32,
    pub rf_units: bool,
    pub do_spectrum: bool,
    pub do_power: bool,
    /// Longest a worker waits for input before rechecking its stop flag.
    pub poll_interval: Duration,
    /// Longest a stop request waits for a worker before giving up.
    pub shutdown_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            overlap: 0,
            num_average: 1,
            log_coefficient: 0.0,
            rf_units: false,
            do_spectrum: true,
            do_power: true,
            poll_interval: Duration::from_millis(100),
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

/// Maps stream keys to their processing sessions.
///
/// Concurrent streams are fully independent; the map itself is the one
/// mutually exclusive resource. Reconfiguration broadcasts iterate the map
/// under its lock and update each session's shared parameters, which the
/// workers pick up at their next cycle.
pub struct StreamRegistry {
    settings: Mutex<EngineSettings>,
    sessions: Mutex<HashMap<String, StreamProcessor>>,
}

impl StreamRegistry {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, StreamProcessor>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn settings(&self) -> MutexGuard<'_, EngineSettings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A new stream was observed: create its session and worker. A key that
    /// already exists is a non-fatal anomaly; the existing session stays.
    pub fn observe_stream(
        &self,
        stream_id: &str,
        spectrum_out: Box<dyn SpectralSink>,
        power_out: Box<dyn SpectralSink>,
    ) {
        let mut sessions = self.sessions();
        if sessions.contains_key(stream_id) {
            warn!(
                "new stream with stream ID {}, but already have an entry for that stream ID",
                stream_id
            );
            return;
        }
        let s = self.settings().clone();
        let params = SharedParams::new(
            s.fft_size,
            s.overlap,
            s.num_average,
            s.log_coefficient,
            s.do_spectrum,
            s.do_power,
            s.rf_units,
        );
        debug!("adding stream processor: {}", stream_id);
        sessions.insert(
            stream_id.to_string(),
            StreamProcessor::spawn(
                stream_id.to_string(),
                params,
                spectrum_out,
                power_out,
                s.poll_interval,
            ),
        );
    }

    /// Route one transport event to its session. Events for unknown keys are
    /// dropped with a warning.
    pub fn deliver(&self, stream_id: &str, event: StreamEvent) {
        match self.sessions().get(stream_id) {
            Some(processor) => processor.deliver(event),
            None => warn!("event for unknown stream {}, dropped", stream_id),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    pub fn contains(&self, stream_id: &str) -> bool {
        self.sessions().contains_key(stream_id)
    }

    /// Drop sessions whose worker has already ended (end of stream).
    /// Returns the removed stream keys.
    pub fn reap_finished(&self) -> Vec<String> {
        let mut sessions = self.sessions();
        let done: Vec<String> = sessions
            .iter()
            .filter(|(_, p)| p.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &done {
            debug!("removing stream processor (eos): {}", id);
            sessions.remove(id);
        }
        done
    }

    /// Tear down one stream's session, waiting for its worker within the
    /// configured shutdown window.
    pub async fn remove_stream(&self, stream_id: &str) -> Result<(), PsdError> {
        let processor = self
            .sessions()
            .remove(stream_id)
            .ok_or_else(|| PsdError::UnknownStream(stream_id.to_string()))?;
        let timeout = self.settings().shutdown_timeout;
        processor.stop(timeout).await
    }

    /// Stop every worker. All stop flags are raised first so the workers
    /// wind down concurrently; the first failure is returned after all have
    /// been joined.
    pub async fn shutdown(&self) -> Result<(), PsdError> {
        let processors: Vec<StreamProcessor> = {
            let mut sessions = self.sessions();
            sessions.drain().map(|(_, p)| p).collect()
        };
        let timeout = self.settings().shutdown_timeout;
        for p in &processors {
            p.request_stop();
        }
        let mut result = Ok(());
        for p in processors {
            if let Err(e) = p.stop(timeout).await {
                error!("{}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    // Reconfiguration broadcasts: update the defaults for future streams and
    // every live session.

    pub fn set_fft_size(&self, fft_size: usize) {
        self.settings().fft_size = fft_size;
        for p in self.sessions().values() {
            p.params().set_fft_size(fft_size);
        }
    }

    pub fn set_overlap(&self, overlap: usize) {
        self.settings().overlap = overlap;
        for p in self.sessions().values() {
            p.params().set_overlap(overlap);
        }
    }

    pub fn set_num_average(&self, num_average: usize) {
        self.settings().num_average = num_average;
        for p in self.sessions().values() {
            p.params().set_num_average(num_average);
        }
    }

    pub fn set_log_coefficient(&self, log_coeff: f32) {
        self.settings().log_coefficient = log_coeff;
        for p in self.sessions().values() {
            p.params().set_log_coefficient(log_coeff);
        }
    }

    pub fn set_rf_units(&self, enable: bool) {
        self.settings().rf_units = enable;
        for p in self.sessions().values() {
            p.params().set_rf_units(enable);
        }
    }

    pub fn set_output_selection(&self, do_power: bool, do_spectrum: bool) {
        {
            let mut s = self.settings();
            s.do_power = do_power;
            s.do_spectrum = do_spectrum;
        }
        for p in self.sessions().values() {
            p.params().set_output_selection(do_power, do_spectrum);
        }
    }

    pub fn force_metadata_refresh(&self) {
        for p in self.sessions().values() {
            p.params().force_metadata_refresh();
        }
    }
}
