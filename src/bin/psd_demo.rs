// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Feeds a synthetic tone through the spectral engine and reports the peak

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use rustfft::num_complex::Complex32;
use serde::Serialize;

use rust_psd::metadata::SignalMetadata;
use rust_psd::session::transport::{ChannelSink, OutputRecord, SampleBlock, StreamEvent};
use rust_psd::{PsdConfig, StreamRegistry};

/// Spectral engine demo: estimate the PSD of a synthetic tone
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (YAML), created with defaults if missing
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transform size in samples
    #[arg(long)]
    fft_size: Option<usize>,

    /// Overlap between consecutive frames in samples
    #[arg(long)]
    overlap: Option<usize>,

    /// Number of power spectra to average
    #[arg(long)]
    averages: Option<usize>,

    /// Log compression coefficient (<= 0 disables)
    #[arg(long)]
    log_coefficient: Option<f32>,

    /// Tone frequency in Hz
    #[arg(long, default_value_t = 2000.0)]
    frequency: f64,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 48000.0)]
    sample_rate: f64,

    /// Signal duration in seconds
    #[arg(long, default_value_t = 0.5)]
    seconds: f64,

    /// Noise amplitude added to the tone (0.0 to 1.0)
    #[arg(long, default_value_t = 0.0)]
    noise: f32,

    /// Generate complex (IQ) samples instead of real ones
    #[arg(long)]
    complex: bool,

    /// Tag the stream with this RF centre frequency and report RF units
    #[arg(long)]
    rf_center: Option<f64>,

    /// Output file for results (JSON)
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Summary of one demo run
#[derive(Debug, Serialize)]
struct DemoResult {
    peak_frequency_hz: f64,
    peak_power: f32,
    power_frames: usize,
    spectrum_frames: usize,
    timestamp: DateTime<Utc>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PsdConfig::from_file(path)?,
        None => PsdConfig::default(),
    };
    config.apply_args(
        args.fft_size,
        args.overlap,
        args.averages,
        args.log_coefficient,
        args.rf_center.map(|_| true),
    );

    println!("Spectral Engine Demo");
    println!("--------------------");
    println!(
        "- Transform: {} points, overlap {}, {} average(s)",
        config.fft_size, config.overlap, config.num_average
    );
    println!(
        "- Signal: {} Hz {} tone at {} samples/s for {} s",
        args.frequency,
        if args.complex { "complex" } else { "real" },
        args.sample_rate,
        args.seconds
    );

    let registry = StreamRegistry::new(config.engine_settings());
    let (spectrum_sink, mut spectrum_rx) = ChannelSink::new();
    let (power_sink, mut power_rx) = ChannelSink::new();
    registry.observe_stream("demo", Box::new(spectrum_sink), Box::new(power_sink));

    let mut meta = SignalMetadata::new(1.0 / args.sample_rate, args.complex);
    if let Some(rf) = args.rf_center {
        meta = meta.with_keyword("CHAN_RF", rf);
    }
    registry.deliver("demo", StreamEvent::Metadata(meta));

    // feed the tone in a handful of bursts, as a transport would
    let total = (args.sample_rate * args.seconds) as usize;
    let burst_len = (total / 4).max(1);
    let start = Utc::now();
    for (index, burst) in synthesize(&args, total, burst_len).into_iter().enumerate() {
        let offset = (index * burst_len) as f64 / args.sample_rate;
        let timestamp = start + chrono::Duration::nanoseconds((offset * 1e9) as i64);
        registry.deliver("demo", StreamEvent::Data(SampleBlock { data: burst, timestamp }));
    }
    registry.deliver("demo", StreamEvent::Eos);

    // wait for the worker to drain and retire
    while registry.reap_finished().is_empty() && !registry.is_empty() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let mut power_meta = None;
    let mut power_frames = Vec::new();
    while let Ok(record) = power_rx.try_recv() {
        match record {
            OutputRecord::Metadata(m) => power_meta = Some(m),
            OutputRecord::Frame { data, .. } => power_frames.push(data),
        }
    }
    let mut spectrum_frames = 0usize;
    while let Ok(record) = spectrum_rx.try_recv() {
        if matches!(record, OutputRecord::Frame { .. }) {
            spectrum_frames += 1;
        }
    }

    let meta = power_meta.ok_or_else(|| anyhow::anyhow!("no output metadata received"))?;
    let last = power_frames
        .last()
        .ok_or_else(|| anyhow::anyhow!("no power frames received"))?;
    let (peak_bin, peak_power) = last
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| anyhow::anyhow!("empty power frame"))?;
    let peak_frequency = meta.start_freq + peak_bin as f64 * meta.freq_step;

    let result = DemoResult {
        peak_frequency_hz: peak_frequency,
        peak_power,
        power_frames: power_frames.len(),
        spectrum_frames,
        timestamp: Utc::now(),
    };

    println!("Results:");
    println!("- Power frames: {}", result.power_frames);
    println!("- Spectrum frames: {}", result.spectrum_frames);
    println!("- Frequency resolution: {:.3} Hz", meta.freq_step);
    println!(
        "- Peak: {:.1} Hz (power {:.6})",
        result.peak_frequency_hz, result.peak_power
    );

    if let Some(output_path) = args.output {
        println!("Saving results to: {}", output_path.display());
        std::fs::write(output_path, serde_json::to_string_pretty(&result)?)?;
    }

    Ok(())
}

/// Generate the bursts of a tone, real or complex per the arguments.
fn synthesize(args: &Args, total: usize, burst_len: usize) -> Vec<Vec<f32>> {
    let mut bursts = Vec::new();
    let mut current = Vec::new();
    for i in 0..total {
        let t = i as f64 / args.sample_rate;
        let phase = (2.0 * std::f64::consts::PI * args.frequency * t) as f32;
        if args.complex {
            let s = Complex32::new(phase.cos(), phase.sin());
            current.push(s.re + noise(args.noise));
            current.push(s.im + noise(args.noise));
        } else {
            current.push(phase.sin() + noise(args.noise));
        }
        if (i + 1) % burst_len == 0 {
            bursts.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        bursts.push(current);
    }
    bursts
}

fn noise(amplitude: f32) -> f32 {
    if amplitude > 0.0 {
        (rand::random::<f32>() - 0.5) * 2.0 * amplitude
    } else {
        0.0
    }
}
