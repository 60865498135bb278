// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use super::frame_buffer::FrameBuffer;
use chrono::{TimeZone, Utc};

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, start: f32) -> Vec<f32> {
        (0..len).map(|i| start + i as f32).collect()
    }

    #[test]
    fn full_frames_no_overlap() {
        // 2048 samples at frame length 1024, overlap 0 -> exactly 2 frames
        let mut buf = FrameBuffer::new(1024, 0);
        let frames: Vec<_> = buf.push(&ramp(2048, 0.0), Utc::now()).collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data.len(), 1024);
        assert_eq!(frames[1].data.len(), 1024);
        assert_eq!(frames[0].data[0], 0.0);
        assert_eq!(frames[1].data[0], 1024.0);
        assert_eq!(buf.buffered(), 0);
    }

    #[test]
    fn overlapping_frames_start_at_stride_boundaries() {
        // Complex scenario in element counts: 8 complex samples per frame
        // (16 elements), 4 complex samples overlap (8 elements), 16 complex
        // samples pushed (32 elements) -> frames at element offsets 0, 8, 16.
        let mut buf = FrameBuffer::new(16, 8);
        let frames: Vec<_> = buf.push(&ramp(32, 0.0), Utc::now()).collect();

        assert_eq!(frames.len(), 3);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.data.len(), 16);
            assert_eq!(frame.data[0], (i * 8) as f32);
        }
        // last 8 elements stay buffered as the overlap tail
        assert_eq!(buf.buffered(), 8);
    }

    #[test]
    fn consecutive_starts_differ_by_stride() {
        let mut buf = FrameBuffer::new(100, 37);
        let frames: Vec<_> = buf.push(&ramp(1000, 0.0), Utc::now()).collect();

        assert!(frames.len() > 2);
        for pair in frames.windows(2) {
            assert_eq!(pair[1].data[0] - pair[0].data[0], 63.0);
        }
    }

    #[test]
    fn short_burst_yields_no_frames() {
        let mut buf = FrameBuffer::new(1024, 0);
        let frames: Vec<_> = buf.push(&ramp(100, 0.0), Utc::now()).collect();
        assert!(frames.is_empty());
        assert_eq!(buf.buffered(), 100);
    }

    #[test]
    fn residual_carries_across_pushes() {
        let mut buf = FrameBuffer::new(1024, 0);
        assert_eq!(buf.push(&ramp(600, 0.0), Utc::now()).count(), 0);

        let frames: Vec<_> = buf.push(&ramp(600, 600.0), Utc::now()).collect();
        assert_eq!(frames.len(), 1);
        // the frame spans both bursts seamlessly
        assert_eq!(frames[0].data[599], 599.0);
        assert_eq!(frames[0].data[600], 600.0);
        assert_eq!(buf.buffered(), 176);
    }

    #[test]
    fn reframing_keeps_buffered_samples() {
        let mut buf = FrameBuffer::new(8, 0);
        let frames: Vec<_> = buf.push(&ramp(10, 0.0), Utc::now()).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(buf.buffered(), 2);

        buf.set_framing(4, 0);
        let frames: Vec<_> = buf.push(&ramp(2, 10.0), Utc::now()).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, vec![8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn flush_discards_residual() {
        let mut buf = FrameBuffer::new(8, 0);
        assert_eq!(buf.push(&ramp(6, 0.0), Utc::now()).count(), 0);
        buf.flush();
        assert_eq!(buf.buffered(), 0);

        let frames: Vec<_> = buf.push(&ramp(8, 100.0), Utc::now()).collect();
        assert_eq!(frames.len(), 1);
        // nothing from before the flush leaks into the frame
        assert_eq!(frames[0].data[0], 100.0);
    }

    #[test]
    fn frame_timestamps_advance_by_stride_times_period() {
        let mut buf = FrameBuffer::new(4, 0);
        buf.set_element_period(0.001);
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let frames: Vec<_> = buf.push(&ramp(12, 0.0), t0).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].timestamp, t0);
        assert_eq!((frames[1].timestamp - t0).num_milliseconds(), 4);
        assert_eq!((frames[2].timestamp - t0).num_milliseconds(), 8);
    }

    #[test]
    fn timestamp_resets_when_tail_empties() {
        let mut buf = FrameBuffer::new(4, 0);
        buf.set_element_period(0.001);
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(buf.push(&ramp(4, 0.0), t0).count(), 1);

        // a gap in the input: the next burst's own timestamp is used
        let t1 = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        let frames: Vec<_> = buf.push(&ramp(4, 0.0), t1).collect();
        assert_eq!(frames[0].timestamp, t1);
    }
}
