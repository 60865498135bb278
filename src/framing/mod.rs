// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-psd project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sample framing module
//!
//! This module accumulates irregular bursts of samples and slices them into
//! fixed-length, fixed-overlap analysis frames, keeping the unconsumed
//! remainder across calls.

mod frame_buffer;
#[cfg(test)]
mod frame_buffer_test;

pub use frame_buffer::{Frame, FrameBuffer, FrameDrain};
