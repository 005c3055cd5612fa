//! Channel output sinks
//!
//! The scheduler only needs an abstract "send these N channel bytes" capability
//! and a total channel count. Protocol framing lives behind this trait.
//!
//! - [`UdpSink`]: raw per-controller datagrams
//! - [`QueuedSink`]: bounded hand-off to a worker thread so a slow sink cannot
//!   stall the frame pump
//! - [`NullSink`]: no network configured
//! - [`RecordingSink`]: captures frames for tests and benchmarks

pub mod queued;
pub mod udp;

pub use queued::QueuedSink;
pub use udp::UdpSink;

use crate::error::SinkError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Destination for one frame of channel data per tick
pub trait OutputSink: Send + Sync {
    /// Total channel count; fixes the scheduler's frame buffer size
    fn total_channels(&self) -> usize;

    fn start_output(&self) -> Result<(), SinkError>;

    fn stop_output(&self);

    fn is_outputting(&self) -> bool;

    /// Transmit `channels` stamped with milliseconds since scheduler start.
    /// Frames sent while not outputting are discarded.
    fn send_frame(&self, channels: &[u8], timestamp_ms: u64) -> Result<(), SinkError>;

    /// Drive every channel to zero
    fn all_off(&self) -> Result<(), SinkError> {
        let zeros = vec![0u8; self.total_channels()];
        self.send_frame(&zeros, 0)
    }
}

/// Fixed-size frame buffer, sized once from the sink's channel count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBuffer {
    data: Box<[u8]>,
}

impl ChannelBuffer {
    pub fn new(channels: usize) -> Self {
        Self {
            data: vec![0u8; channels].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All channels to zero
    pub fn zero(&mut self) {
        self.data.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Sink that accepts and discards everything
pub struct NullSink {
    total_channels: usize,
    outputting: AtomicBool,
}

impl NullSink {
    pub fn new(total_channels: usize) -> Self {
        Self {
            total_channels,
            outputting: AtomicBool::new(false),
        }
    }
}

impl OutputSink for NullSink {
    fn total_channels(&self) -> usize {
        self.total_channels
    }

    fn start_output(&self) -> Result<(), SinkError> {
        self.outputting.store(true, Ordering::Release);
        Ok(())
    }

    fn stop_output(&self) {
        self.outputting.store(false, Ordering::Release);
    }

    fn is_outputting(&self) -> bool {
        self.outputting.load(Ordering::Acquire)
    }

    fn send_frame(&self, _channels: &[u8], _timestamp_ms: u64) -> Result<(), SinkError> {
        Ok(())
    }
}

/// One captured frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFrame {
    pub channels: Vec<u8>,
    pub timestamp_ms: u64,
}

/// Sink that keeps every frame it is given
pub struct RecordingSink {
    total_channels: usize,
    outputting: AtomicBool,
    unavailable: AtomicBool,
    frames: Mutex<Vec<RecordedFrame>>,
}

impl RecordingSink {
    pub fn new(total_channels: usize) -> Self {
        Self {
            total_channels,
            outputting: AtomicBool::new(true),
            unavailable: AtomicBool::new(false),
            frames: Mutex::new(Vec::new()),
        }
    }

    /// Make every subsequent `send_frame` fail with `SinkError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    pub fn frames(&self) -> Vec<RecordedFrame> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn last_frame(&self) -> Option<RecordedFrame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl OutputSink for RecordingSink {
    fn total_channels(&self) -> usize {
        self.total_channels
    }

    fn start_output(&self) -> Result<(), SinkError> {
        self.outputting.store(true, Ordering::Release);
        Ok(())
    }

    fn stop_output(&self) {
        self.outputting.store(false, Ordering::Release);
    }

    fn is_outputting(&self) -> bool {
        self.outputting.load(Ordering::Acquire)
    }

    fn send_frame(&self, channels: &[u8], timestamp_ms: u64) -> Result<(), SinkError> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(SinkError::Unavailable("recording sink disabled".to_string()));
        }
        if !self.is_outputting() {
            return Ok(());
        }
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedFrame {
                channels: channels.to_vec(),
                timestamp_ms,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_discards_when_stopped() {
        let sink = RecordingSink::new(3);
        sink.send_frame(&[1, 2, 3], 10).unwrap();
        sink.stop_output();
        sink.send_frame(&[4, 5, 6], 20).unwrap();

        assert_eq!(sink.frame_count(), 1);
        assert_eq!(sink.last_frame().unwrap().channels, vec![1, 2, 3]);
    }

    #[test]
    fn test_default_all_off_sends_zero_frame() {
        let sink = RecordingSink::new(4);
        sink.all_off().unwrap();
        assert_eq!(sink.last_frame().unwrap().channels, vec![0; 4]);
    }

    #[test]
    fn test_channel_buffer_zero() {
        let mut buffer = ChannelBuffer::new(3);
        buffer.as_mut_slice().fill(9);
        buffer.zero();
        assert_eq!(buffer.as_slice(), &[0, 0, 0]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_null_sink_toggles() {
        let sink = NullSink::new(16);
        assert!(!sink.is_outputting());
        sink.start_output().unwrap();
        assert!(sink.is_outputting());
        assert_eq!(sink.total_channels(), 16);
    }
}
