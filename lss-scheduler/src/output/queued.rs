//! Bounded asynchronous hand-off to a slower sink
//!
//! The frame pump must never wait on network I/O. `QueuedSink` copies each
//! frame into a recycled buffer and pushes it onto a bounded queue serviced by
//! one worker thread. A full queue drops the frame instead of blocking.
//!
//! `all_off` and `stop_output` travel through the same queue, so the worker
//! delivers the blackout frame before it stops the inner sink.

use super::OutputSink;
use crate::error::SinkError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest `stop_output` waits for the worker to drain the queue
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

struct QueuedFrame {
    channels: Vec<u8>,
    timestamp_ms: u64,
}

enum Job {
    Frame(QueuedFrame),
    /// Stop the inner sink once everything queued before it is sent
    Stop(Sender<()>),
}

/// Wraps a sink so `send_frame` returns immediately
pub struct QueuedSink {
    inner: Arc<dyn OutputSink>,
    tx: Option<SyncSender<Job>>,
    /// Buffers handed back by the worker for reuse
    recycled: Mutex<Receiver<Vec<u8>>>,
    thread: Option<JoinHandle<()>>,
    dropped: AtomicU64,
}

impl QueuedSink {
    /// Start the worker thread. `queue_depth` is clamped to at least 1.
    pub fn new(inner: Arc<dyn OutputSink>, queue_depth: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel(queue_depth.max(1));
        let (recycle_tx, recycle_rx) = mpsc::channel();

        let worker_sink = Arc::clone(&inner);
        let handle = thread::spawn(move || {
            Self::worker_loop(worker_sink, rx, recycle_tx);
        });

        info!("Output queue started (depth {})", queue_depth.max(1));

        Self {
            inner,
            tx: Some(tx),
            recycled: Mutex::new(recycle_rx),
            thread: Some(handle),
            dropped: AtomicU64::new(0),
        }
    }

    /// Frames discarded because the queue was full
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn worker_loop(
        sink: Arc<dyn OutputSink>,
        rx: Receiver<Job>,
        recycle: Sender<Vec<u8>>,
    ) {
        debug!("Output worker started");
        let mut failures: u64 = 0;

        for job in rx {
            let frame = match job {
                Job::Frame(frame) => frame,
                Job::Stop(ack) => {
                    sink.stop_output();
                    let _ = ack.send(());
                    continue;
                }
            };
            if let Err(e) = sink.send_frame(&frame.channels, frame.timestamp_ms) {
                failures += 1;
                if failures == 1 || failures % 100 == 0 {
                    warn!("Output send failed ({} so far): {}", failures, e);
                }
            }
            // Receiver gone means the sink is being dropped
            let _ = recycle.send(frame.channels);
        }

        debug!("Output worker exiting");
    }

    fn sender(&self) -> Result<&SyncSender<Job>, SinkError> {
        self.tx
            .as_ref()
            .ok_or_else(|| SinkError::Unavailable("output worker stopped".to_string()))
    }

    fn take_buffer(&self, len: usize) -> Vec<u8> {
        let mut buffer = self
            .recycled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .unwrap_or_default();
        buffer.clear();
        buffer.reserve(len);
        buffer
    }
}

impl OutputSink for QueuedSink {
    fn total_channels(&self) -> usize {
        self.inner.total_channels()
    }

    fn start_output(&self) -> Result<(), SinkError> {
        self.inner.start_output()
    }

    /// Waits (bounded) until frames queued earlier have been sent
    fn stop_output(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        let queued = self
            .sender()
            .map(|tx| tx.send(Job::Stop(ack_tx)).is_ok())
            .unwrap_or(false);

        if !queued || ack_rx.recv_timeout(STOP_TIMEOUT).is_err() {
            warn!("Output worker did not drain in time; stopping output directly");
            self.inner.stop_output();
        }
    }

    fn is_outputting(&self) -> bool {
        self.inner.is_outputting()
    }

    fn send_frame(&self, channels: &[u8], timestamp_ms: u64) -> Result<(), SinkError> {
        let tx = self.sender()?;

        let mut buffer = self.take_buffer(channels.len());
        buffer.extend_from_slice(channels);

        match tx.try_send(Job::Frame(QueuedFrame {
            channels: buffer,
            timestamp_ms,
        })) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                Err(SinkError::Unavailable(format!(
                    "output queue full ({} frames dropped)",
                    dropped
                )))
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(SinkError::Unavailable("output worker stopped".to_string()))
            }
        }
    }

    /// Blackout is never dropped: waits for queue space instead
    fn all_off(&self) -> Result<(), SinkError> {
        let frame = QueuedFrame {
            channels: vec![0u8; self.total_channels()],
            timestamp_ms: 0,
        };
        self.sender()?
            .send(Job::Frame(frame))
            .map_err(|_| SinkError::Unavailable("output worker stopped".to_string()))
    }
}

impl Drop for QueuedSink {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop
        self.tx.take();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("Output worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingSink;
    use std::sync::Condvar;
    use std::time::{Duration, Instant};

    /// Sink that blocks every send until released
    struct GatedSink {
        open: Mutex<bool>,
        cv: Condvar,
    }

    impl OutputSink for GatedSink {
        fn total_channels(&self) -> usize {
            1
        }
        fn start_output(&self) -> Result<(), SinkError> {
            Ok(())
        }
        fn stop_output(&self) {}
        fn is_outputting(&self) -> bool {
            true
        }
        fn send_frame(&self, _channels: &[u8], _timestamp_ms: u64) -> Result<(), SinkError> {
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.cv.wait(open).unwrap();
            }
            Ok(())
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_frames_reach_inner_sink() {
        let inner = Arc::new(RecordingSink::new(2));
        let sink = QueuedSink::new(inner.clone(), 4);

        sink.send_frame(&[1, 2], 10).unwrap();
        sink.send_frame(&[3, 4], 20).unwrap();

        wait_for(|| inner.frame_count() == 2);
        let frames = inner.frames();
        assert_eq!(frames[1].channels, vec![3, 4]);
        assert_eq!(frames[1].timestamp_ms, 20);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let gated = Arc::new(GatedSink {
            open: Mutex::new(false),
            cv: Condvar::new(),
        });
        let sink = QueuedSink::new(gated.clone(), 1);

        // One frame held by the worker, one in the queue, the rest dropped
        let started = Instant::now();
        let mut failures = 0;
        for ts in 0..10 {
            if sink.send_frame(&[1], ts).is_err() {
                failures += 1;
            }
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(failures >= 8);
        assert_eq!(sink.dropped_frames(), failures);

        *gated.open.lock().unwrap() = true;
        gated.cv.notify_all();
    }

    #[test]
    fn test_blackout_delivered_before_stop() {
        let inner = Arc::new(RecordingSink::new(3));
        let sink = QueuedSink::new(inner.clone(), 2);

        sink.send_frame(&[9, 9, 9], 10).unwrap();
        sink.all_off().unwrap();
        sink.stop_output();

        // stop_output returns only after the queue ahead of it drained
        assert!(!inner.is_outputting());
        let frames = inner.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].channels, vec![0, 0, 0]);
    }
}
