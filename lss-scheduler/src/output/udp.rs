//! Raw UDP fan-out to lighting controllers
//!
//! Each controller owns a contiguous slice of the channel buffer and receives
//! that slice as a single datagram per frame. Protocol framing is not added.

use super::OutputSink;
use crate::config::ControllerConfig;
use crate::error::SinkError;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::ops::Range;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

struct Target {
    addr: SocketAddr,
    channels: Range<usize>,
}

/// Sends channel slices to each configured controller
pub struct UdpSink {
    total_channels: usize,
    controllers: Vec<ControllerConfig>,
    /// Bound socket and resolved targets; `None` while not outputting
    active: Mutex<Option<(UdpSocket, Vec<Target>)>>,
}

impl UdpSink {
    pub fn new(total_channels: usize, controllers: Vec<ControllerConfig>) -> Self {
        Self {
            total_channels,
            controllers,
            active: Mutex::new(None),
        }
    }

    fn resolve_targets(&self) -> Result<Vec<Target>, SinkError> {
        let mut targets = Vec::with_capacity(self.controllers.len());
        for controller in &self.controllers {
            let addr = controller
                .address
                .to_socket_addrs()?
                .next()
                .ok_or_else(|| {
                    SinkError::Unavailable(format!("cannot resolve {}", controller.address))
                })?;

            let start = controller.start_channel.min(self.total_channels);
            let end = start.saturating_add(controller.channels).min(self.total_channels);
            if end - start < controller.channels {
                warn!(
                    "Controller {} truncated to channels {}..{}",
                    controller.address, start, end
                );
            }
            targets.push(Target {
                addr,
                channels: start..end,
            });
        }
        Ok(targets)
    }
}

impl OutputSink for UdpSink {
    fn total_channels(&self) -> usize {
        self.total_channels
    }

    fn start_output(&self) -> Result<(), SinkError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Ok(());
        }

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        let targets = self.resolve_targets()?;
        info!("UDP output started: {} controller(s)", targets.len());
        *active = Some((socket, targets));
        Ok(())
    }

    fn stop_output(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.take().is_some() {
            info!("UDP output stopped");
        }
    }

    fn is_outputting(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn send_frame(&self, channels: &[u8], _timestamp_ms: u64) -> Result<(), SinkError> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let Some((socket, targets)) = active.as_ref() else {
            return Ok(());
        };

        for target in targets {
            let end = target.channels.end.min(channels.len());
            let start = target.channels.start.min(end);
            if start == end {
                continue;
            }
            socket.send_to(&channels[start..end], target.addr)?;
        }
        Ok(())
    }
}
