//! Event types for the LSS event system
//!
//! Provides the scheduler event definitions and the EventBus used to fan them
//! out to observers (SSE clients, loggers, tests).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Why a playlist became authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartTrigger {
    /// Operator "play now" request (immediate override)
    Immediate,
    /// Time-window schedule opened
    Schedule,
}

/// Why a playlist stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Ran out of steps (or a pending stop reached its boundary)
    Completed,
    /// Hard stop command
    Stopped,
    /// Replaced by a newer immediate override
    Replaced,
    /// Advancing or rendering raised a fault
    Fault,
    /// Removed from the schedule
    Removed,
}

/// Scheduler event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SchedulerEvent {
    /// A playlist (or immediate override) started running
    PlaylistStarted {
        playlist: String,
        session_id: Uuid,
        trigger: StartTrigger,
        timestamp: DateTime<Utc>,
    },

    /// A playlist (or immediate override) stopped running
    PlaylistStopped {
        playlist: String,
        session_id: Uuid,
        reason: StopReason,
        timestamp: DateTime<Utc>,
    },

    /// The authoritative playlist moved to another step
    StepChanged {
        playlist: String,
        step: String,
        timestamp: DateTime<Utc>,
    },

    /// Output to lights was started or stopped
    OutputToggled {
        enabled: bool,
        timestamp: DateTime<Utc>,
    },

    /// Master volume changed (0-100)
    VolumeChanged {
        volume: u8,
        timestamp: DateTime<Utc>,
    },

    /// Schedule written to disk
    ScheduleSaved {
        path: String,
        timestamp: DateTime<Utc>,
    },
}

impl SchedulerEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SchedulerEvent::PlaylistStarted { .. } => "PlaylistStarted",
            SchedulerEvent::PlaylistStopped { .. } => "PlaylistStopped",
            SchedulerEvent::StepChanged { .. } => "StepChanged",
            SchedulerEvent::OutputToggled { .. } => "OutputToggled",
            SchedulerEvent::VolumeChanged { .. } => "VolumeChanged",
            SchedulerEvent::ScheduleSaved { .. } => "ScheduleSaved",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast`. Emitting never blocks, which
/// keeps it safe to call from the frame pump.
pub struct EventBus {
    tx: broadcast::Sender<SchedulerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow receivers lag
    ///
    /// # Examples
    ///
    /// ```
    /// use lss_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SchedulerEvent,
    ) -> Result<usize, broadcast::error::SendError<SchedulerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SchedulerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(name: &str) -> SchedulerEvent {
        SchedulerEvent::PlaylistStarted {
            playlist: name.to_string(),
            session_id: Uuid::new_v4(),
            trigger: StartTrigger::Immediate,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_subscribe_counts() {
        let bus = EventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        let _rx = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_emit_without_subscribers_is_error() {
        let bus = EventBus::new(16);
        assert!(bus.emit(started("Holiday")).is_err());
        // Lossy variant swallows the same condition
        bus.emit_lossy(started("Holiday"));
    }

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        assert_eq!(bus.emit(started("Holiday")).unwrap(), 1);

        match rx.recv().await.unwrap() {
            SchedulerEvent::PlaylistStarted { playlist, trigger, .. } => {
                assert_eq!(playlist, "Holiday");
                assert_eq!(trigger, StartTrigger::Immediate);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = SchedulerEvent::PlaylistStopped {
            playlist: "Holiday".to_string(),
            session_id: Uuid::nil(),
            reason: StopReason::Completed,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PlaylistStopped");
        assert_eq!(json["reason"], "completed");
        assert_eq!(event.event_type(), "PlaylistStopped");
    }
}
