//! Session events
//!
//! Listeners subscribe to a session and receive events over a crossbeam
//! channel. Events are emitted at key points:
//! - State transitions
//! - Load completion (duration known)
//! - Progress ticks while playing
//! - Seeks and volume changes
//! - Natural end of track and failures

use crate::types::SessionState;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Events emitted by a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The state machine moved
    StateChanged {
        /// The new state
        state: SessionState,
    },

    /// Decoding finished
    Loaded {
        /// Track length in seconds
        duration: f64,
    },

    /// Live elapsed time, once per frame while playing
    Progress {
        /// Seconds from the start of the track
        elapsed: f64,
    },

    /// The resume offset jumped
    Seeked {
        /// New position in seconds
        position: f64,
    },

    /// Volume level or mute flag changed
    VolumeChanged {
        /// Level (0-100)
        level: u8,
        /// Whether output is muted
        muted: bool,
    },

    /// The track played to completion
    Ended,

    /// Loading or starting failed
    Error {
        /// User-facing message
        message: String,
    },
}

/// Fan-out of session events to any number of listeners
///
/// Dropped receivers are pruned on the next emit.
#[derive(Debug, Default)]
pub struct EventBus {
    senders: Mutex<Vec<Sender<SessionEvent>>>,
}

impl EventBus {
    /// Create a bus with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = unbounded();
        self.senders.lock().push(tx);
        rx
    }

    /// Deliver `event` to every live listener
    pub fn emit(&self, event: &SessionEvent) {
        self.senders
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live listeners as of the last emit
    pub fn listener_count(&self) -> usize {
        self.senders.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listener_receives_events() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.emit(&SessionEvent::Ended);

        assert_eq!(first.try_recv(), Ok(SessionEvent::Ended));
        assert_eq!(second.try_recv(), Ok(SessionEvent::Ended));
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.emit(&SessionEvent::Progress { elapsed: 1.5 });

        assert_eq!(bus.listener_count(), 1);
        assert_eq!(kept.try_recv(), Ok(SessionEvent::Progress { elapsed: 1.5 }));
    }

    #[test]
    fn events_serialize_for_ipc() {
        let json = serde_json::to_string(&SessionEvent::StateChanged {
            state: SessionState::Playing,
        })
        .unwrap();
        assert!(json.contains("Playing"));
    }
}
