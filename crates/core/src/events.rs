//! Session event fan-out.
//!
//! Every inbound message and lifecycle transition is broadcast to
//! whoever is listening; subscribers that fall behind lose the oldest
//! events rather than applying backpressure to the read loop.

use std::sync::Arc;

use mrp_protocol::{Message, NowPlayingInfo, SupportedCommand};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::poller::SubscriptionPoller;

const CHANNEL_CAPACITY: usize = 32;

/// Broadcast senders for every event the session emits. Emitting to
/// a channel with no subscribers is a no-op.
pub(crate) struct EventChannels {
    pub(crate) message: broadcast::Sender<Message>,
    pub(crate) connect: broadcast::Sender<()>,
    pub(crate) close: broadcast::Sender<()>,
    pub(crate) error: broadcast::Sender<String>,
    pub(crate) debug: broadcast::Sender<String>,
    pub(crate) now_playing: broadcast::Sender<Option<NowPlayingInfo>>,
    pub(crate) supported_commands: broadcast::Sender<Vec<SupportedCommand>>,
    pub(crate) playback_queue: broadcast::Sender<Value>,
}

impl EventChannels {
    pub(crate) fn new() -> Self {
        Self {
            message: broadcast::channel(CHANNEL_CAPACITY).0,
            connect: broadcast::channel(CHANNEL_CAPACITY).0,
            close: broadcast::channel(CHANNEL_CAPACITY).0,
            error: broadcast::channel(CHANNEL_CAPACITY).0,
            debug: broadcast::channel(CHANNEL_CAPACITY).0,
            now_playing: broadcast::channel(CHANNEL_CAPACITY).0,
            supported_commands: broadcast::channel(CHANNEL_CAPACITY).0,
            playback_queue: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }
}

/// Releases poller interest when the owning stream is dropped.
pub(crate) struct InterestGuard {
    poller: Arc<SubscriptionPoller>,
}

impl InterestGuard {
    pub(crate) fn new(poller: Arc<SubscriptionPoller>) -> Self {
        poller.retain();
        Self { poller }
    }
}

impl Drop for InterestGuard {
    fn drop(&mut self) {
        self.poller.release();
    }
}

/// Subscription handle for one event channel.
///
/// Streams backed by polled state (now-playing, supported commands)
/// carry an interest guard, so holding the stream keeps the refresh
/// loop alive and dropping it lets the loop stop.
pub struct EventStream<T> {
    rx: broadcast::Receiver<T>,
    _interest: Option<InterestGuard>,
}

impl<T: Clone> EventStream<T> {
    pub(crate) fn new(rx: broadcast::Receiver<T>) -> Self {
        Self {
            rx,
            _interest: None,
        }
    }

    pub(crate) fn with_interest(rx: broadcast::Receiver<T>, guard: InterestGuard) -> Self {
        Self {
            rx,
            _interest: Some(guard),
        }
    }

    /// Next event, or `None` once the session is gone. A lagged
    /// subscriber skips the events it missed and keeps going.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
