//! Correlation of awaited message types with the inbound stream.
//!
//! Each wait registers a transient observer keyed by message kind.
//! Fulfillment and expiry race against each other; the waiter
//! registry's lock is the arbiter, so exactly one outcome occurs per
//! wait and the observer is always deregistered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mrp_protocol::{Message, MessageKind};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

struct Waiter {
    id: u64,
    kind: MessageKind,
    tx: oneshot::Sender<Message>,
}

/// Lets a caller await the next inbound message of a given type,
/// with a deadline and exactly-once observer cleanup.
#[derive(Default)]
pub struct MessageCorrelator {
    waiters: Mutex<Vec<Waiter>>,
    next_id: AtomicU64,
}

impl MessageCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Awaits the next inbound message of `kind`.
    ///
    /// Resolves with the message if one arrives before the deadline,
    /// otherwise fails with [`Error::WaitTimeout`]. Either way the
    /// observer is removed exactly once; concurrent waits are
    /// independent.
    pub async fn wait_for(&self, kind: MessageKind, timeout: Duration) -> Result<Message> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = oneshot::channel();
        self.waiters.lock().push(Waiter {
            id,
            kind: kind.clone(),
            tx,
        });

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(Error::ChannelClosed),
            Err(_) => {
                // The deadline and a matching message can race; whoever
                // takes the waiter out of the registry wins.
                let removed = {
                    let mut waiters = self.waiters.lock();
                    match waiters.iter().position(|waiter| waiter.id == id) {
                        Some(index) => {
                            waiters.remove(index);
                            true
                        }
                        None => false,
                    }
                };
                if removed {
                    Err(Error::WaitTimeout { kind })
                } else {
                    rx.try_recv().map_err(|_| Error::WaitTimeout { kind })
                }
            }
        }
    }

    /// Fulfills every pending wait whose kind matches `message`.
    ///
    /// Matching waiters are removed from the registry before their
    /// channels are completed, so a late timeout cannot double-fire.
    pub fn dispatch(&self, message: &Message) {
        let matched: Vec<Waiter> = {
            let mut waiters = self.waiters.lock();
            let mut matched = Vec::new();
            let mut index = 0;
            while index < waiters.len() {
                if waiters[index].kind == message.kind {
                    matched.push(waiters.remove(index));
                } else {
                    index += 1;
                }
            }
            matched
        };

        for waiter in matched {
            let _ = waiter.tx.send(message.clone());
        }
    }

    /// Number of outstanding waits; used to verify observer cleanup.
    pub fn pending(&self) -> usize {
        self.waiters.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn set_state() -> Message {
        Message::new(MessageKind::SetState, json!({"playbackState": 1}))
    }

    #[tokio::test]
    async fn matching_message_resolves_wait() {
        let correlator = Arc::new(MessageCorrelator::new());
        let waiter = {
            let correlator = Arc::clone(&correlator);
            tokio::spawn(async move {
                correlator
                    .wait_for(MessageKind::SetState, Duration::from_secs(5))
                    .await
            })
        };

        tokio::task::yield_now().await;
        correlator.dispatch(&set_state());

        let message = waiter.await.unwrap().unwrap();
        assert_eq!(message.kind, MessageKind::SetState);
        assert_eq!(correlator.pending(), 0);
    }

    #[tokio::test]
    async fn fulfilled_wait_leaves_no_residual_observer() {
        let correlator = Arc::new(MessageCorrelator::new());
        let waiter = {
            let correlator = Arc::clone(&correlator);
            tokio::spawn(async move {
                correlator
                    .wait_for(MessageKind::SetState, Duration::from_secs(5))
                    .await
            })
        };

        tokio::task::yield_now().await;
        correlator.dispatch(&set_state());
        waiter.await.unwrap().unwrap();

        // A second message must find nobody to fulfill.
        correlator.dispatch(&set_state());
        assert_eq!(correlator.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_fails_with_timeout_and_cleans_up() {
        let correlator = MessageCorrelator::new();
        let result = correlator
            .wait_for(MessageKind::DeviceInfo, Duration::from_secs(5))
            .await;

        assert!(matches!(
            result,
            Err(Error::WaitTimeout {
                kind: MessageKind::DeviceInfo
            })
        ));
        assert_eq!(correlator.pending(), 0);
    }

    #[tokio::test]
    async fn non_matching_message_leaves_wait_pending() {
        let correlator = Arc::new(MessageCorrelator::new());
        let waiter = {
            let correlator = Arc::clone(&correlator);
            tokio::spawn(async move {
                correlator
                    .wait_for(MessageKind::DeviceInfo, Duration::from_secs(5))
                    .await
            })
        };

        tokio::task::yield_now().await;
        correlator.dispatch(&set_state());
        assert_eq!(correlator.pending(), 1);

        correlator.dispatch(&Message::empty(MessageKind::DeviceInfo));
        let message = waiter.await.unwrap().unwrap();
        assert_eq!(message.kind, MessageKind::DeviceInfo);
    }

    #[tokio::test]
    async fn concurrent_waits_are_independent() {
        let correlator = Arc::new(MessageCorrelator::new());
        let first = {
            let correlator = Arc::clone(&correlator);
            tokio::spawn(async move {
                correlator
                    .wait_for(MessageKind::SetState, Duration::from_secs(5))
                    .await
            })
        };
        let second = {
            let correlator = Arc::clone(&correlator);
            tokio::spawn(async move {
                correlator
                    .wait_for(MessageKind::SetState, Duration::from_secs(5))
                    .await
            })
        };
        let other = {
            let correlator = Arc::clone(&correlator);
            tokio::spawn(async move {
                correlator
                    .wait_for(MessageKind::DeviceInfo, Duration::from_secs(5))
                    .await
            })
        };

        tokio::task::yield_now().await;
        correlator.dispatch(&set_state());

        // Both same-kind waits resolve from one message.
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(correlator.pending(), 1);

        correlator.dispatch(&Message::empty(MessageKind::DeviceInfo));
        other.await.unwrap().unwrap();
        assert_eq!(correlator.pending(), 0);
    }
}
