//! In-memory transport for tests.
//!
//! Records every envelope the session sends, serves scripted replies
//! to request envelopes, and lets the test inject inbound messages
//! and lifecycle events as if they came off the wire.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use mrp_protocol::{Envelope, Message};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportEvent, TransportParts};

struct Shared {
    open: AtomicBool,
    sent: Mutex<Vec<Envelope>>,
    responses: Mutex<VecDeque<Message>>,
    open_error: Mutex<Option<String>>,
    send_error: Mutex<Option<String>>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
}

/// Builds a paired fake transport and its test-side controller.
#[derive(Default)]
pub struct FakeTransportBuilder {
    open_error: Option<String>,
}

impl FakeTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the first `open` fail with this error.
    pub fn open_error(mut self, error: impl Into<String>) -> Self {
        self.open_error = Some(error.into());
        self
    }

    pub fn build(self) -> (TransportParts, FakeTransportController) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            open: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            open_error: Mutex::new(self.open_error),
            send_error: Mutex::new(None),
            event_tx,
        });
        let transport = Arc::new(FakeTransport {
            shared: Arc::clone(&shared),
        });
        (
            TransportParts {
                transport,
                event_rx,
            },
            FakeTransportController { shared },
        )
    }
}

struct FakeTransport {
    shared: Arc<Shared>,
}

impl Transport for FakeTransport {
    fn open(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if let Some(error) = self.shared.open_error.lock().take() {
                return Err(Error::Transport(error));
            }
            self.shared.open.store(true, Ordering::SeqCst);
            let _ = self.shared.event_tx.send(TransportEvent::Connected);
            Ok(())
        })
    }

    fn close(&self) {
        if self.shared.open.swap(false, Ordering::SeqCst) {
            let _ = self.shared.event_tx.send(TransportEvent::Closed);
        }
    }

    fn send(&self, envelope: Envelope) -> BoxFuture<'_, Result<Option<Message>>> {
        Box::pin(async move {
            if let Some(error) = self.shared.send_error.lock().take() {
                return Err(Error::Transport(error));
            }
            let wait = envelope.wait_for_response;
            self.shared.sent.lock().push(envelope);
            if !wait {
                return Ok(None);
            }
            match self.shared.responses.lock().pop_front() {
                Some(message) => Ok(Some(message)),
                None => Err(Error::Transport(
                    "no scripted response for request".to_string(),
                )),
            }
        })
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }
}

/// Test-side handle: scripts responses, injects inbound traffic, and
/// inspects what the session sent.
pub struct FakeTransportController {
    shared: Arc<Shared>,
}

impl FakeTransportController {
    /// Queues a reply for the next request envelope.
    pub fn queue_response(&self, message: Message) {
        self.shared.responses.lock().push_back(message);
    }

    /// Delivers an inbound message as if read off the wire.
    pub fn inject_message(&self, message: Message) {
        let _ = self
            .shared
            .event_tx
            .send(TransportEvent::Message(message));
    }

    /// Delivers a raw transport event.
    pub fn inject_event(&self, event: TransportEvent) {
        let _ = self.shared.event_tx.send(event);
    }

    /// Drains and returns everything sent so far.
    pub fn take_sent(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.shared.sent.lock())
    }

    /// Makes the next `send` fail with this error.
    pub fn fail_next_send(&self, error: impl Into<String>) {
        *self.shared.send_error.lock() = Some(error.into());
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }
}
