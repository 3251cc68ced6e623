//! Session facade: connect handshake, outbound operations, and the
//! event surface.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use mrp_protocol::{
    ClientUpdatesConfig, ConnectionState, Credentials, DeviceInfoBody, Envelope, Message,
    MessageKind, NowPlayingInfo, PlaybackQueueRequest, SupportedCommand, registry,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::DEFAULT_WAIT_TIMEOUT_SECS;
use crate::auth::{PairingExchange, SessionAuth, Verifier};
use crate::correlator::MessageCorrelator;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::events::{EventChannels, EventStream, InterestGuard};
use crate::hid::{Key, encode_key};
use crate::poller::SubscriptionPoller;
use crate::transport::{Transport, TransportEvent, TransportParts};

/// Where the session is in its lifecycle. The handshake walks the
/// states in order; any failure lands in `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Opening,
    Introduced,
    Verified,
    Configured,
    Ready,
    Closed,
}

struct Inner {
    device: Mutex<Device>,
    transport: Arc<dyn Transport>,
    state: Mutex<SessionState>,
    correlator: MessageCorrelator,
    events: EventChannels,
    poller: Arc<SubscriptionPoller>,
    pairing: Mutex<Option<Arc<dyn PairingExchange>>>,
    verifier: Mutex<Option<Arc<dyn Verifier>>>,
}

/// Client handle for one appliance session.
///
/// Owns the read loop draining transport events; dropping the handle
/// stops the loop and with it every [`EventStream`] taken from this
/// session.
pub struct MediaRemote {
    inner: Arc<Inner>,
    read_task: JoinHandle<()>,
}

impl MediaRemote {
    /// Wires a device to a transport and starts the read loop. The
    /// session stays idle until [`connect`](Self::connect).
    pub fn new(device: Device, parts: TransportParts) -> Self {
        let TransportParts {
            transport,
            mut event_rx,
        } = parts;

        let inner = Arc::new(Inner {
            device: Mutex::new(device),
            transport,
            state: Mutex::new(SessionState::Idle),
            correlator: MessageCorrelator::new(),
            events: EventChannels::new(),
            poller: Arc::new(SubscriptionPoller::new()),
            pairing: Mutex::new(None),
            verifier: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        inner.poller.set_refresh(Arc::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let Err(error) = inner.post_playback_queue_refresh().await {
                    debug!(target: "mrp.poll", %error, "background refresh failed");
                }
            })
        }));

        let weak = Arc::downgrade(&inner);
        let read_task = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.handle_event(event);
            }
        });

        Self { inner, read_task }
    }

    /// Installs the long-term pairing collaborator.
    pub fn set_pairing(&self, pairing: Arc<dyn PairingExchange>) {
        *self.inner.pairing.lock() = Some(pairing);
    }

    /// Installs the per-session verification collaborator.
    pub fn set_verifier(&self, verifier: Arc<dyn Verifier>) {
        *self.inner.verifier.lock() = Some(verifier);
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    pub fn device(&self) -> Device {
        self.inner.device.lock().clone()
    }

    /// Runs the connect handshake.
    ///
    /// With a credential bundle the session presents the bundle's
    /// identity, verifies, and turns on live updates; without one it
    /// stops after the introduction. Any step failing closes the
    /// transport and lands the session in `Closed`, from which a
    /// fresh `connect` may be attempted.
    pub async fn connect(&self, credentials: Option<Credentials>) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            match *state {
                SessionState::Idle | SessionState::Closed => *state = SessionState::Opening,
                SessionState::Ready => {
                    return Err(Error::Handshake("session already connected".to_string()));
                }
                _ => {
                    return Err(Error::Handshake("connect already in progress".to_string()));
                }
            }
        }

        let auth = SessionAuth::from_credentials(credentials);
        if let Some(restored) = auth.credentials() {
            self.inner.device.lock().restore_session_id(restored);
        }

        match self.inner.run_handshake(&auth).await {
            Ok(()) => {
                *self.inner.state.lock() = SessionState::Ready;
                debug!(target: "mrp.session", "session ready");
                Ok(())
            }
            Err(error) => {
                self.inner.transport.close();
                *self.inner.state.lock() = SessionState::Closed;
                Err(error)
            }
        }
    }

    /// Closes the transport. Safe to call in any state.
    pub fn disconnect(&self) {
        *self.inner.state.lock() = SessionState::Closed;
        self.inner.transport.close();
        debug!(target: "mrp.session", "session closed");
    }

    /// Builds a message from a schema definition and sends it.
    ///
    /// With `wait_for_response` the returned value is the correlated
    /// reply; otherwise it is `None` once the write completes.
    pub async fn send(
        &self,
        definition: &str,
        message_type: &str,
        body: Value,
        wait_for_response: bool,
        priority: i32,
    ) -> Result<Option<Message>> {
        let builder = registry::resolve(definition, message_type)?;
        let message = builder.build(body)?;
        let envelope = if wait_for_response {
            Envelope::request(message, self.inner.session_credentials())
        } else {
            Envelope::post(message, self.inner.session_credentials())
        };
        self.inner.send_envelope(envelope.with_priority(priority)).await
    }

    /// Awaits the next inbound message of `kind`, defaulting the
    /// deadline to five seconds.
    pub async fn wait_for_type(
        &self,
        kind: MessageKind,
        timeout_secs: Option<u64>,
    ) -> Result<Message> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_WAIT_TIMEOUT_SECS));
        self.inner.correlator.wait_for(kind, timeout).await
    }

    /// Requests a page of the playback queue and returns the
    /// appliance's reply.
    pub async fn request_playback_queue(&self, request: PlaybackQueueRequest) -> Result<Message> {
        self.inner.request_playback_queue(request).await
    }

    /// Presses a key: the down event, the key's dwell if it has one,
    /// then the up event.
    pub async fn press_key(&self, key: Key) -> Result<()> {
        let command = encode_key(key);
        self.inner.send_hid_event(command.down).await?;
        if let Some(dwell) = command.dwell {
            tokio::time::sleep(dwell).await;
        }
        self.inner.send_hid_event(command.up).await?;
        Ok(())
    }

    /// Asks a sleeping appliance to wake.
    pub async fn wake_device(&self) -> Result<()> {
        let envelope = Envelope::post(
            Message::empty(MessageKind::WakeDevice),
            self.inner.session_credentials(),
        );
        self.inner.send_envelope(envelope).await?;
        Ok(())
    }

    /// Runs the pairing exchange and adopts the resulting credential
    /// bundle. The caller should persist the returned bundle for
    /// later connects.
    pub async fn pair(&self) -> Result<Credentials> {
        let pairing = self
            .inner
            .pairing
            .lock()
            .clone()
            .ok_or_else(|| Error::Pairing("no pairing exchange configured".to_string()))?;
        let credentials = pairing.initiate_pair().await?;
        self.inner
            .device
            .lock()
            .attach_credentials(credentials.clone());
        Ok(credentials)
    }

    /// Every inbound message, before any typed fan-out.
    pub fn messages(&self) -> EventStream<Message> {
        EventStream::new(self.inner.events.message.subscribe())
    }

    /// Now-playing updates. Holding this stream keeps the background
    /// refresh loop running.
    pub fn now_playing(&self) -> EventStream<Option<NowPlayingInfo>> {
        EventStream::with_interest(
            self.inner.events.now_playing.subscribe(),
            InterestGuard::new(Arc::clone(&self.inner.poller)),
        )
    }

    /// Supported-command updates. Holding this stream keeps the
    /// background refresh loop running.
    pub fn supported_commands(&self) -> EventStream<Vec<SupportedCommand>> {
        EventStream::with_interest(
            self.inner.events.supported_commands.subscribe(),
            InterestGuard::new(Arc::clone(&self.inner.poller)),
        )
    }

    /// Playback-queue blocks lifted out of state snapshots.
    pub fn playback_queue_events(&self) -> EventStream<Value> {
        EventStream::new(self.inner.events.playback_queue.subscribe())
    }

    pub fn connect_events(&self) -> EventStream<()> {
        EventStream::new(self.inner.events.connect.subscribe())
    }

    pub fn close_events(&self) -> EventStream<()> {
        EventStream::new(self.inner.events.close.subscribe())
    }

    pub fn errors(&self) -> EventStream<String> {
        EventStream::new(self.inner.events.error.subscribe())
    }

    pub fn debug_events(&self) -> EventStream<String> {
        EventStream::new(self.inner.events.debug.subscribe())
    }

    /// Whether the background refresh loop is currently running.
    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_polling()
    }
}

impl Drop for MediaRemote {
    fn drop(&mut self) {
        self.read_task.abort();
        self.inner.transport.close();
    }
}

impl Inner {
    async fn run_handshake(&self, auth: &SessionAuth) -> Result<()> {
        debug!(target: "mrp.session", "opening transport");
        self.transport.open().await?;

        // Introduce before anything else; the introduction itself is
        // never sent with credentials, even on authenticated sessions.
        let session_id = self.device.lock().session_id().to_string();
        let introduction = Envelope::request(
            Message::new(
                MessageKind::DeviceInfo,
                json!(DeviceInfoBody::for_session(session_id)),
            ),
            None,
        );
        self.transport.send(introduction).await?;
        *self.state.lock() = SessionState::Introduced;
        debug!(target: "mrp.session", "introduction acknowledged");

        let SessionAuth::Authenticated(credentials) = auth else {
            return Ok(());
        };

        self.device.lock().attach_credentials(credentials.clone());
        let verifier = self
            .verifier
            .lock()
            .clone()
            .ok_or_else(|| Error::Verification("no verifier configured".to_string()))?;
        let keys = verifier.verify().await?;
        let _ = self.events.debug.send(format!(
            "derived session keys read={} write={}",
            hex::encode(&keys.read_key),
            hex::encode(&keys.write_key)
        ));
        self.device.lock().attach_derived_keys(keys);
        *self.state.lock() = SessionState::Verified;
        debug!(target: "mrp.session", "session verified");

        let connection_state = Envelope::post(
            Message::new(
                MessageKind::SetConnectionState,
                json!({"state": ConnectionState::Connected}),
            ),
            self.session_credentials(),
        );
        self.transport.send(connection_state).await?;

        let updates_config = Envelope::post(
            Message::new(
                MessageKind::ClientUpdatesConfig,
                json!(ClientUpdatesConfig::now_playing_and_artwork()),
            ),
            self.session_credentials(),
        );
        self.transport.send(updates_config).await?;
        *self.state.lock() = SessionState::Configured;
        debug!(target: "mrp.session", "live updates configured");

        Ok(())
    }

    fn session_credentials(&self) -> Option<Credentials> {
        self.device.lock().credentials().cloned()
    }

    async fn send_envelope(&self, envelope: Envelope) -> Result<Option<Message>> {
        if !self.transport.is_open() {
            return Err(Error::NotConnected);
        }
        self.transport.send(envelope).await
    }

    async fn request_playback_queue(&self, request: PlaybackQueueRequest) -> Result<Message> {
        let envelope = Envelope::request(
            self.playback_queue_message(request),
            self.session_credentials(),
        );
        self.send_envelope(envelope)
            .await?
            .ok_or(Error::ChannelClosed)
    }

    /// Fire-and-forget refresh used by the poll loop; the resulting
    /// state snapshot arrives through the inbound stream.
    async fn post_playback_queue_refresh(&self) -> Result<()> {
        let envelope = Envelope::post(
            self.playback_queue_message(PlaybackQueueRequest::background_refresh()),
            self.session_credentials(),
        );
        self.send_envelope(envelope).await?;
        Ok(())
    }

    fn playback_queue_message(&self, request: PlaybackQueueRequest) -> Message {
        Message::new(MessageKind::PlaybackQueueRequest, request.into_body())
    }

    async fn send_hid_event(&self, data: Vec<u8>) -> Result<()> {
        let envelope = Envelope::post(
            Message::new(
                MessageKind::SendHidEvent,
                json!({"hidEventData": BASE64.encode(&data)}),
            ),
            self.session_credentials(),
        );
        self.send_envelope(envelope).await?;
        Ok(())
    }

    fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                let _ = self.events.connect.send(());
            }
            TransportEvent::Closed => {
                *self.state.lock() = SessionState::Closed;
                let _ = self.events.close.send(());
            }
            TransportEvent::Message(message) => {
                self.correlator.dispatch(&message);
                let _ = self.events.message.send(message.clone());
                if message.kind == MessageKind::SetState {
                    self.fan_out_state(&message);
                }
            }
            TransportEvent::Error(error) => {
                warn!(target: "mrp.session", %error, "transport error");
                let _ = self.events.error.send(error);
            }
            TransportEvent::Debug(line) => {
                let _ = self.events.debug.send(line);
            }
        }
    }

    /// Lifts the typed blocks out of a state snapshot. A snapshot
    /// with no payload clears now-playing state and nothing else.
    fn fan_out_state(&self, message: &Message) {
        let Some(payload) = message.payload.as_ref() else {
            let _ = self.events.now_playing.send(None);
            return;
        };
        if present(payload, "nowPlayingInfo") {
            let _ = self
                .events
                .now_playing
                .send(Some(NowPlayingInfo::from_payload(payload)));
        }
        // The outer block alone triggers an emission; a missing inner
        // list decodes as empty.
        if present(payload, "supportedCommands") {
            let _ = self
                .events
                .supported_commands
                .send(SupportedCommand::list_from_payload(payload));
        }
        if present(payload, "playbackQueue") {
            let _ = self.events.playback_queue.send(payload["playbackQueue"].clone());
        }
    }
}

/// A block is present when the key exists with a non-null value; an
/// explicit null reads the same as an absent key.
fn present(payload: &Value, key: &str) -> bool {
    payload.get(key).is_some_and(|value| !value.is_null())
}
