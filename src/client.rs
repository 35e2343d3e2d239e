use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc::UnboundedSender, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::{ConnectionConfig, KeepAlivePolicy, ReconnectPolicy},
    connection::RealtimeConnection,
    dispatch::{self, SharedDispatcher},
    error::RealtimeError,
    protocol_objects::{Message, Payload, PayloadKind},
    subscription::Subscription,
    task::Task,
    types::{CONNECTION_EVENT_CAPACITY, ConnectionEvent, ConnectionState, Result},
};

type SenderSlot = Arc<Mutex<Option<UnboundedSender<Message>>>>;
/// Frames re-sent on every (re)connect, latest per payload kind.
type RetainedFrames = Arc<Mutex<HashMap<PayloadKind, Message>>>;

/// Owner of the single realtime connection for one (address, room, participant).
///
/// Consumers never reach the transport: they emit through the client, bind
/// handlers with [`RealtimeClient::on`], and observe [`ConnectionState`]
/// through [`RealtimeClient::watch_state`] or [`RealtimeClient::events`].
/// Dropping the client tears the connection down.
pub struct RealtimeClient {
    config: ConnectionConfig,
    reconnect: ReconnectPolicy,
    keep_alive: KeepAlivePolicy,
    dispatcher: SharedDispatcher,
    sender: SenderSlot,
    retained: RetainedFrames,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ConnectionEvent>,
    supervisor: Option<Supervisor>,
}

struct Supervisor {
    task: Task<()>,
    shutdown: CancellationToken,
}

#[derive(Clone)]
struct SupervisorContext {
    config: ConnectionConfig,
    reconnect: ReconnectPolicy,
    keep_alive: KeepAlivePolicy,
    dispatcher: SharedDispatcher,
    sender: SenderSlot,
    retained: RetainedFrames,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl RealtimeClient {
    pub fn new(config: ConnectionConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(CONNECTION_EVENT_CAPACITY);

        Self {
            config,
            reconnect: ReconnectPolicy::default(),
            keep_alive: KeepAlivePolicy::default(),
            dispatcher: SharedDispatcher::default(),
            sender: Arc::new(Mutex::new(None)),
            retained: RetainedFrames::default(),
            state,
            events,
            supervisor: None,
        }
    }

    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, policy: KeepAlivePolicy) -> Self {
        self.keep_alive = policy;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Opens the connection and waits until it is up or the retry bound is spent.
    ///
    /// Calling this while a connection is live (or still being retried) is a
    /// no-op; a second transport is never opened for the same client.
    pub async fn connect(&mut self) -> Result<()> {
        if self
            .supervisor
            .as_ref()
            .is_some_and(|supervisor| !supervisor.task.is_finished())
        {
            debug!(url = %self.config.url(), "websocket client already connected");
            return self.wait_until_settled().await;
        }

        info!(url = %self.config.url(), room = ?self.config.room(), "connecting to realtime server");

        let shutdown = CancellationToken::new();
        let context = SupervisorContext {
            config: self.config.clone(),
            reconnect: self.reconnect,
            keep_alive: self.keep_alive,
            dispatcher: Arc::clone(&self.dispatcher),
            sender: Arc::clone(&self.sender),
            retained: Arc::clone(&self.retained),
            state: self.state.clone(),
            events: self.events.clone(),
        };
        self.state.send_replace(ConnectionState::Connecting);
        let task = Task::spawn(Self::supervise(context, shutdown.clone()));
        self.supervisor = Some(Supervisor { task, shutdown });

        self.wait_until_settled().await
    }

    async fn wait_until_settled(&self) -> Result<()> {
        let mut state = self.state.subscribe();
        let settled = state
            .wait_for(|state| {
                matches!(
                    state,
                    ConnectionState::Connected
                        | ConnectionState::Failed
                        | ConnectionState::Disconnected
                )
            })
            .await
            .map(|state| *state)
            .map_err(|_| RealtimeError::ConnectionClosed)?;

        match settled {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Failed => Err(RealtimeError::ReconnectExhausted {
                attempts: self.reconnect.max_attempts,
            }),
            _ => Err(RealtimeError::NotConnected),
        }
    }

    /// Replaces the auth bundle. A change of address, room or participant id
    /// tears down the live connection and reconnects with the new identity.
    pub async fn update_auth(&mut self, config: ConnectionConfig) -> Result<()> {
        if self.config.same_identity(&config) {
            self.config = config;
            return Ok(());
        }

        let was_active = self.supervisor.is_some();
        self.disconnect().await?;
        self.retained.lock().clear();
        self.config = config;

        if was_active {
            self.connect().await?;
        }
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.shutdown.cancel();
            let _ = supervisor.task.join().await?;
        }
        *self.sender.lock() = None;
        self.state.send_replace(ConnectionState::Disconnected);
        Ok(())
    }

    pub async fn close(mut self) -> Result<()> {
        self.disconnect().await
    }

    /// Binds `handler` to inbound frames of `kind` until the returned
    /// subscription is dropped.
    pub fn on<F>(&self, kind: PayloadKind, handler: F) -> Subscription
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        dispatch::bind(&self.dispatcher, kind, Arc::new(handler))
    }

    pub fn emit(&self, payload: Payload) -> Result<()> {
        self.send(self.room_message(payload))
    }

    /// Like [`RealtimeClient::emit`], but the frame is also sent again right
    /// after every reconnect. A later frame of the same kind replaces it.
    pub(crate) fn emit_retained(&self, payload: Payload) -> Result<()> {
        let message = self.room_message(payload);
        self.retained
            .lock()
            .insert(message.payload.kind(), message.clone());
        self.send(message)
    }

    fn room_message(&self, payload: Payload) -> Message {
        let mut message = Message::from(payload);
        message.room = self.config.room().map(String::from);
        message
    }

    pub(crate) fn send(&self, message: Message) -> Result<()> {
        match &*self.sender.lock() {
            Some(sender) => Ok(sender.send(message)?),
            None => Err(RealtimeError::NotConnected),
        }
    }

    async fn supervise(context: SupervisorContext, shutdown: CancellationToken) {
        let mut attempt: u32 = 0;

        loop {
            let dispatcher = Arc::clone(&context.dispatcher);
            let message_received_callback =
                move |message: Message| dispatch::dispatch(&dispatcher, &message);
            let handshake = context
                .config
                .auth()
                .map(|auth| Message::from(Payload::Auth(auth.clone())));

            let connecting = tokio::select! {
                result = RealtimeConnection::new(
                    context.config.url(),
                    handshake,
                    Box::new(message_received_callback),
                    context.keep_alive,
                ) => result,
                _ = shutdown.cancelled() => return,
            };

            match connecting {
                Ok(connection) => {
                    attempt = 0;
                    let sender = connection.sender();
                    for message in context.retained.lock().values() {
                        debug!(event = %message.payload.kind(), "replaying retained frame");
                        let _ = sender.send(message.clone());
                    }
                    *context.sender.lock() = Some(sender);
                    context.state.send_replace(ConnectionState::Connected);
                    let _ = context.events.send(ConnectionEvent::Connected);
                    info!(url = %context.config.url(), "websocket connection established");

                    let dropped = tokio::select! {
                        _ = connection.closed() => true,
                        _ = shutdown.cancelled() => false,
                    };

                    *context.sender.lock() = None;
                    if let Err(error) = connection.close().await {
                        debug!(%error, "connection tasks ended with errors");
                    }
                    let _ = context.events.send(ConnectionEvent::Disconnected);

                    if !dropped {
                        context.state.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                    warn!(url = %context.config.url(), "websocket connection dropped");
                }
                Err(error) => {
                    warn!(url = %context.config.url(), %error, "connect_error");
                    let _ = context.events.send(ConnectionEvent::ConnectError(error.to_string()));
                }
            }

            if !context.reconnect.auto_reconnect || attempt >= context.reconnect.max_attempts {
                warn!(attempts = attempt, "giving up on realtime connection");
                context.state.send_replace(ConnectionState::Failed);
                let _ = context
                    .events
                    .send(ConnectionEvent::ReconnectFailed { attempts: attempt });
                return;
            }

            attempt += 1;
            debug!(
                attempt,
                max_attempts = context.reconnect.max_attempts,
                delay = ?context.reconnect.delay,
                "scheduling reconnect"
            );
            context
                .state
                .send_replace(ConnectionState::Reconnecting { attempt });
            let _ = context.events.send(ConnectionEvent::Reconnecting { attempt });

            tokio::select! {
                _ = tokio::time::sleep(context.reconnect.delay) => {}
                _ = shutdown.cancelled() => {
                    context.state.send_replace(ConnectionState::Disconnected);
                    return;
                }
            }
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        if let Some(supervisor) = &self.supervisor {
            supervisor.shutdown.cancel();
        }
    }
}
