use std::time::Duration;

use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    net::TcpStream,
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time::{Interval, MissedTickBehavior, interval},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as TMessage,
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::{
    config::KeepAlivePolicy,
    error::RealtimeError,
    protocol_objects::{Heartbeat, Message, Payload},
    types::Result,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) type ConnectionMessageReceivedEvent = Box<dyn Fn(Message) + Send + Sync>;

/// One open websocket. Owns the listen, send and heartbeat tasks; all three
/// stop together when the connection is closed or the peer goes away.
pub(crate) struct RealtimeConnection {
    sender: UnboundedSender<Message>,
    listen_join_handle: JoinHandle<Result<()>>,
    send_join_handle: JoinHandle<Result<()>>,
    heartbeat_join_handle: JoinHandle<Result<()>>,
    cancellation_token: CancellationToken,
    _drop_guard: DropGuard,
}

impl RealtimeConnection {
    pub(crate) async fn new(
        url: &str,
        handshake: Option<Message>,
        message_received_callback: ConnectionMessageReceivedEvent,
        keep_alive: KeepAlivePolicy,
    ) -> Result<Self> {
        let (ws_stream, _) = connect_async(url).await?;
        let (mut ws_sender, ws_receiver) = ws_stream.split();

        if let Some(handshake) = handshake {
            ws_sender
                .send(Self::message_to_tmessage(&handshake)?)
                .await?;
        }

        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        let (ping_sender, ping_receiver) = tokio::sync::mpsc::unbounded_channel();
        let cancellation_token = CancellationToken::new();

        let listen_join_handle = tokio::spawn(Self::listen(
            ws_receiver,
            message_received_callback,
            cancellation_token.clone(),
            keep_alive.idle_timeout,
        ));
        let send_join_handle = tokio::spawn(Self::ws_send_loop(
            receiver,
            ping_receiver,
            ws_sender,
            cancellation_token.clone(),
        ));

        let mut heartbeat_interval = interval(keep_alive.heartbeat_interval);
        heartbeat_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let heartbeat_join_handle = tokio::spawn(Self::heartbeat(
            sender.clone(),
            ping_sender,
            cancellation_token.clone(),
            heartbeat_interval,
        ));

        Ok(Self {
            sender,
            listen_join_handle,
            send_join_handle,
            heartbeat_join_handle,
            _drop_guard: cancellation_token.clone().drop_guard(),
            cancellation_token,
        })
    }

    /// Resolves once the connection is no longer usable, for whatever reason.
    pub(crate) async fn closed(&self) {
        self.cancellation_token.cancelled().await;
    }

    pub(crate) fn sender(&self) -> UnboundedSender<Message> {
        self.sender.clone()
    }

    pub(crate) async fn close(self) -> Result<()> {
        self.cancellation_token.cancel();

        let results = tokio::try_join!(
            self.listen_join_handle,
            self.send_join_handle,
            self.heartbeat_join_handle
        )?;

        let task_errors: Vec<RealtimeError> = [results.0, results.1, results.2]
            .into_iter()
            .filter_map(std::result::Result::err)
            .collect();

        if !task_errors.is_empty() {
            return Err(RealtimeError::MultipleTaskErrors {
                errors: task_errors,
            });
        }

        Ok(())
    }

    async fn listen(
        mut ws_receiver: SplitStream<WsStream>,
        message_received_callback: ConnectionMessageReceivedEvent,
        cancellation_token: CancellationToken,
        idle_timeout: Duration,
    ) -> Result<()> {
        let result = loop {
            tokio::select! {
                received = tokio::time::timeout(idle_timeout, ws_receiver.next()) => {
                    let Ok(received) = received else {
                        warn!(?idle_timeout, "connection: no traffic within idle timeout");
                        break Err(RealtimeError::ConnectionClosed);
                    };
                    match Self::handle_receive(received, &message_received_callback) {
                        Ok(true) => {}
                        Ok(false) => {
                            debug!("connection: closed by peer");
                            break Ok(());
                        }
                        Err(error) => break Err(error),
                    }
                }

                _ = cancellation_token.cancelled() => {
                    return Ok(());
                }
            }
        };

        cancellation_token.cancel();
        result
    }

    async fn ws_send_loop(
        mut receiver: UnboundedReceiver<Message>,
        mut ping_receiver: UnboundedReceiver<TMessage>,
        mut ws_sender: SplitSink<WsStream, TMessage>,
        cancellation_token: CancellationToken,
    ) -> Result<()> {
        let result = loop {
            tokio::select! {
                message = receiver.recv() => {
                    let Some(message) = message else {
                        debug!("connection: canceling due to None received from receiver.");
                        break Ok(());
                    };
                    let tmessage = match Self::message_to_tmessage(&message) {
                        Ok(tmessage) => tmessage,
                        Err(error) => break Err(error),
                    };
                    if let Err(error) = ws_sender.send(tmessage).await {
                        break Err(error.into());
                    }
                },

                Some(ping) = ping_receiver.recv() => {
                    if let Err(error) = ws_sender.send(ping).await {
                        break Err(error.into());
                    }
                },

                _ = cancellation_token.cancelled() => {
                    break Ok(());
                }
            }
        };

        cancellation_token.cancel();
        let _ = ws_sender.close().await;
        result
    }

    /// Sends the `heartbeat` frame and a websocket ping on every tick. The
    /// peer's pong is what keeps the idle timeout from firing on a quiet link.
    async fn heartbeat(
        sender: UnboundedSender<Message>,
        ping_sender: UnboundedSender<TMessage>,
        cancellation_token: CancellationToken,
        mut interval: Interval,
    ) -> Result<()> {
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let heartbeat_message = Message::from(Payload::Heartbeat(Heartbeat {}));
                    if sender.send(heartbeat_message).is_err()
                        || ping_sender.send(TMessage::Ping(Vec::new())).is_err()
                    {
                        return Ok(());
                    }
                },

                _ = cancellation_token.cancelled() => {
                    return Ok(())
                }
            }
        }
    }

    /// Returns `Ok(false)` once the stream has ended.
    fn handle_receive(
        received: Option<std::result::Result<TMessage, tokio_tungstenite::tungstenite::Error>>,
        message_received_callback: &ConnectionMessageReceivedEvent,
    ) -> Result<bool> {
        match received {
            Some(Ok(TMessage::Text(text))) => {
                match Self::tmessage_text_to_message(&text) {
                    Ok(message) => message_received_callback(message),
                    Err(error) => warn!(%error, frame = %text, "connection: skipping malformed frame"),
                }
                Ok(true)
            }
            Some(Ok(TMessage::Close(_))) | None => Ok(false),
            Some(Ok(_)) => Ok(true),
            Some(Err(error)) => Err(error.into()),
        }
    }

    fn message_to_tmessage(message: &Message) -> Result<TMessage> {
        Ok(TMessage::Text(serde_json::to_string(message)?))
    }

    fn tmessage_text_to_message(tmessage: &str) -> Result<Message> {
        Ok(serde_json::from_str(tmessage)?)
    }
}
