#![allow(dead_code)]

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::{UnboundedReceiver, unbounded_channel},
    task::JoinHandle,
    time::timeout,
};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message as TMessage};

use collab_realtime::protocol_objects::Participant;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn ana() -> Participant {
    Participant::new("u1", "Ana").with_last_name("G")
}

/// In-process websocket server standing in for the realtime backend.
pub struct MockServer {
    pub url: String,
    accept_task: Option<JoinHandle<()>>,
    connections: UnboundedReceiver<ServerConnection>,
}

pub struct ServerConnection {
    ws: WebSocketStream<TcpStream>,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let url = format!("ws://{}", listener.local_addr().expect("local addr"));
        let (sender, connections) = unbounded_channel();

        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if let Ok(ws) = accept_async(stream).await {
                    let _ = sender.send(ServerConnection { ws });
                }
            }
        });

        Self {
            url,
            accept_task: Some(accept_task),
            connections,
        }
    }

    pub async fn next_connection(&mut self) -> ServerConnection {
        timeout(WAIT, self.connections.recv())
            .await
            .expect("timed out waiting for a client connection")
            .expect("accept loop ended")
    }

    pub async fn no_connection_within(&mut self, wait: Duration) -> bool {
        timeout(wait, self.connections.recv()).await.is_err()
    }

    /// Closes the listening socket; later connection attempts are refused.
    pub async fn stop_accepting(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(task) = &self.accept_task {
            task.abort();
        }
    }
}

impl ServerConnection {
    pub async fn push(&mut self, frame: Value) {
        self.ws
            .send(TMessage::Text(frame.to_string()))
            .await
            .expect("push frame");
    }

    pub async fn push_raw(&mut self, text: &str) {
        self.ws
            .send(TMessage::Text(String::from(text)))
            .await
            .expect("push raw frame");
    }

    /// Next JSON frame from the client, skipping heartbeats. `None` once the
    /// client has closed the socket.
    pub async fn next_frame(&mut self) -> Option<Value> {
        loop {
            let received = timeout(WAIT, self.ws.next())
                .await
                .expect("timed out waiting for a client frame");
            match received {
                Some(Ok(TMessage::Text(text))) => {
                    let frame: Value = serde_json::from_str(&text).expect("client sent JSON");
                    if frame["event"] == "heartbeat" {
                        continue;
                    }
                    return Some(frame);
                }
                Some(Ok(TMessage::Close(_))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => continue,
            }
        }
    }

    /// Waits until the client has sent both a `heartbeat` frame and a ping.
    pub async fn next_heartbeat(&mut self) {
        let (mut frame_seen, mut ping_seen) = (false, false);
        while !(frame_seen && ping_seen) {
            let received = timeout(WAIT, self.ws.next())
                .await
                .expect("timed out waiting for a heartbeat");
            match received {
                Some(Ok(TMessage::Text(text))) => {
                    let frame: Value = serde_json::from_str(&text).expect("client sent JSON");
                    frame_seen |= frame == serde_json::json!({"event": "heartbeat", "data": {}});
                }
                Some(Ok(TMessage::Ping(_))) => ping_seen = true,
                Some(Ok(_)) => {}
                None | Some(Err(_)) => panic!("socket closed before a heartbeat"),
            }
        }
    }

    /// Keeps reading (and so answering pings) until the client goes away.
    pub async fn read_until_closed(mut self) {
        while let Ok(Some(Ok(message))) = timeout(WAIT, self.ws.next()).await {
            if message.is_close() {
                break;
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
