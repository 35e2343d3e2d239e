use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{
    auth::AuthPayload, chat_message::ChatMessage, heartbeat::Heartbeat,
    join_channel::JoinChannel, notification::Notification, participant::Participant,
    register::Register, send_message::SendMessage,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum Payload {
    #[serde(rename = "auth")]
    Auth(AuthPayload),
    #[serde(rename = "join-channel")]
    JoinChannel(JoinChannel),
    #[serde(rename = "send-message")]
    SendMessage(SendMessage),
    #[serde(rename = "register")]
    Register(Register),
    #[serde(rename = "heartbeat")]
    Heartbeat(Heartbeat),
    #[serde(rename = "online-users")]
    OnlineUsers(Vec<Participant>),
    #[serde(rename = "offline-users")]
    OfflineUsers(Vec<Participant>),
    #[serde(rename = "new-message")]
    NewMessage(ChatMessage),
    #[serde(rename = "notification")]
    Notification(Notification),
}

/// Event name of a [`Payload`] without its data; used to route inbound frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Auth,
    JoinChannel,
    SendMessage,
    Register,
    Heartbeat,
    OnlineUsers,
    OfflineUsers,
    NewMessage,
    Notification,
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Auth(_) => PayloadKind::Auth,
            Payload::JoinChannel(_) => PayloadKind::JoinChannel,
            Payload::SendMessage(_) => PayloadKind::SendMessage,
            Payload::Register(_) => PayloadKind::Register,
            Payload::Heartbeat(_) => PayloadKind::Heartbeat,
            Payload::OnlineUsers(_) => PayloadKind::OnlineUsers,
            Payload::OfflineUsers(_) => PayloadKind::OfflineUsers,
            Payload::NewMessage(_) => PayloadKind::NewMessage,
            Payload::Notification(_) => PayloadKind::Notification,
        }
    }
}

impl Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadKind::Auth => write!(f, "auth"),
            PayloadKind::JoinChannel => write!(f, "join-channel"),
            PayloadKind::SendMessage => write!(f, "send-message"),
            PayloadKind::Register => write!(f, "register"),
            PayloadKind::Heartbeat => write!(f, "heartbeat"),
            PayloadKind::OnlineUsers => write!(f, "online-users"),
            PayloadKind::OfflineUsers => write!(f, "offline-users"),
            PayloadKind::NewMessage => write!(f, "new-message"),
            PayloadKind::Notification => write!(f, "notification"),
        }
    }
}

impl Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind().fmt(f)
    }
}
