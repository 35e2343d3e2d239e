//! Realtime layer for the collaboration client: one owned websocket
//! connection per room, presence lists, chat, a notification stream and the
//! planning-poker session guard.

pub mod api;
pub mod client;
pub mod config;
mod connection;
mod dispatch;
pub mod error;
pub mod local_chat;
pub mod message_channel;
pub mod notification;
pub mod presence;
pub mod protocol_objects;
pub mod session_guard;
pub mod subscription;
mod task;
pub mod types;
mod utils;
