mod auth;
mod chat_message;
mod heartbeat;
mod join_channel;
mod message;
mod notification;
mod participant;
mod payload;
mod register;
mod send_message;

pub use auth::AuthPayload;
pub use chat_message::{ChatMessage, DeliveryStatus};
pub use heartbeat::Heartbeat;
pub use join_channel::JoinChannel;
pub use message::Message;
pub use notification::Notification;
pub use participant::Participant;
pub use payload::{Payload, PayloadKind};
pub use register::Register;
pub use send_message::SendMessage;
