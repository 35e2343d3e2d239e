use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::{
    client::RealtimeClient,
    protocol_objects::{ChatMessage, JoinChannel, Participant, Payload, PayloadKind, SendMessage},
    subscription::Subscription,
    types::Result,
};

/// What to do with `new-message` pushes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InboundPolicy {
    /// Log the message and leave the visible list untouched.
    #[default]
    LogOnly,
    Append,
}

/// Chat over the realtime connection.
///
/// `send` never touches the local list and attaches no correlation id, so a
/// later server echo cannot be matched to a specific outbound message.
pub struct MessageChannel {
    sender: Participant,
    policy: InboundPolicy,
    messages: Arc<RwLock<Vec<ChatMessage>>>,
    _subscription: Subscription,
}

impl MessageChannel {
    pub fn attach(client: &RealtimeClient, sender: Participant, policy: InboundPolicy) -> Self {
        let messages: Arc<RwLock<Vec<ChatMessage>>> = Arc::default();

        let messages_clone = Arc::clone(&messages);
        let subscription = client.on(PayloadKind::NewMessage, move |payload| {
            let Payload::NewMessage(message) = payload else {
                return;
            };
            match policy {
                InboundPolicy::LogOnly => {
                    info!(id = %message.id, sender = %message.sender, "new message received");
                }
                InboundPolicy::Append => {
                    debug!(id = %message.id, "appending received message");
                    messages_clone.write().push(message.clone());
                }
            }
        });

        Self {
            sender,
            policy,
            messages,
            _subscription: subscription,
        }
    }

    pub fn policy(&self) -> InboundPolicy {
        self.policy
    }

    pub fn join(&self, client: &RealtimeClient, channel_id: &str) -> Result<()> {
        client.emit(Payload::JoinChannel(JoinChannel {
            channel_id: String::from(channel_id),
        }))
    }

    pub fn send(&self, client: &RealtimeClient, body: &str) -> Result<()> {
        client.emit(Payload::SendMessage(SendMessage {
            sender: self.sender.display_name(),
            body: String::from(body),
        }))
    }

    /// Seeds the list with history fetched out of band, replacing what was there.
    pub fn load_history(&self, history: Vec<ChatMessage>) {
        *self.messages.write() = history;
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.read().clone()
    }
}
