use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::{sync::watch, time::Instant};
use tracing::trace;
use uuid::Uuid;

use crate::{
    protocol_objects::{ChatMessage, DeliveryStatus, Participant},
    task::Task,
};

#[derive(Default)]
struct ChatState {
    conversations: HashMap<String, Vec<ChatMessage>>,
    message_index: HashMap<String, String>,
    active: Option<String>,
}

impl ChatState {
    fn message_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        let conversation = self.message_index.get(id)?;
        self.conversations
            .get_mut(conversation)?
            .iter_mut()
            .find(|message| message.id == id)
    }

    /// Moves a message forward; never backwards.
    fn advance(&mut self, id: &str, status: DeliveryStatus) -> bool {
        match self.message_mut(id) {
            Some(message) if message.status < status => {
                message.status = status;
                true
            }
            _ => false,
        }
    }
}

/// In-memory chat with simulated delivery, independent of any connection.
///
/// Each added message starts as [`DeliveryStatus::Sending`], becomes `Sent`
/// one second after creation and `Delivered` two seconds after creation.
/// Pending timers are cancelled when the store is dropped. Must be used
/// inside a Tokio runtime.
pub struct LocalChatStore {
    state: Arc<Mutex<ChatState>>,
    revision: Arc<watch::Sender<u64>>,
    timers: Mutex<HashMap<String, Task<()>>>,
}

impl Default for LocalChatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalChatStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::default(),
            revision: Arc::new(revision),
            timers: Mutex::new(HashMap::new()),
        }
    }

    pub fn select_conversation(&self, conversation_id: &str) {
        self.state.lock().active = Some(String::from(conversation_id));
        Self::bump(&self.revision);
    }

    pub fn active_conversation(&self) -> Option<String> {
        self.state.lock().active.clone()
    }

    pub fn add_message(&self, conversation_id: &str, sender: &Participant, body: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let message = ChatMessage {
            id: id.clone(),
            body: String::from(body),
            sender: sender.display_name(),
            sent_at: Utc::now(),
            status: DeliveryStatus::Sending,
        };

        {
            let mut state = self.state.lock();
            state
                .message_index
                .insert(id.clone(), String::from(conversation_id));
            state
                .conversations
                .entry(String::from(conversation_id))
                .or_default()
                .push(message);
        }
        Self::bump(&self.revision);

        let timer = Task::spawn(Self::simulate_delivery(
            Arc::clone(&self.state),
            Arc::clone(&self.revision),
            id.clone(),
            Instant::now(),
        ));

        let mut timers = self.timers.lock();
        timers.retain(|_, timer| !timer.is_finished());
        timers.insert(id.clone(), timer);

        id
    }

    async fn simulate_delivery(
        state: Arc<Mutex<ChatState>>,
        revision: Arc<watch::Sender<u64>>,
        id: String,
        created: Instant,
    ) {
        for status in [DeliveryStatus::Sent, DeliveryStatus::Delivered] {
            let due = match status {
                DeliveryStatus::Sent => DeliveryStatus::SENT_AFTER,
                _ => DeliveryStatus::DELIVERED_AFTER,
            };
            tokio::time::sleep_until(created + due).await;

            if state.lock().advance(&id, status) {
                trace!(%id, ?status, "simulated delivery step");
                Self::bump(&revision);
            }
        }
    }

    /// Manually moves a message forward. Returns `false` for unknown ids or
    /// when `status` is not ahead of the current one.
    pub fn update_status(&self, id: &str, status: DeliveryStatus) -> bool {
        let advanced = self.state.lock().advance(id, status);
        if advanced {
            if status == DeliveryStatus::Delivered
                && let Some(timer) = self.timers.lock().remove(id)
            {
                timer.cancel();
            }
            Self::bump(&self.revision);
        }
        advanced
    }

    pub fn messages(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.state
            .lock()
            .conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn message(&self, id: &str) -> Option<ChatMessage> {
        self.state.lock().message_mut(id).map(|message| message.clone())
    }

    /// Ticks on every change to the store.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(revision: &watch::Sender<u64>) {
        revision.send_modify(|revision| *revision += 1);
    }
}
