use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    client::RealtimeClient,
    config::{ConnectionConfig, ReconnectPolicy},
    protocol_objects::{Notification, Payload, PayloadKind, Register},
    subscription::Subscription,
    types::Result,
};

type Listener = Arc<dyn Fn(&[Notification]) + Send + Sync>;

#[derive(Default)]
struct NotificationState {
    /// Newest first.
    items: Vec<Notification>,
    listeners: BTreeMap<u64, Listener>,
    next_listener_id: u64,
}

impl NotificationState {
    fn prepend(&mut self, notification: Notification) -> (Vec<Notification>, Vec<Listener>) {
        self.items.insert(0, notification);
        (self.items.clone(), self.listeners.values().cloned().collect())
    }
}

/// Inbound notifications on a connection of their own.
pub struct NotificationStream {
    client: RealtimeClient,
    state: Arc<Mutex<NotificationState>>,
    _binding: Subscription,
}

impl NotificationStream {
    /// Opens the dedicated notifications connection.
    pub async fn connect(address: &str) -> Result<Self> {
        Self::connect_with(address, ReconnectPolicy::default()).await
    }

    pub async fn connect_with(address: &str, reconnect: ReconnectPolicy) -> Result<Self> {
        let config = ConnectionConfig::unauthenticated(address)?;
        let mut client = RealtimeClient::new(config).with_reconnect_policy(reconnect);
        let state: Arc<Mutex<NotificationState>> = Arc::default();

        let state_clone = Arc::clone(&state);
        let binding = client.on(PayloadKind::Notification, move |payload| {
            let Payload::Notification(notification) = payload else {
                return;
            };
            debug!(category = %notification.category, "notification received");

            // Listeners run after the lock is released so they may subscribe or dispose.
            let (items, listeners) = state_clone.lock().prepend(notification.clone());
            for listener in listeners {
                listener(&items);
            }
        });

        client.connect().await?;

        Ok(Self {
            client,
            state,
            _binding: binding,
        })
    }

    /// Identifies this stream to the server. Repeated calls are sent as-is,
    /// and the latest registration is sent again after every reconnect.
    pub fn register(&self, user_id: &str) -> Result<()> {
        info!(%user_id, "registering for notifications");
        self.client.emit_retained(Payload::Register(Register {
            user_id: String::from(user_id),
        }))
    }

    /// Calls `listener` with the full newest-first list after every new
    /// notification, until the returned subscription is disposed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Notification]) + Send + Sync + 'static,
    {
        let id = {
            let mut state = self.state.lock();
            state.next_listener_id += 1;
            let id = state.next_listener_id;
            state.listeners.insert(id, Arc::new(listener));
            id
        };

        let state = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                state.lock().listeners.remove(&id);
            }
        })
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().items.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    pub fn client(&self) -> &RealtimeClient {
        &self.client
    }

    pub async fn close(self) -> Result<()> {
        self.client.close().await
    }
}
