use std::{collections::HashSet, sync::Arc};

use tokio::sync::watch;
use tracing::debug;

use crate::{
    client::RealtimeClient,
    protocol_objects::{Participant, Payload, PayloadKind},
    subscription::Subscription,
};

/// Last known presence snapshot. `online` and `offline` never share an id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PresenceSnapshot {
    pub online: Vec<Participant>,
    pub offline: Vec<Participant>,
}

impl PresenceSnapshot {
    /// Applies a presence push. Each snapshot replaces its list wholesale and
    /// evicts the same ids from the opposite list. Returns whether the
    /// payload was a presence event.
    pub fn apply(&mut self, payload: &Payload) -> bool {
        match payload {
            Payload::OnlineUsers(users) => {
                Self::replace(&mut self.online, &mut self.offline, users);
                true
            }
            Payload::OfflineUsers(users) => {
                Self::replace(&mut self.offline, &mut self.online, users);
                true
            }
            _ => false,
        }
    }

    fn replace(target: &mut Vec<Participant>, opposite: &mut Vec<Participant>, users: &[Participant]) {
        let ids: HashSet<&str> = users.iter().map(|user| user.id.as_str()).collect();
        opposite.retain(|participant| !ids.contains(participant.id.as_str()));
        *target = users.to_vec();
    }

    pub fn is_online(&self, participant_id: &str) -> bool {
        self.online.iter().any(|p| p.id == participant_id)
    }
}

/// Keeps the presence lists of one realtime client up to date.
///
/// Stops observing when dropped.
pub struct PresenceTracker {
    snapshot: Arc<watch::Sender<PresenceSnapshot>>,
    _subscriptions: [Subscription; 2],
}

impl PresenceTracker {
    pub fn attach(client: &RealtimeClient) -> Self {
        let (sender, _) = watch::channel(PresenceSnapshot::default());
        let snapshot = Arc::new(sender);

        let subscriptions = [PayloadKind::OnlineUsers, PayloadKind::OfflineUsers].map(|kind| {
            let snapshot = Arc::clone(&snapshot);
            client.on(kind, move |payload| {
                snapshot.send_modify(|state| {
                    state.apply(payload);
                });
                debug!(event = %kind, "presence snapshot replaced");
            })
        });

        Self {
            snapshot,
            _subscriptions: subscriptions,
        }
    }

    pub fn online(&self) -> Vec<Participant> {
        self.snapshot.borrow().online.clone()
    }

    pub fn offline(&self) -> Vec<Participant> {
        self.snapshot.borrow().offline.clone()
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<PresenceSnapshot> {
        self.snapshot.subscribe()
    }
}
