use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    protocol_objects::{Message, Payload, PayloadKind},
    subscription::Subscription,
};

pub(crate) type EventHandler = Arc<dyn Fn(&Payload) + Send + Sync>;
pub(crate) type SharedDispatcher = Arc<Mutex<Dispatcher>>;

pub(crate) struct Binding {
    id: u64,
    callback: EventHandler,
}

/// Routes inbound frames to the handlers bound for their event kind.
#[derive(Default)]
pub(crate) struct Dispatcher {
    bindings: HashMap<PayloadKind, Vec<Binding>>,
    next_id: u64,
}

impl Dispatcher {
    pub(crate) fn register(&mut self, kind: PayloadKind, callback: EventHandler) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.bindings
            .entry(kind)
            .or_default()
            .push(Binding { id, callback });
        id
    }

    pub(crate) fn unregister(&mut self, kind: PayloadKind, id: u64) -> bool {
        let Some(bindings) = self.bindings.get_mut(&kind) else {
            return false;
        };
        let before = bindings.len();
        bindings.retain(|binding| binding.id != id);
        let removed = bindings.len() != before;
        if bindings.is_empty() {
            self.bindings.remove(&kind);
        }
        removed
    }

    fn handlers(&self, kind: PayloadKind) -> Vec<EventHandler> {
        self.bindings
            .get(&kind)
            .map(|bindings| bindings.iter().map(|b| Arc::clone(&b.callback)).collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn binding_count(&self, kind: PayloadKind) -> usize {
        self.bindings.get(&kind).map_or(0, Vec::len)
    }
}

pub(crate) fn bind(
    dispatcher: &SharedDispatcher,
    kind: PayloadKind,
    callback: EventHandler,
) -> Subscription {
    let id = dispatcher.lock().register(kind, callback);
    let weak: Weak<Mutex<Dispatcher>> = Arc::downgrade(dispatcher);

    Subscription::new(move || {
        if let Some(dispatcher) = weak.upgrade() {
            dispatcher.lock().unregister(kind, id);
        }
    })
}

/// Invokes every handler bound to the message's kind. Handlers run outside
/// the dispatcher lock, so they may bind or unbind freely.
pub(crate) fn dispatch(dispatcher: &SharedDispatcher, message: &Message) {
    let kind = message.payload.kind();
    let handlers = dispatcher.lock().handlers(kind);

    if handlers.is_empty() {
        debug!(event = %kind, "no handler bound, dropping event");
        return;
    }

    trace!(event = %kind, handlers = handlers.len(), "dispatching event");
    for handler in handlers {
        handler(&message.payload);
    }
}
