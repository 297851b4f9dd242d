use crate::domain::CopyProgress;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const COPY_PROGRESS_EVENT: &str = "copy-progress";

pub type ProgressBus = EventBus<CopyProgress>;

struct Listeners<T> {
    next_id: u64,
    by_name: HashMap<String, Vec<(u64, UnboundedSender<T>)>>,
}

pub struct EventBus<T> {
    inner: Arc<Mutex<Listeners<T>>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                by_name: HashMap::new(),
            })),
        }
    }
}

impl<T: Clone> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, name: &str) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut listeners = self.listeners();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners
            .by_name
            .entry(name.to_string())
            .or_default()
            .push((id, tx));
        tracing::debug!(event = name, id, "subscribed");
        Subscription {
            bus: self.clone(),
            name: name.to_string(),
            id,
            rx,
        }
    }

    pub fn emit(&self, name: &str, payload: T) -> usize {
        let mut listeners = self.listeners();
        let Some(senders) = listeners.by_name.get_mut(name) else {
            return 0;
        };
        senders.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        senders.len()
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        self.listeners().by_name.get(name).map_or(0, Vec::len)
    }

    fn unsubscribe(&self, name: &str, id: u64) {
        let mut listeners = self.listeners();
        if let Some(senders) = listeners.by_name.get_mut(name) {
            senders.retain(|(sid, _)| *sid != id);
            if senders.is_empty() {
                listeners.by_name.remove(name);
            }
        }
        tracing::debug!(event = name, id, "unsubscribed");
    }
}

/// A live listener on one named channel. Dropping it unsubscribes.
pub struct Subscription<T: Clone> {
    bus: EventBus<T>,
    name: String,
    id: u64,
    rx: UnboundedReceiver<T>,
}

impl<T: Clone> Subscription<T> {
    pub fn latest(&mut self) -> Option<T> {
        let mut last = None;
        while let Ok(payload) = self.rx.try_recv() {
            last = Some(payload);
        }
        last
    }
}

impl<T: Clone> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish()
    }
}

impl<T: Clone> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.name, self.id);
    }
}
