//! Bounded cache of the most recently observed message records.
//!
//! The bridge needs the pre-revoke content of a message when a
//! revoke-for-everyone mutation arrives; the store only delivers the
//! post-revoke record at that point. Generic change mutations are
//! guaranteed to precede the type-specific revoke for the same edit, so the
//! last non-revoked record per identity is kept here, capacity-capped with
//! insertion-ordered eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::types::Message;

pub(crate) struct LastSeenMessageCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Message>,
    order: VecDeque<String>,
}

impl LastSeenMessageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Record the last known full content for a message identity.
    /// Last write wins; handlers arrive without mutual exclusion.
    pub fn store(&self, message: Message) {
        let key = message.id.serialized.clone();
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.entries.insert(key.clone(), message).is_none() {
            inner.order.push_back(key);
            while inner.order.len() > self.capacity {
                if let Some(evicted) = inner.order.pop_front() {
                    inner.entries.remove(&evicted);
                }
            }
        }
    }

    /// Last known content for an identity, if still cached.
    pub fn get(&self, serialized_id: &str) -> Option<Message> {
        let inner = self.inner.lock().ok()?;
        inner.entries.get(serialized_id).cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }
}
