//! Subscriber management
//!
//! A `Subscriber` is a callback with an identity. Clones share the identity,
//! so registering a clone of an already registered subscriber is a no-op,
//! and unsubscribing any clone removes the entry.
//!
//! `SubscriberSet` keeps subscription order; `publish` notifies in that order.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use uuid::Uuid;

pub type SubscriberId = Uuid;

type Callback<M> = Arc<dyn Fn(&M) + Send + Sync>;

pub struct Subscriber<M> {
    id: SubscriberId,
    callback: Callback<M>,
}

impl<M> Subscriber<M> {
    /// Wrap `callback` in a new subscriber with a fresh identity.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        Self::with_id(Uuid::new_v4(), callback)
    }

    pub(crate) fn with_id<F>(id: SubscriberId, callback: F) -> Self
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        Self {
            id,
            callback: Arc::new(callback),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn notify(&self, message: &M) {
        (self.callback)(message)
    }
}

impl<M> Clone for Subscriber<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<M> PartialEq for Subscriber<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<M> Eq for Subscriber<M> {}

impl<M> Hash for Subscriber<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<M> fmt::Debug for Subscriber<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

/// Insertion-ordered set of subscribers keyed by identity.
pub(crate) struct SubscriberSet<M> {
    entries: Vec<Subscriber<M>>,
}

impl<M> Default for SubscriberSet<M> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<M> SubscriberSet<M> {
    /// Add a subscriber. Returns `false` if it was already present.
    pub fn insert(&mut self, subscriber: Subscriber<M>) -> bool {
        if self.contains(subscriber.id) {
            return false;
        }
        self.entries.push(subscriber);
        true
    }

    /// Remove a subscriber. Returns `false` if it was not present.
    pub fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.id != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.entries.iter().any(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Copy of the current membership, for notifying without holding a lock.
    pub fn snapshot(&self) -> Vec<Subscriber<M>> {
        self.entries.clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
