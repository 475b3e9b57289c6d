//! Observer channels.
//!
//! Each channel keeps its own subscriber list. Every subscription carries an
//! [`OwnerToken`] so a host component can drop all of its listeners at once
//! when it is torn down.

use std::fmt;

/// Identifies the party that registered a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerToken(u64);

impl OwnerToken {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

pub type SubscriptionId = u32;

struct Subscription<T> {
    id: SubscriptionId,
    owner: OwnerToken,
    callback: Box<dyn FnMut(&T)>,
}

pub struct EventChannel<T> {
    next_id: SubscriptionId,
    subscribers: Vec<Subscription<T>>,
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            subscribers: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<T> EventChannel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        owner: OwnerToken,
        callback: impl FnMut(&T) + 'static,
    ) -> SubscriptionId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.subscribers.push(Subscription {
            id,
            owner,
            callback: Box::new(callback),
        });
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        if let Some(idx) = self.subscribers.iter().position(|s| s.id == id) {
            self.subscribers.remove(idx);
            true
        } else {
            false
        }
    }

    /// Drops every listener registered by `owner`, returning how many were removed.
    pub fn unsubscribe_owner(&mut self, owner: OwnerToken) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.owner != owner);
        before - self.subscribers.len()
    }

    pub fn emit(&mut self, payload: &T) {
        for sub in &mut self.subscribers {
            (sub.callback)(payload);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
