//! Explicit observer registry.
//!
//! Subscribers receive a [`SubscriptionToken`] and must hand it back through
//! [`ObserverRegistry::unsubscribe`]; nothing is released implicitly.

use std::collections::BTreeMap;

/// Handle returned by [`ObserverRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionToken(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

pub struct ObserverRegistry<E> {
    next_token: u64,
    callbacks: BTreeMap<SubscriptionToken, Callback<E>>,
}

impl<E> ObserverRegistry<E> {
    pub fn new() -> Self {
        Self {
            next_token: 0,
            callbacks: BTreeMap::new(),
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionToken
    where
        F: FnMut(&E) + Send + 'static,
    {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        self.callbacks.insert(token, Box::new(callback));
        token
    }

    /// Returns false when the token was unknown or already released.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.callbacks.remove(&token).is_some()
    }

    /// Deliver `event` to every subscriber in subscription order.
    pub fn notify(&mut self, event: &E) {
        for callback in self.callbacks.values_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<E> Default for ObserverRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
