use super::subscription::Subscription;
use parking_lot::Mutex;
use std::fmt;

/// A group of subscriptions disposed together.
///
/// Every model owns one scope; observers a model registers on itself live
/// exactly as long as the scope.
pub struct Scope {
    subscriptions: Mutex<Option<Vec<Subscription>>>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Some(Vec::new())),
        }
    }

    /// Keep `subscription` alive until the scope is disposed. Once the
    /// scope is disposed, the subscription is dropped right away.
    /// Subscriptions that are no longer active are released on the way.
    pub fn keep(&self, subscription: Subscription) {
        let mut guard = self.subscriptions.lock();
        match guard.as_mut() {
            Some(subscriptions) => {
                subscriptions.retain(Subscription::is_active);
                subscriptions.push(subscription);
            }
            None => {
                drop(guard);
                drop(subscription);
            }
        }
    }

    /// Drop every subscription of the scope. Idempotent.
    pub fn dispose(&self) {
        let subscriptions = self.subscriptions.lock().take();
        drop(subscriptions);
    }

    pub fn is_disposed(&self) -> bool {
        self.subscriptions.lock().is_none()
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.lock().as_ref().map_or(0, |subscriptions| {
            subscriptions
                .iter()
                .filter(|subscription| subscription.is_active())
                .count()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("subscriptions", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
