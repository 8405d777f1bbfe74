//! Derived read-only values.

use super::observable::Observable;
use super::subscription::Subscription;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

/// A read-only value computed from an [`Observable`].
///
/// The value is recomputed synchronously whenever the source changes, and
/// observers of the `Computed` are only notified when the derived value
/// itself changes. Dropping every clone stops tracking the source.
///
/// # Example
///
/// ```rust
/// use modeler::reactive::Observable;
///
/// let count = Observable::new(0);
/// let is_empty = count.map(|n| *n == 0);
/// assert!(is_empty.get());
///
/// count.set(3);
/// assert!(!is_empty.get());
/// ```
pub struct Computed<T> {
    value: Observable<T>,
    source: Arc<Mutex<Option<Subscription>>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            source: Arc::clone(&self.source),
        }
    }
}

impl<T> Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Derive a value from `source` with `derive`.
    pub fn new<S, F>(source: &Observable<S>, derive: F) -> Self
    where
        S: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        let value = Observable::new(source.with(&derive));
        let target = value.clone();
        let subscription = source.subscribe(move |current, _| {
            target.set(derive(current));
        });

        Self {
            value,
            source: Arc::new(Mutex::new(Some(subscription))),
        }
    }

    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Register `callback(new, old)` for changes of the derived value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.value.subscribe(callback)
    }

    pub fn changes(&self) -> watch::Receiver<T> {
        self.value.changes()
    }

    /// Derive a further value from this one.
    pub fn map<U, F>(&self, derive: F) -> Computed<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let mut derived = Computed::new(&self.value, derive);
        derived.upstream(Arc::clone(&self.source));
        derived
    }

    /// Stop following the source; the value freezes.
    pub fn detach(&self) {
        let subscription = self.source.lock().take();
        drop(subscription);
    }

    /// Whether the value still follows its source.
    pub fn is_tracking(&self) -> bool {
        self.source.lock().is_some()
    }

    /// Handle that detaches this value when dropped; used to tie a
    /// computed value to a [`Scope`](super::Scope).
    pub(crate) fn detach_handle(&self) -> Subscription {
        let source = Arc::downgrade(&self.source);
        let tracked = Weak::clone(&source);
        Subscription::from_fn(move || {
            if let Some(source) = source.upgrade() {
                let subscription = source.lock().take();
                drop(subscription);
            }
        })
        .while_alive(move || {
            tracked
                .upgrade()
                .map_or(false, |source| source.lock().is_some())
        })
    }

    // A chained value keeps its parent's subscription alive.
    fn upstream(&mut self, parent: Arc<Mutex<Option<Subscription>>>) {
        let own = self.source.lock().take();
        let chained = Subscription::from_fn(move || {
            drop(own);
            drop(parent);
        });
        self.source = Arc::new(Mutex::new(Some(chained)));
    }
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Shorthand for [`Computed::new`].
    pub fn map<U, F>(&self, derive: F) -> Computed<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Computed::new(self, derive)
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &self.value)
            .field("tracking", &self.source.lock().is_some())
            .finish()
    }
}
