//! Observable cells with synchronous change callbacks.

use super::subscription::Subscription;
use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;

type Callback<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;

struct Shared<T> {
    sender: watch::Sender<T>,
    // Held across store and notify so writers never interleave.
    writer: ReentrantMutex<()>,
    observers: Mutex<Vec<(u64, Callback<T>)>>,
    next_observer: AtomicU64,
}

/// A mutable value that tells its observers when it changes.
///
/// Cloning an `Observable` yields another handle to the same cell.
/// Callbacks run synchronously inside [`Observable::set`], in subscription
/// order, and only when the new value differs from the old one. Writes are
/// serialized per cell: a write and its notifications finish before the
/// next writer starts, while a callback may write again on the same thread.
/// Async consumers can use [`Observable::changes`] instead.
///
/// # Example
///
/// ```rust
/// use modeler::reactive::Observable;
/// use std::sync::{Arc, Mutex};
///
/// let cell = Observable::new(1);
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let _subscription = cell.subscribe(move |new, old| sink.lock().unwrap().push((*old, *new)));
///
/// cell.set(2);
/// cell.set(2);
/// assert_eq!(*seen.lock().unwrap(), vec![(1, 2)]);
/// ```
pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        let (sender, _) = watch::channel(value);
        Self {
            shared: Arc::new(Shared {
                sender,
                writer: ReentrantMutex::new(()),
                observers: Mutex::new(Vec::new()),
                next_observer: AtomicU64::new(0),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.shared.sender.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        read(&self.shared.sender.borrow())
    }

    /// Store `value`, notifying observers if it differs from the current
    /// one. Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        let _writer = self.shared.writer.lock();
        self.store(value)
    }

    /// Modify a copy of the current value and store it. Concurrent updates
    /// of the same cell never lose each other's changes.
    pub fn update(&self, modify: impl FnOnce(&mut T)) -> bool {
        let _writer = self.shared.writer.lock();
        let mut value = self.get();
        modify(&mut value);
        self.store(value)
    }

    /// Register `callback(new, old)`; it runs after every change until the
    /// returned subscription is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let id = self.shared.next_observer.fetch_add(1, Ordering::Relaxed);
        self.shared.observers.lock().push((id, Arc::new(callback)));

        let shared: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        let cell = Weak::clone(&shared);
        Subscription::from_fn(move || {
            if let Some(shared) = shared.upgrade() {
                shared.observers.lock().retain(|(observer, _)| *observer != id);
            }
        })
        .while_alive(move || cell.strong_count() > 0)
    }

    /// Receiver that is marked changed on every update, for async code.
    pub fn changes(&self) -> watch::Receiver<T> {
        self.shared.sender.subscribe()
    }

    /// Number of registered callbacks.
    pub fn observer_count(&self) -> usize {
        self.shared.observers.lock().len()
    }

    /// Whether both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Observable<T>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // Caller holds the writer guard.
    fn store(&self, value: T) -> bool {
        let mut previous = None;
        self.shared.sender.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            previous = Some(std::mem::replace(current, value.clone()));
            true
        });

        match previous {
            Some(previous) => {
                self.notify(&value, &previous);
                true
            }
            None => false,
        }
    }

    fn notify(&self, current: &T, previous: &T) {
        // Snapshot so callbacks may subscribe or unsubscribe re-entrantly.
        let observers: Vec<Callback<T>> = self
            .shared
            .observers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in observers {
            callback(current, previous);
        }
    }
}

impl<T> fmt::Debug for Observable<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.shared.sender.borrow())
            .field("observers", &self.shared.observers.lock().len())
            .finish()
    }
}
