use std::fmt;

type Cancel = Box<dyn FnOnce() + Send + Sync>;
type Alive = Box<dyn Fn() -> bool + Send + Sync>;

/// Keeps an observer registered. Dropping it (or calling
/// [`Subscription::unsubscribe`]) removes the observer.
#[must_use = "dropping a Subscription immediately removes the observer"]
pub struct Subscription {
    cancel: Option<Cancel>,
    alive: Option<Alive>,
}

impl Subscription {
    pub(crate) fn from_fn(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
            alive: None,
        }
    }

    /// Consider the subscription finished once `alive` returns `false`,
    /// e.g. because the observed value was dropped.
    pub(crate) fn while_alive(mut self, alive: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.alive = Some(Box::new(alive));
        self
    }

    /// Whether the observer is still registered somewhere.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some() && self.alive.as_ref().map_or(true, |alive| alive())
    }

    /// Remove the observer now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
