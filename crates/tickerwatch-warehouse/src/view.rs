use std::sync::{Mutex, MutexGuard};

/// The value a screen is currently showing, guarded against out-of-order
/// loads.
///
/// Every load takes a [`Ticket`] with [`ViewState::begin`], which also clears
/// whatever was shown before. Starting another load, or
/// [`ViewState::cancel`]ling, invalidates all earlier tickets, and a commit or
/// failure reported with an invalidated ticket is dropped. Whatever finishes
/// last never wins; whatever started last does.
pub struct ViewState<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    generation: u64,
    shown: Shown<T>,
}

/// What the slot holds for the current ticket.
#[derive(Debug, Clone, PartialEq)]
pub enum Shown<T> {
    Loading,
    Ready(T),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl<T: Clone> ViewState<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                generation: 0,
                shown: Shown::Loading,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // a panicked writer leaves nothing half-written here
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn begin(&self) -> Ticket {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.shown = Shown::Loading;
        Ticket(inner.generation)
    }

    /// Invalidate any load in flight, e.g. when the screen is left.
    pub fn cancel(&self) {
        self.lock().generation += 1;
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.lock().generation == ticket.0
    }

    /// Store `value` if `ticket` is still current. Returns whether it was stored.
    pub fn commit(&self, ticket: &Ticket, value: T) -> bool {
        self.settle(ticket, Shown::Ready(value))
    }

    /// Record a terminal failure for `ticket`; nothing from an earlier load
    /// stays visible. Returns whether it was recorded.
    pub fn fail(&self, ticket: &Ticket, message: impl Into<String>) -> bool {
        self.settle(ticket, Shown::Failed(message.into()))
    }

    fn settle(&self, ticket: &Ticket, shown: Shown<T>) -> bool {
        let mut inner = self.lock();
        if inner.generation != ticket.0 {
            return false;
        }
        inner.shown = shown;
        true
    }

    pub fn shown(&self) -> Shown<T> {
        self.lock().shown.clone()
    }

    /// The loaded value, if the latest load succeeded.
    pub fn current(&self) -> Option<T> {
        match &self.lock().shown {
            Shown::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The failure message, if the latest load failed.
    pub fn error(&self) -> Option<String> {
        match &self.lock().shown {
            Shown::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }
}

impl<T: Clone> Default for ViewState<T> {
    fn default() -> Self {
        Self::new()
    }
}
