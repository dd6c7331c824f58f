use std::panic::{AssertUnwindSafe, catch_unwind};

/// Error a listener returns to signal it could not handle an event.
#[derive(Debug, thiserror::Error)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub type ListenerResult = Result<(), ListenerError>;

/// Handle returned by [`ListenerSet::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Box<dyn FnMut(&E) -> ListenerResult>;

/// Observer list with synchronous dispatch and a per-listener error boundary.
///
/// A listener that returns an error or panics is logged and skipped; the
/// remaining listeners still run and the caller's frame continues.
pub struct ListenerSet<E> {
    listeners: Vec<(ListenerId, Listener<E>)>,
    next_id: u64,
    failures: u64,
}

impl<E> ListenerSet<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
            failures: 0,
        }
    }

    /// Register a listener. Listeners run in subscription order.
    pub fn subscribe(&mut self, listener: impl FnMut(&E) -> ListenerResult + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener in subscription order.
    /// Returns the number of listeners that failed.
    pub fn emit(&mut self, event: &E) -> usize {
        let mut failed = 0;
        for (id, listener) in self.listeners.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(listener = id.0, %err, "listener returned an error");
                    failed += 1;
                }
                Err(_) => {
                    tracing::warn!(listener = id.0, "listener panicked");
                    failed += 1;
                }
            }
        }
        self.failures += failed as u64;
        failed
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Total listener failures since construction.
    pub fn failure_count(&self) -> u64 {
        self.failures
    }
}

impl<E> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.listeners.len())
            .field("failures", &self.failures)
            .finish()
    }
}
