//! Typed observer registry.
//!
//! A component whose state changes owns an [`Observers`] list for its event
//! type and publishes to it directly. There is no global bus.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::warn;

/// Receives events of type `E`.
///
/// Called synchronously on the publishing task; implementations should hand
/// off anything slow.
pub trait Observer<E>: Send + Sync {
    fn on_event(&self, event: &E);
}

impl<E, F> Observer<E> for F
where
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        self(event);
    }
}

/// Handle returned by [`Observers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Entry<E> = (SubscriptionId, Arc<dyn Observer<E>>);

/// Ordered list of observers for one event type.
pub struct Observers<E> {
    next_id: AtomicU64,
    entries: RwLock<Vec<Entry<E>>>,
}

impl<E> Observers<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Registers an observer; events are delivered in subscription order.
    pub fn subscribe(&self, observer: Arc<dyn Observer<E>>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.entries.write() {
            Ok(mut entries) => entries.push((id, observer)),
            Err(poisoned) => poisoned.into_inner().push((id, observer)),
        }
        id
    }

    /// Removes an observer. Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Delivers `event` to every current observer.
    pub fn publish(&self, event: &E) {
        // Snapshot first so observers may (un)subscribe while being notified.
        let snapshot: Vec<Arc<dyn Observer<E>>> = match self.entries.read() {
            Ok(entries) => entries.iter().map(|(_, o)| Arc::clone(o)).collect(),
            Err(poisoned) => {
                warn!("observer list lock poisoned; delivering to recovered list");
                poisoned
                    .into_inner()
                    .iter()
                    .map(|(_, o)| Arc::clone(o))
                    .collect()
            }
        };
        for observer in snapshot {
            observer.on_event(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_publish_reaches_subscribers_in_order() {
        let observers: Observers<u32> = Observers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        observers.subscribe(Arc::new(move |event: &u32| {
            first.lock().unwrap().push(("first", *event));
        }));
        let second = Arc::clone(&seen);
        observers.subscribe(Arc::new(move |event: &u32| {
            second.lock().unwrap().push(("second", *event));
        }));

        observers.publish(&7);

        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let observers: Observers<u32> = Observers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = observers.subscribe(Arc::new(move |event: &u32| {
            sink.lock().unwrap().push(*event);
        }));

        observers.publish(&1);
        assert!(observers.unsubscribe(id));
        observers.publish(&2);

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert!(observers.is_empty());
    }

    #[test]
    fn test_unsubscribe_unknown_id_returns_false() {
        let observers: Observers<u32> = Observers::new();
        let id = observers.subscribe(Arc::new(|_: &u32| {}));
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
    }
}
