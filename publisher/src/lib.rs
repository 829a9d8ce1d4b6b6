//! # Crate publisher
//!
//! ## publisher
//!
//! The `publisher` crate provides a mechanism for registering and notifying
//! observers of new events of type `T`.
//!
//! Observers are plain callbacks (`Fn(Arc<T>)`) registered under a `Uuid`.
//! Every registered observer receives each published event; delivery order
//! across observers is unspecified.
//!
//! ### Example
//!
//! ```
//! use std::sync::Arc;
//! use publisher::Publisher;
//!
//! let publisher = Publisher::new();
//!
//! // Register an observer
//! let observer_id = publisher.register(|data: Arc<String>| {
//!     println!("Observer received: {}", data);
//! });
//!
//! // Notify all observers
//! publisher.notify(Arc::new("Hello, World!".to_string()));
//!
//! // Unregister the observer
//! publisher.unregister(observer_id).expect("Failed to unregister observer");
//! assert!(publisher.is_empty());
//! ```

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(PartialEq, Clone, Debug)]
pub enum PublisherError {
    ObserverNotFound(String),
}

type Observer<T> = Box<dyn Fn(Arc<T>) + Send + Sync>;

/// Registry of observers notified of published events.
pub struct Publisher<T> {
    observers: DashMap<Uuid, Observer<T>>,
}

impl<T> Publisher<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a publisher with no registered observers.
    pub fn new() -> Self {
        Self {
            observers: DashMap::new(),
        }
    }

    /// Registers an observer callback and returns its id.
    pub fn register<F>(&self, observer: F) -> Uuid
    where
        F: Fn(Arc<T>) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.observers.insert(id, Box::new(observer));
        id
    }

    /// Unregisters the observer with the given id.
    /// Returns `PublisherError::ObserverNotFound` if no observer matches.
    pub fn unregister(&self, id: Uuid) -> Result<(), PublisherError> {
        self.observers.remove(&id).map(|_| ()).ok_or_else(|| {
            PublisherError::ObserverNotFound(format!("Observer with id {} not found", id))
        })
    }

    /// Removes every registered observer.
    pub fn unregister_all(&self) {
        self.observers.clear();
    }

    /// Calls each registered observer with the published event.
    pub fn notify(&self, event: Arc<T>) {
        for entry in self.observers.iter() {
            entry.value()(Arc::clone(&event));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }
}

impl<T> Default for Publisher<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::channel::ChannelId;
    use common::types::reading::Reading;
    use common::types::snapshot::Snapshot;
    use std::sync::Mutex;

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.update(Reading::try_new(ChannelId::Light, 0.5, vec![42.0]).unwrap());
        snapshot
    }

    #[test]
    fn test_publisher_initialization() {
        let publisher = Publisher::<Snapshot>::new();
        assert!(publisher.is_empty());
    }

    #[test]
    fn test_register_observer() {
        let publisher = Publisher::<Snapshot>::new();

        publisher.register(|snapshot: Arc<Snapshot>| {
            println!("Received snapshot: {:?}", snapshot);
        });
        assert_eq!(publisher.len(), 1);
    }

    #[test]
    fn test_unregister_observer() {
        let publisher = Publisher::<Snapshot>::new();

        let id1 = publisher.register(|_snapshot: Arc<Snapshot>| {});
        let id2 = publisher.register(|_snapshot: Arc<Snapshot>| {});
        assert_eq!(publisher.len(), 2);

        assert_eq!(publisher.unregister(id2), Ok(()));
        assert_eq!(publisher.len(), 1);
        assert_eq!(publisher.unregister(id1), Ok(()));
        assert_eq!(publisher.len(), 0);
        assert!(publisher.unregister(id1).is_err());
    }

    #[test]
    fn test_unregister_all() {
        let publisher = Publisher::<Snapshot>::new();
        publisher.register(|_snapshot: Arc<Snapshot>| {});
        publisher.register(|_snapshot: Arc<Snapshot>| {});

        publisher.unregister_all();
        assert!(publisher.is_empty());
    }

    #[test]
    fn test_notify_observers() {
        let publisher = Publisher::<Snapshot>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        {
            let received = Arc::clone(&received);
            publisher.register(move |snapshot: Arc<Snapshot>| {
                received.lock().unwrap().push((*snapshot).clone());
            });
        }

        publisher.notify(Arc::new(sample_snapshot()));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let latest = received[0].latest(ChannelId::Light).unwrap();
        assert_eq!(latest.values().as_slice(), &[42.0]);
    }

    #[test]
    fn test_notify_after_unregister_is_not_delivered() {
        let publisher = Publisher::<Snapshot>::new();
        let received = Arc::new(Mutex::new(0usize));

        let id = {
            let received = Arc::clone(&received);
            publisher.register(move |_snapshot: Arc<Snapshot>| {
                *received.lock().unwrap() += 1;
            })
        };

        publisher.notify(Arc::new(sample_snapshot()));
        publisher.unregister(id).unwrap();
        publisher.notify(Arc::new(sample_snapshot()));

        assert_eq!(*received.lock().unwrap(), 1);
    }
}
