use std::cell::Cell;
use std::sync::{Arc, Mutex, Weak};

use log::{debug, info};
use publisher::Publisher;
use uuid::Uuid;

use common::types::channel::ChannelId;
use common::types::reading::Reading;
use common::types::session::SessionState;
use common::types::snapshot::Snapshot;

use crate::lifecycle::ManagedSession;
use crate::models::errors::AcquisitionError;
use crate::models::subscription::SubscriptionHandle;
use crate::ports::{ChannelSource, ReadingCallback};
use crate::registry::ChannelRegistry;

struct Inner {
    state: SessionState,
    snapshot: Snapshot,
    subscriptions: Vec<SubscriptionHandle>,
    channels: Vec<ChannelId>,
}

thread_local! {
    // Set while this thread is delivering a snapshot to observers, so an
    // observer that stops its own session does not wait on itself.
    static EMITTING: Cell<bool> = const { Cell::new(false) };
}

/// A sensor monitoring session.
///
/// `start` subscribes to the requested channels; every incoming reading
/// replaces that channel's entry in the session snapshot and the full
/// snapshot is emitted to registered observers. Ordering of events from one
/// channel is preserved; no ordering holds across channels. The session is
/// terminal: once stopped it cannot be restarted.
pub struct SensorSession {
    source: Arc<dyn ChannelSource>,
    registry: Arc<ChannelRegistry>,
    publisher: Publisher<Snapshot>,
    // Handed to subscription callbacks; a weak reference keeps a stale
    // platform callback from prolonging the session's lifetime.
    weak_self: Weak<SensorSession>,
    inner: Mutex<Inner>,
    // Held for the duration of each snapshot delivery. stop() takes it too,
    // so no snapshot can be observed after stop() returns, without holding
    // the state lock across observer callbacks.
    emission: Mutex<()>,
}

impl SensorSession {
    pub fn new(source: Arc<dyn ChannelSource>, registry: Arc<ChannelRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            source,
            registry,
            publisher: Publisher::new(),
            weak_self: weak_self.clone(),
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                snapshot: Snapshot::new(),
                subscriptions: Vec::new(),
                channels: Vec::new(),
            }),
            emission: Mutex::new(()),
        })
    }

    /// Registers an observer for merged snapshots. Observers can be added
    /// before or while the session is active, and may call back into the
    /// session (including `stop`) from inside the callback.
    pub fn register_observer<F>(&self, observer: F) -> Uuid
    where
        F: Fn(Arc<Snapshot>) + Send + Sync + 'static,
    {
        self.publisher.register(observer)
    }

    pub fn unregister_observer(&self, id: Uuid) {
        let _ = self.publisher.unregister(id);
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().unwrap().state
    }

    /// Channels actually subscribed by this session.
    pub fn subscribed_channels(&self) -> Vec<ChannelId> {
        self.inner.lock().unwrap().channels.clone()
    }

    /// Starts monitoring the requested channels.
    ///
    /// Unavailable channels are skipped silently; requesting a channel twice
    /// subscribes it once. Starting an already-active session is a no-op;
    /// starting a stopped session fails with `SessionTerminated`.
    pub async fn start(&self, channels: &[ChannelId]) -> Result<(), AcquisitionError> {
        {
            let inner = self.inner.lock().unwrap();
            match inner.state {
                SessionState::Stopped => return Err(AcquisitionError::SessionTerminated),
                SessionState::Active => return Ok(()),
                SessionState::Idle => {}
            }
        }

        let mut handles = Vec::new();
        let mut subscribed = Vec::new();
        for &channel in channels {
            if subscribed.contains(&channel) {
                continue;
            }
            if !self.registry.is_available(channel).await? {
                debug!("Skipping unavailable channel {}", channel);
                continue;
            }

            let weak = self.weak_self.clone();
            let on_reading: ReadingCallback = Arc::new(move |reading| {
                if let Some(session) = weak.upgrade() {
                    session.on_reading(reading);
                }
            });
            match self.source.subscribe(channel, on_reading) {
                Ok(handle) => {
                    handles.push(handle);
                    subscribed.push(channel);
                }
                Err(AcquisitionError::ChannelUnavailable(id)) => {
                    debug!("Channel {} reported unavailable on subscribe", id);
                }
                Err(e) => {
                    // Partial cleanup would leak listeners: roll back fully.
                    for handle in handles {
                        self.source.unsubscribe(handle);
                    }
                    return Err(e);
                }
            }
        }

        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            SessionState::Stopped => {
                // A concurrent stop landed while we were subscribing.
                for handle in handles {
                    self.source.unsubscribe(handle);
                }
                return Err(AcquisitionError::SessionTerminated);
            }
            SessionState::Active => {
                // A concurrent start won the race; ours rolls back.
                for handle in handles {
                    self.source.unsubscribe(handle);
                }
                return Ok(());
            }
            SessionState::Idle => {}
        }
        info!("Monitoring session started with {} channels", subscribed.len());
        inner.state = SessionState::Active;
        inner.subscriptions = handles;
        inner.channels = subscribed;
        Ok(())
    }

    fn on_reading(&self, reading: Reading) {
        let _emission = self.emission.lock().unwrap();
        let snapshot = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.state.is_active() || !inner.channels.contains(&reading.channel()) {
                return;
            }
            inner.snapshot.update(reading);
            Arc::new(inner.snapshot.clone())
        };
        EMITTING.with(|flag| flag.set(true));
        self.publisher.notify(snapshot);
        EMITTING.with(|flag| flag.set(false));
    }

    /// Stops the session and tears down every subscription. Idempotent;
    /// no snapshot is emitted once this returns.
    pub fn stop(&self) {
        // Wait out an in-flight emission, unless this call comes from one of
        // our own observer callbacks and the lock is already held above us.
        let _cutoff = if EMITTING.with(|flag| flag.get()) {
            None
        } else {
            Some(self.emission.lock().unwrap())
        };
        let handles = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == SessionState::Stopped {
                return;
            }
            inner.state = SessionState::Stopped;
            std::mem::take(&mut inner.subscriptions)
        };
        for handle in handles {
            self.source.unsubscribe(handle);
        }
        info!("Monitoring session stopped");
    }
}

impl ManagedSession for SensorSession {
    fn stop(&self) {
        SensorSession::stop(self);
    }

    fn state(&self) -> SessionState {
        SensorSession::state(self)
    }
}
