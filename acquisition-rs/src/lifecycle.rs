use std::sync::{Arc, Mutex, Weak};

use log::info;

use common::types::session::SessionState;

/// A bounded-lifetime acquisition session that an owner can tear down.
pub trait ManagedSession: Send + Sync {
    /// Tears down every subscription held by the session. Idempotent.
    fn stop(&self);

    fn state(&self) -> SessionState;
}

/// Binds acquisition sessions to an owning execution context.
///
/// The owner must call [`suspend`](SessionLifecycle::suspend) synchronously
/// before it is torn down; suspension stops every bound session so no
/// hardware subscription can outlive the owner. Re-activating the owner does
/// not restart stopped sessions.
pub struct SessionLifecycle {
    bound: Mutex<Vec<Weak<dyn ManagedSession>>>,
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self {
            bound: Mutex::new(Vec::new()),
        }
    }

    /// Binds a session to this owner's lifetime.
    pub fn bind<S>(&self, session: &Arc<S>)
    where
        S: ManagedSession + 'static,
    {
        let cloned: Arc<S> = Arc::clone(session);
        let session: Arc<dyn ManagedSession> = cloned;
        let weak = Arc::downgrade(&session);
        let mut bound = self.bound.lock().unwrap();
        bound.retain(|entry| entry.strong_count() > 0);
        bound.push(weak);
    }

    /// Stops every bound session. Runs synchronously: when this returns, no
    /// subscription created by a bound session is still registered.
    pub fn suspend(&self) {
        let sessions: Vec<Arc<dyn ManagedSession>> = {
            let mut bound = self.bound.lock().unwrap();
            bound.retain(|entry| entry.strong_count() > 0);
            bound.iter().filter_map(Weak::upgrade).collect()
        };
        for session in &sessions {
            session.stop();
        }
        info!("Owner suspended; stopped {} bound sessions", sessions.len());
    }

    /// Number of live bound sessions.
    pub fn bound_count(&self) -> usize {
        let mut bound = self.bound.lock().unwrap();
        bound.retain(|entry| entry.strong_count() > 0);
        bound.len()
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
