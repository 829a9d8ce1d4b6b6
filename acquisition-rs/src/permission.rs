use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info};
use tokio::sync::watch;

use common::types::capability::{Capability, DenialReason, PermissionDecision};

use crate::models::errors::AcquisitionError;
use crate::ports::PermissionBackend;

type PendingDecision = watch::Receiver<Option<PermissionDecision>>;

/// Tracks whether a capability is currently authorized and mediates
/// consent prompts.
///
/// Concurrent requests for the same capability are coalesced: the first
/// caller triggers exactly one platform prompt and every caller awaits the
/// same decision.
pub struct PermissionGate {
    backend: Arc<dyn PermissionBackend>,
    pending: Mutex<HashMap<Capability, PendingDecision>>,
}

impl PermissionGate {
    pub fn new(backend: Arc<dyn PermissionBackend>) -> Self {
        Self {
            backend,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Pure query of the platform-reported state; no side effect.
    pub fn is_granted(&self, capability: Capability) -> bool {
        self.backend.current_state(capability)
    }

    /// Prompts the user for the capability and waits for the decision.
    ///
    /// Resolves `Denied(PromptUnavailable)` when the platform cannot present
    /// a prompt, and `Denied(Superseded)` when the platform drops the prompt
    /// without answering.
    pub async fn request_and_await(
        &self,
        capability: Capability,
    ) -> Result<PermissionDecision, AcquisitionError> {
        let mut rx = match self.join_or_prompt(capability) {
            Ok(rx) => rx,
            Err(decision) => return Ok(decision),
        };

        let decision = loop {
            if let Some(decision) = *rx.borrow() {
                break decision;
            }
            if rx.changed().await.is_err() {
                // The backend dropped the decision callback without answering.
                break PermissionDecision::Denied(DenialReason::Superseded);
            }
        };

        // Drop the pending entry, unless a newer prompt already replaced it.
        {
            let mut pending = self.pending.lock().unwrap();
            if pending
                .get(&capability)
                .is_some_and(|rx| rx.borrow().is_some())
            {
                pending.remove(&capability);
            }
        }
        info!("Permission prompt for {:?} resolved: {:?}", capability, decision);
        Ok(decision)
    }

    /// Joins the pending prompt for the capability, issuing a new platform
    /// prompt only if none is in flight.
    fn join_or_prompt(&self, capability: Capability) -> Result<PendingDecision, PermissionDecision> {
        let mut pending = self.pending.lock().unwrap();

        if let Some(rx) = pending.get(&capability) {
            if rx.borrow().is_none() {
                debug!("Coalescing permission request for {:?}", capability);
                return Ok(rx.clone());
            }
            // Stale entry from an already-resolved prompt.
            pending.remove(&capability);
        }

        let (tx, rx) = watch::channel::<Option<PermissionDecision>>(None);
        let on_decision = move |decision: PermissionDecision| {
            let _ = tx.send(Some(decision));
        };
        if let Err(e) = self.backend.prompt_user(capability, Box::new(on_decision)) {
            debug!("Prompt unavailable for {:?}: {:?}", capability, e);
            return Err(PermissionDecision::Denied(DenialReason::PromptUnavailable));
        }
        pending.insert(capability, rx.clone());
        Ok(rx)
    }
}
