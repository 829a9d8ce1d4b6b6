// Scripted platform fakes with subscription accounting, for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use common::types::capability::{Capability, DenialReason, PermissionDecision};
use common::types::channel::{ChannelDescriptor, ChannelId};
use common::types::position::{PositionFix, ProviderId};
use common::types::reading::Reading;

use crate::models::errors::AcquisitionError;
use crate::models::subscription::SubscriptionHandle;
use crate::ports::{
    ChannelSource, DecisionCallback, FixCallback, LocationSource, PermissionBackend,
    ReadingCallback,
};

/// Hardware channel fake: emits readings on demand and counts every
/// subscribe/unsubscribe call.
pub struct MockChannelSource {
    inventory: Vec<ChannelDescriptor>,
    inventory_delay: Mutex<Option<Duration>>,
    subscriptions: DashMap<SubscriptionHandle, (ChannelId, ReadingCallback)>,
    inventory_calls: AtomicUsize,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
}

impl MockChannelSource {
    pub fn new(inventory: Vec<ChannelDescriptor>) -> Self {
        Self {
            inventory,
            inventory_delay: Mutex::new(None),
            subscriptions: DashMap::new(),
            inventory_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            unsubscribe_calls: AtomicUsize::new(0),
        }
    }

    /// Makes every inventory query suspend for the given duration, to open
    /// race windows in tests.
    pub fn set_inventory_delay(&self, delay: Duration) {
        *self.inventory_delay.lock().unwrap() = Some(delay);
    }

    /// Delivers a reading to every subscription on the channel, in the
    /// caller's thread. Callbacks may unsubscribe from within.
    pub fn emit(&self, channel: ChannelId, timestamp: f64, values: Vec<f64>) {
        let reading = Reading::try_new(channel, timestamp, values).unwrap();
        let callbacks: Vec<ReadingCallback> = self
            .subscriptions
            .iter()
            .filter(|entry| entry.value().0 == channel)
            .map(|entry| Arc::clone(&entry.value().1))
            .collect();
        for on_reading in callbacks {
            on_reading(reading.clone());
        }
    }

    pub fn inventory_calls(&self) -> usize {
        self.inventory_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }
}

#[async_trait]
impl ChannelSource for MockChannelSource {
    async fn inventory(&self) -> Result<Vec<ChannelDescriptor>, AcquisitionError> {
        self.inventory_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inventory_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.inventory.clone())
    }

    fn subscribe(
        &self,
        channel: ChannelId,
        on_reading: ReadingCallback,
    ) -> Result<SubscriptionHandle, AcquisitionError> {
        let known = self
            .inventory
            .iter()
            .any(|descriptor| descriptor.id == channel && descriptor.available);
        if !known {
            return Err(AcquisitionError::ChannelUnavailable(channel));
        }
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let handle = SubscriptionHandle::new();
        self.subscriptions.insert(handle, (channel, on_reading));
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.subscriptions.remove(&handle).is_some() {
            self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Location provider fake with scripted caches and manual live delivery.
pub struct MockLocationSource {
    enabled: Mutex<HashMap<ProviderId, bool>>,
    cached: Mutex<HashMap<ProviderId, PositionFix>>,
    cache_error: Mutex<Option<String>>,
    live: DashMap<SubscriptionHandle, (ProviderId, FixCallback)>,
    live_subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
}

impl MockLocationSource {
    pub fn new() -> Self {
        Self {
            enabled: Mutex::new(HashMap::new()),
            cached: Mutex::new(HashMap::new()),
            cache_error: Mutex::new(None),
            live: DashMap::new(),
            live_subscribe_calls: AtomicUsize::new(0),
            unsubscribe_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_enabled(&self, provider: ProviderId, enabled: bool) {
        self.enabled.lock().unwrap().insert(provider, enabled);
    }

    pub fn set_cached_fix(&self, provider: ProviderId, fix: PositionFix) {
        self.cached.lock().unwrap().insert(provider, fix);
    }

    /// Makes every cache query fail with `ProviderAccess`.
    pub fn fail_cache_queries(&self, message: &str) {
        *self.cache_error.lock().unwrap() = Some(message.to_string());
    }

    /// Delivers a fix to every live subscription, in the caller's thread.
    /// Callbacks may unsubscribe from within.
    pub fn emit_fix(&self, fix: PositionFix) {
        let callbacks: Vec<FixCallback> = self
            .live
            .iter()
            .map(|entry| Arc::clone(&entry.value().1))
            .collect();
        for on_fix in callbacks {
            on_fix(fix.clone());
        }
    }

    pub fn live_subscribe_calls(&self) -> usize {
        self.live_subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn active_live(&self) -> usize {
        self.live.len()
    }
}

impl Default for MockLocationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationSource for MockLocationSource {
    fn is_enabled(&self, provider: ProviderId) -> bool {
        *self.enabled.lock().unwrap().get(&provider).unwrap_or(&true)
    }

    fn last_known_fix(
        &self,
        provider: ProviderId,
    ) -> Result<Option<PositionFix>, AcquisitionError> {
        if let Some(message) = self.cache_error.lock().unwrap().as_ref() {
            return Err(AcquisitionError::ProviderAccess(message.clone()));
        }
        Ok(self.cached.lock().unwrap().get(&provider).cloned())
    }

    fn subscribe_live(
        &self,
        provider: ProviderId,
        on_fix: FixCallback,
    ) -> Result<SubscriptionHandle, AcquisitionError> {
        self.live_subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let handle = SubscriptionHandle::new();
        self.live.insert(handle, (provider, on_fix));
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.live.remove(&handle).is_some() {
            self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// How the fake platform answers a consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptBehavior {
    GrantImmediately,
    DenyImmediately,
    /// No prompt can be presented.
    Unavailable,
    /// The prompt is dropped without an answer.
    DropPrompt,
    /// The prompt stays pending until `resolve_pending` is called.
    Defer,
}

/// Permission subsystem fake.
pub struct MockPermissionBackend {
    behavior: PromptBehavior,
    granted: Mutex<HashSet<Capability>>,
    prompt_calls: AtomicUsize,
    pending: Mutex<Vec<(Capability, DecisionCallback)>>,
}

impl MockPermissionBackend {
    pub fn new(behavior: PromptBehavior) -> Self {
        Self {
            behavior,
            granted: Mutex::new(HashSet::new()),
            prompt_calls: AtomicUsize::new(0),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn set_granted(&self, capability: Capability, granted: bool) {
        let mut state = self.granted.lock().unwrap();
        if granted {
            state.insert(capability);
        } else {
            state.remove(&capability);
        }
    }

    pub fn prompt_calls(&self) -> usize {
        self.prompt_calls.load(Ordering::SeqCst)
    }

    pub fn pending_prompts(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Answers every deferred prompt with the given decision.
    pub fn resolve_pending(&self, decision: PermissionDecision) {
        let pending = std::mem::take(&mut *self.pending.lock().unwrap());
        for (capability, on_decision) in pending {
            if decision.is_granted() {
                self.granted.lock().unwrap().insert(capability);
            }
            on_decision(decision);
        }
    }
}

impl PermissionBackend for MockPermissionBackend {
    fn current_state(&self, capability: Capability) -> bool {
        self.granted.lock().unwrap().contains(&capability)
    }

    fn prompt_user(
        &self,
        capability: Capability,
        on_decision: DecisionCallback,
    ) -> Result<(), AcquisitionError> {
        self.prompt_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            PromptBehavior::GrantImmediately => {
                self.granted.lock().unwrap().insert(capability);
                on_decision(PermissionDecision::Granted);
                Ok(())
            }
            PromptBehavior::DenyImmediately => {
                on_decision(PermissionDecision::Denied(DenialReason::Declined));
                Ok(())
            }
            PromptBehavior::Unavailable => {
                Err(AcquisitionError::PromptUnavailable(capability))
            }
            PromptBehavior::DropPrompt => {
                drop(on_decision);
                Ok(())
            }
            PromptBehavior::Defer => {
                self.pending.lock().unwrap().push((capability, on_decision));
                Ok(())
            }
        }
    }
}
