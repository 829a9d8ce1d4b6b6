use std::sync::{Arc, Mutex};

use log::{debug, info};
use tokio::sync::watch;

use common::types::position::{FixSource, PositionFix, ProviderId};
use common::types::session::SessionState;

use crate::lifecycle::ManagedSession;
use crate::models::errors::AcquisitionError;
use crate::models::subscription::SubscriptionHandle;
use crate::ports::{FixCallback, LocationSource};

type FixOutcome = Result<PositionFix, AcquisitionError>;
type OutcomeSender = Arc<Mutex<Option<watch::Sender<Option<FixOutcome>>>>>;

struct LiveWait {
    handle: SubscriptionHandle,
    // Distinguishes this wait from earlier, already-cancelled ones; a stale
    // waiter must never tear down a newer wait's subscription.
    generation: u64,
    waiters: usize,
    tx: OutcomeSender,
    rx: watch::Receiver<Option<FixOutcome>>,
}

struct Inner {
    next_generation: u64,
    live: Option<LiveWait>,
}

/// Resolves a position fix through an ordered fallback chain: cached
/// satellite fix, else cached network fix, else a one-shot live
/// subscription to the satellite provider.
///
/// The live step holds at most one platform subscription; concurrent
/// `resolve` calls share it and all receive the first delivered fix. The
/// chain is never retried internally and no timeout is enforced here.
/// Bound a pending call with [`cancel`](PositionResolver::cancel), owner
/// suspension, or by dropping the future (e.g. under
/// `tokio::time::timeout`). All of those tear the live subscription down.
pub struct PositionResolver {
    source: Arc<dyn LocationSource>,
    inner: Mutex<Inner>,
}

impl PositionResolver {
    pub fn new(source: Arc<dyn LocationSource>) -> Arc<Self> {
        Arc::new(Self {
            source,
            inner: Mutex::new(Inner {
                next_generation: 0,
                live: None,
            }),
        })
    }

    /// Resolves one position fix, or fails with `NoFixAvailable` when the
    /// chain cannot produce one.
    pub async fn resolve(&self) -> FixOutcome {
        if let Some(fix) = self.cached_fix(ProviderId::Satellite)? {
            return Ok(fix);
        }
        if let Some(fix) = self.cached_fix(ProviderId::Network)? {
            return Ok(fix);
        }

        if !self.source.is_enabled(ProviderId::Satellite) {
            // Nothing left in the chain can ever fire.
            debug!("No cached fix and the satellite provider is disabled");
            return Err(AcquisitionError::NoFixAvailable);
        }

        let (mut rx, guard) = self.join_live_wait()?;
        loop {
            let outcome = rx.borrow().clone();
            if let Some(outcome) = outcome {
                // One-shot: the first waiter to observe the outcome drops
                // the subscription.
                self.finish_live(guard.generation);
                return outcome;
            }
            if rx.changed().await.is_err() {
                self.finish_live(guard.generation);
                return Err(AcquisitionError::NoFixAvailable);
            }
        }
    }

    /// Cancels the pending resolution, if any: the live subscription is torn
    /// down before this returns and every waiter fails with
    /// `NoFixAvailable`. A later `resolve` starts a fresh chain.
    pub fn cancel(&self) {
        let live = self.inner.lock().unwrap().live.take();
        if let Some(live) = live {
            self.source.unsubscribe(live.handle);
            if let Some(tx) = live.tx.lock().unwrap().take() {
                let _ = tx.send(Some(Err(AcquisitionError::NoFixAvailable)));
            }
            info!("Pending position resolution cancelled");
        }
    }

    /// Whether a live resolution is currently pending.
    pub fn is_pending(&self) -> bool {
        self.inner.lock().unwrap().live.is_some()
    }

    fn cached_fix(&self, provider: ProviderId) -> Result<Option<PositionFix>, AcquisitionError> {
        if !self.source.is_enabled(provider) {
            debug!("Provider {} disabled, skipping cache query", provider);
            return Ok(None);
        }
        let fix = self.source.last_known_fix(provider)?;
        if fix.is_some() {
            info!("Using cached fix from provider {}", provider);
        }
        Ok(fix.map(|fix| fix.tagged(FixSource::Cached)))
    }

    /// Joins the shared live wait, creating the subscription if this is the
    /// first waiter.
    fn join_live_wait(
        &self,
    ) -> Result<(watch::Receiver<Option<FixOutcome>>, WaiterGuard<'_>), AcquisitionError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(live) = inner.live.as_mut() {
            live.waiters += 1;
            let rx = live.rx.clone();
            let generation = live.generation;
            return Ok((
                rx,
                WaiterGuard {
                    resolver: self,
                    generation,
                },
            ));
        }

        let (tx, rx) = watch::channel::<Option<FixOutcome>>(None);
        let tx: OutcomeSender = Arc::new(Mutex::new(Some(tx)));

        // The callback only touches the sender slot, never the resolver
        // state, so it is safe to install while the state lock is held.
        let on_fix: FixCallback = {
            let tx = Arc::clone(&tx);
            Arc::new(move |fix: PositionFix| {
                // One-shot: only the first event takes the sender.
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(Some(Ok(fix.tagged(FixSource::Live))));
                }
            })
        };

        info!("No cached fix available, subscribing live");
        let handle = self.source.subscribe_live(ProviderId::Satellite, on_fix)?;

        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.live = Some(LiveWait {
            handle,
            generation,
            waiters: 1,
            tx,
            rx: rx.clone(),
        });
        Ok((
            rx,
            WaiterGuard {
                resolver: self,
                generation,
            },
        ))
    }

    // Unsubscribes after the first delivered fix. Only touches the wait the
    // caller joined; a newer wait installed in the meantime is left alone.
    fn finish_live(&self, generation: u64) {
        let live = {
            let mut inner = self.inner.lock().unwrap();
            let matches = inner
                .live
                .as_ref()
                .is_some_and(|live| live.generation == generation);
            if matches {
                inner.live.take()
            } else {
                None
            }
        };
        if let Some(live) = live {
            self.source.unsubscribe(live.handle);
        }
    }
}

impl ManagedSession for PositionResolver {
    fn stop(&self) {
        self.cancel();
    }

    fn state(&self) -> SessionState {
        if self.is_pending() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }
}

/// Releases one waiter's interest in the live wait it joined; the last
/// waiter to leave without an outcome tears the subscription down. Waits
/// from other generations are never touched.
struct WaiterGuard<'a> {
    resolver: &'a PositionResolver,
    generation: u64,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        let live = {
            let mut inner = self.resolver.inner.lock().unwrap();
            let abandoned = match inner.live.as_mut() {
                Some(live) if live.generation == self.generation => {
                    live.waiters -= 1;
                    live.waiters == 0
                }
                _ => false,
            };
            if abandoned {
                inner.live.take()
            } else {
                None
            }
        };
        if let Some(live) = live {
            debug!("Last waiter abandoned position resolution, unsubscribing");
            self.resolver.source.unsubscribe(live.handle);
            live.tx.lock().unwrap().take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockLocationSource;
    use std::future::{poll_fn, Future};
    use std::pin::Pin;
    use std::task::Poll;
    use std::time::Duration;
    use tokio::time::timeout;

    // Polls the future exactly once, asserting it is still pending.
    async fn poll_pending(future: &mut Pin<Box<impl Future<Output = FixOutcome>>>) {
        poll_fn(|cx| {
            assert!(future.as_mut().poll(cx).is_pending());
            Poll::Ready(())
        })
        .await;
    }

    async fn wait_for_live(source: &MockLocationSource) {
        timeout(Duration::from_secs(1), async {
            while source.active_live() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("live subscription never appeared");
    }

    #[tokio::test]
    async fn test_cached_satellite_fix_short_circuits() {
        let source = Arc::new(MockLocationSource::new());
        source.set_cached_fix(
            ProviderId::Satellite,
            PositionFix::new(52.52, 13.405, ProviderId::Satellite, FixSource::Cached),
        );
        let resolver = PositionResolver::new(source.clone());

        let fix = resolver.resolve().await.unwrap();
        assert_eq!(fix.source, FixSource::Cached);
        assert_eq!(fix.provider, ProviderId::Satellite);
        // No live subscription was ever created.
        assert_eq!(source.live_subscribe_calls(), 0);
    }

    #[tokio::test]
    async fn test_network_cache_is_second_in_chain() {
        let source = Arc::new(MockLocationSource::new());
        source.set_cached_fix(
            ProviderId::Network,
            PositionFix::new(48.85, 2.35, ProviderId::Network, FixSource::Cached),
        );
        let resolver = PositionResolver::new(source.clone());

        let fix = resolver.resolve().await.unwrap();
        assert_eq!(fix.provider, ProviderId::Network);
        assert_eq!(fix.source, FixSource::Cached);
        assert_eq!(source.live_subscribe_calls(), 0);
    }

    #[tokio::test]
    async fn test_live_fallback_is_one_shot() {
        let source = Arc::new(MockLocationSource::new());
        let resolver = PositionResolver::new(source.clone());

        let task = tokio::spawn({
            let resolver = Arc::clone(&resolver);
            async move { resolver.resolve().await }
        });
        wait_for_live(&source).await;

        source.emit_fix(PositionFix::new(59.33, 18.07, ProviderId::Satellite, FixSource::Live));
        let fix = task.await.unwrap().unwrap();
        assert_eq!(fix.source, FixSource::Live);
        assert_eq!(fix.latitude, 59.33);

        // Unsubscribed immediately after the first event.
        assert_eq!(source.live_subscribe_calls(), 1);
        assert_eq!(source.active_live(), 0);

        // A second event from the same source goes nowhere.
        source.emit_fix(PositionFix::new(0.0, 0.0, ProviderId::Satellite, FixSource::Live));
        assert!(!resolver.is_pending());
    }

    #[tokio::test]
    async fn test_cancel_tears_down_live_subscription() {
        let source = Arc::new(MockLocationSource::new());
        let resolver = PositionResolver::new(source.clone());

        let task = tokio::spawn({
            let resolver = Arc::clone(&resolver);
            async move { resolver.resolve().await }
        });
        wait_for_live(&source).await;

        resolver.cancel();
        assert_eq!(source.active_live(), 0);
        assert_eq!(task.await.unwrap(), Err(AcquisitionError::NoFixAvailable));
    }

    #[tokio::test]
    async fn test_abandoned_resolution_unsubscribes() {
        let source = Arc::new(MockLocationSource::new());
        let resolver = PositionResolver::new(source.clone());

        let pending = {
            let resolver = Arc::clone(&resolver);
            timeout(Duration::from_millis(50), async move { resolver.resolve().await })
        };
        assert!(pending.await.is_err());

        // Dropping the timed-out future released the last waiter.
        assert_eq!(source.active_live(), 0);
        assert!(!resolver.is_pending());
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_subscription() {
        let source = Arc::new(MockLocationSource::new());
        let resolver = PositionResolver::new(source.clone());

        let first = tokio::spawn({
            let resolver = Arc::clone(&resolver);
            async move { resolver.resolve().await }
        });
        let second = tokio::spawn({
            let resolver = Arc::clone(&resolver);
            async move { resolver.resolve().await }
        });
        wait_for_live(&source).await;
        // Give the second task a chance to join the shared wait.
        tokio::time::sleep(Duration::from_millis(20)).await;

        source.emit_fix(PositionFix::new(40.41, -3.70, ProviderId::Satellite, FixSource::Live));

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(source.live_subscribe_calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled_providers_exhaust_the_chain() {
        let source = Arc::new(MockLocationSource::new());
        source.set_enabled(ProviderId::Satellite, false);
        source.set_enabled(ProviderId::Network, false);
        let resolver = PositionResolver::new(source.clone());

        let result = resolver.resolve().await;
        assert_eq!(result, Err(AcquisitionError::NoFixAvailable));
        assert_eq!(source.live_subscribe_calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_is_surfaced() {
        let source = Arc::new(MockLocationSource::new());
        source.fail_cache_queries("provider io error");
        let resolver = PositionResolver::new(source);

        let result = resolver.resolve().await;
        assert_eq!(
            result,
            Err(AcquisitionError::ProviderAccess("provider io error".to_string()))
        );
    }

    #[tokio::test]
    async fn test_cancelled_waiter_spares_next_resolution() {
        let source = Arc::new(MockLocationSource::new());
        let resolver = PositionResolver::new(source.clone());

        let mut first = Box::pin(resolver.resolve());
        poll_pending(&mut first).await;
        assert_eq!(source.active_live(), 1);

        resolver.cancel();
        assert_eq!(source.active_live(), 0);

        // A fresh resolution starts before the cancelled waiter resumes.
        let mut second = Box::pin(resolver.resolve());
        poll_pending(&mut second).await;
        assert_eq!(source.active_live(), 1);

        // The stale waiter completes now; the new subscription must survive.
        assert_eq!(first.await, Err(AcquisitionError::NoFixAvailable));
        assert_eq!(source.active_live(), 1);

        source.emit_fix(PositionFix::new(
            10.0,
            20.0,
            ProviderId::Satellite,
            FixSource::Live,
        ));
        let fix = second.await.unwrap();
        assert_eq!(fix.latitude, 10.0);
        assert_eq!(source.active_live(), 0);
    }

    #[tokio::test]
    async fn test_resolver_is_reusable_after_cancel() {
        let source = Arc::new(MockLocationSource::new());
        let resolver = PositionResolver::new(source.clone());

        let task = tokio::spawn({
            let resolver = Arc::clone(&resolver);
            async move { resolver.resolve().await }
        });
        wait_for_live(&source).await;
        resolver.cancel();
        assert!(task.await.unwrap().is_err());

        // A fresh chain can still resolve from cache.
        source.set_cached_fix(
            ProviderId::Satellite,
            PositionFix::new(1.0, 2.0, ProviderId::Satellite, FixSource::Cached),
        );
        assert!(resolver.resolve().await.is_ok());
    }
}
