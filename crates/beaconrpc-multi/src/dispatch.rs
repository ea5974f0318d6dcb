//! Dispatcher — fans one logical call out to every eligible provider.
//!
//! ```text
//! eligible providers ──► one task each (bounded by max_parallelism)
//!                             │
//!            ┌────────────────┴────────────────┐
//!      no reconciler                     reconciler
//!   first success wins,            wait for all / deadline,
//!   losers cancelled               reconcile the successes
//! ```
//!
//! Every task settles its provider's health itself, so a health update
//! happens exactly once per completed outcome even when the dispatch has
//! already returned.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use beaconrpc_core::{BeaconProvider, Capability, ProviderError};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregate::FailureReport;
use crate::config::ClientConfig;
use crate::context::{deadline_after, CallContext};
use crate::error::MultiError;
use crate::reconcile::Reconciler;
use crate::registry::{ProviderHandle, ProviderRegistry};

/// Future returned by a dispatch call closure for one provider.
pub type CallFuture<V> = BoxFuture<'static, Result<V, ProviderError>>;

/// Terminal outcome of one provider within a dispatch.
#[derive(Debug)]
pub enum ProviderOutcome<V> {
    Succeeded(V),
    Failed(ProviderError),
    Cancelled,
}

/// Executes logical calls across the registry's providers.
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    permits: Arc<Semaphore>,
    request_timeout: Duration,
    grace: Duration,
}

enum Stop<V> {
    Won(V),
    Settled,
    Deadline,
    Cancelled,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProviderRegistry>, config: &ClientConfig) -> Self {
        Self {
            registry,
            permits: Arc::new(Semaphore::new(config.max_parallelism.max(1))),
            request_timeout: config.request_timeout(),
            grace: config.grace(),
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Run `call` against every provider eligible for `capability`.
    ///
    /// Without a reconciler the first success wins and the other calls are
    /// cancelled. With one, every provider is awaited (up to the deadline)
    /// and the successful values are reconciled in registration order.
    pub async fn dispatch<V, F>(
        &self,
        ctx: &CallContext,
        capability: Capability,
        reconciler: Option<&dyn Reconciler<V>>,
        call: F,
    ) -> Result<V, MultiError>
    where
        V: Send + 'static,
        F: Fn(Arc<dyn BeaconProvider>) -> CallFuture<V> + Send + Sync + 'static,
    {
        let eligible = self.registry.eligible(capability);
        if eligible.is_empty() {
            let inactive = self.registry.advertising(capability);
            tracing::warn!(%capability, inactive, "no eligible provider");
            return Err(MultiError::CapabilityUnavailable {
                capability,
                inactive,
            });
        }
        if ctx.is_cancelled() {
            for handle in &eligible {
                self.registry.release(handle);
            }
            return Err(MultiError::Cancelled);
        }

        let started = Instant::now();
        let deadline = ctx
            .deadline()
            .unwrap_or_else(|| deadline_after(started, self.request_timeout));
        let scope = ctx.cancellation_token().child_token();
        // Dropping the dispatch future cancels every provider task.
        let _guard = scope.clone().drop_guard();

        tracing::debug!(
            %capability,
            providers = eligible.len(),
            reconciled = reconciler.is_some(),
            "dispatching"
        );

        let call = Arc::new(call);
        let mut pending = FuturesUnordered::new();
        let mut aborts: Vec<AbortHandle> = Vec::with_capacity(eligible.len());
        for (pos, handle) in eligible.iter().enumerate() {
            let task = tokio::spawn(run_provider(
                Arc::clone(&self.registry),
                handle.clone(),
                capability,
                Arc::clone(&call),
                scope.clone(),
                Arc::clone(&self.permits),
            ));
            aborts.push(task.abort_handle());
            pending.push(task.map(move |joined| (pos, joined)));
        }

        let mut successes: Vec<(usize, V)> = Vec::new();
        let mut failures: Vec<(usize, ProviderError)> = Vec::new();
        let caller = ctx.cancellation_token();
        let expiry = tokio::time::sleep_until(deadline);
        tokio::pin!(expiry);

        let stop = loop {
            tokio::select! {
                biased;
                _ = caller.cancelled() => break Stop::Cancelled,
                next = pending.next() => match next {
                    None => break Stop::Settled,
                    Some((pos, joined)) => match into_outcome(joined) {
                        ProviderOutcome::Succeeded(value) => {
                            if reconciler.is_none() {
                                tracing::debug!(%capability, provider = %eligible[pos].id, "first success");
                                break Stop::Won(value);
                            }
                            successes.push((pos, value));
                        }
                        ProviderOutcome::Failed(err) => failures.push((pos, err)),
                        ProviderOutcome::Cancelled => failures.push((pos, ProviderError::Cancelled)),
                    },
                },
                _ = &mut expiry => break Stop::Deadline,
            }
        };

        if !pending.is_empty() {
            scope.cancel();
            // detached; the reaper outlives this call
            drop(reap(pending, aborts, self.grace));
        }

        match stop {
            Stop::Won(value) => Ok(value),
            Stop::Cancelled => {
                tracing::debug!(%capability, "dispatch cancelled by caller");
                Err(MultiError::Cancelled)
            }
            Stop::Deadline if successes.is_empty() || reconciler.is_none() => {
                let ms = deadline.saturating_duration_since(started).as_millis() as u64;
                tracing::warn!(%capability, ms, "dispatch deadline exceeded");
                Err(MultiError::DeadlineExceeded { ms })
            }
            Stop::Deadline | Stop::Settled => match reconciler {
                Some(reconciler) if !successes.is_empty() => {
                    successes.sort_by_key(|(pos, _)| *pos);
                    let responses = successes
                        .into_iter()
                        .map(|(pos, value)| (eligible[pos].id.clone(), value))
                        .collect();
                    reconciler
                        .reconcile(responses)
                        .map_err(MultiError::ConsensusMismatch)
                }
                _ => Err(all_failed(&eligible, failures)),
            },
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("available_permits", &self.permits.available_permits())
            .field("request_timeout", &self.request_timeout)
            .field("grace", &self.grace)
            .finish()
    }
}

fn all_failed(eligible: &[ProviderHandle], mut failures: Vec<(usize, ProviderError)>) -> MultiError {
    if !failures.is_empty() && failures.iter().all(|(_, e)| *e == ProviderError::Cancelled) {
        return MultiError::Cancelled;
    }
    failures.sort_by_key(|(pos, _)| *pos);
    let report: FailureReport = failures
        .into_iter()
        .map(|(pos, err)| (eligible[pos].id.clone(), err))
        .collect();
    tracing::warn!(failures = report.len(), %report, "all providers failed");
    MultiError::AllProvidersFailed(report)
}

/// Settles a provider's health exactly once; an unsettled drop (abort or
/// cancellation) only releases a claimed probe slot.
struct Settlement {
    registry: Arc<ProviderRegistry>,
    handle: ProviderHandle,
    settled: bool,
}

impl Settlement {
    fn settle<V>(mut self, outcome: &ProviderOutcome<V>) {
        match outcome {
            ProviderOutcome::Succeeded(_) => self.registry.report_success(&self.handle),
            ProviderOutcome::Failed(err) => self.registry.report_failure(&self.handle, err),
            ProviderOutcome::Cancelled => self.registry.release(&self.handle),
        }
        self.settled = true;
    }
}

impl Drop for Settlement {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.release(&self.handle);
        }
    }
}

async fn run_provider<V, F>(
    registry: Arc<ProviderRegistry>,
    handle: ProviderHandle,
    capability: Capability,
    call: Arc<F>,
    scope: CancellationToken,
    permits: Arc<Semaphore>,
) -> ProviderOutcome<V>
where
    V: Send + 'static,
    F: Fn(Arc<dyn BeaconProvider>) -> CallFuture<V> + Send + Sync + 'static,
{
    let settlement = Settlement {
        registry,
        handle: handle.clone(),
        settled: false,
    };

    let permit = tokio::select! {
        biased;
        _ = scope.cancelled() => None,
        permit = permits.acquire_owned() => permit.ok(),
    };
    let Some(_permit) = permit else {
        let outcome = ProviderOutcome::Cancelled;
        settlement.settle(&outcome);
        return outcome;
    };

    let provider = Arc::clone(&handle.provider);
    let attempt = AssertUnwindSafe(async move { (call.as_ref())(provider).await }).catch_unwind();
    let outcome = tokio::select! {
        biased;
        _ = scope.cancelled() => ProviderOutcome::Cancelled,
        result = attempt => match result {
            Ok(Ok(value)) => ProviderOutcome::Succeeded(value),
            Ok(Err(err)) => ProviderOutcome::Failed(err),
            Err(payload) => ProviderOutcome::Failed(ProviderError::Panicked(panic_message(payload))),
        },
    };

    if let ProviderOutcome::Failed(err) = &outcome {
        tracing::warn!(provider = %handle.id, %capability, error = %err, "provider call failed");
    }
    settlement.settle(&outcome);
    outcome
}

fn into_outcome<V>(joined: Result<ProviderOutcome<V>, tokio::task::JoinError>) -> ProviderOutcome<V> {
    match joined {
        Ok(outcome) => outcome,
        Err(err) if err.is_panic() => {
            ProviderOutcome::Failed(ProviderError::Panicked(panic_message(err.into_panic())))
        }
        Err(_) => ProviderOutcome::Cancelled,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Wait up to `grace` for cancelled tasks to wind down, then abort the rest.
///
/// The returned handle resolves to the number of tasks that had to be aborted.
fn reap<S>(mut pending: S, aborts: Vec<AbortHandle>, grace: Duration) -> JoinHandle<usize>
where
    S: Stream + Unpin + Send + 'static,
    S::Item: Send,
{
    tokio::spawn(async move {
        let drained = tokio::time::timeout(grace, async {
            while pending.next().await.is_some() {}
        })
        .await;
        if drained.is_ok() {
            return 0;
        }
        let stuck: Vec<_> = aborts.into_iter().filter(|h| !h.is_finished()).collect();
        tracing::debug!(tasks = stuck.len(), "provider tasks outlived grace period, aborting");
        for handle in &stuck {
            handle.abort();
        }
        stuck.len()
    })
}
