//! # Continuation Router
//!
//! Second entry point of a deferred method call. The host calls
//! [`ContinuationRouter::on_flow_result`] (or [`ContinuationRouter::on_external_event`])
//! when an external flow concludes; the router takes the matching parked
//! handle out of the [`PendingOperationSlot`] and completes it exactly once.
//!
//! ```text
//! Idle ──park──→ Pending(token) ──event(token)──→ Completed-{Success|Cancelled|Failure}
//!                     │
//!                     └──deadline──→ Completed-Failure(Timeout)
//! ```
//!
//! Events for tokens that have nothing parked are logged and dropped. They
//! belong to a flow this bridge did not start, or they arrived after the
//! operation already finished, and completing anything for them would answer
//! the wrong caller.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::completion::CompletionHandle;
use super::pending_slot::{PendingOperationSlot, PendingRegistration, RequestToken, SlotOccupied};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::logging::log_continuation;
use crate::platform::FlowOutcome;

/// Identifies one parked operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParkedOperation {
    pub token: RequestToken,
    pub registration_id: Uuid,
}

/// What happened to an external event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A parked handle was completed
    Delivered,
    /// Nothing was completed
    Discarded(DiscardReason),
}

/// Why an external event was discarded.
///
/// Classified from one snapshot of the slot taken after the failed take; a
/// park racing with the event can still shift the label, never the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// No operation was pending at all
    NothingPending,
    /// Operations are pending, but none under this token
    TokenMismatch,
}

/// Counters for monitoring continuation health
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinuationStats {
    pub parked: u64,
    pub delivered: u64,
    pub discarded: u64,
    pub timed_out: u64,
    pub abandoned: u64,
    pub shut_down: u64,
}

#[derive(Debug, Default)]
struct Counters {
    parked: AtomicU64,
    delivered: AtomicU64,
    discarded: AtomicU64,
    timed_out: AtomicU64,
    abandoned: AtomicU64,
    shut_down: AtomicU64,
}

#[derive(Debug)]
pub struct ContinuationRouter {
    slot: Arc<PendingOperationSlot>,
    pending_timeout: Duration,
    spawn_deadline_tasks: bool,
    /// Deadline tasks still sleeping, by registration id
    deadlines: DashMap<Uuid, AbortHandle>,
    counters: Counters,
}

impl ContinuationRouter {
    pub fn new(slot: Arc<PendingOperationSlot>, config: &BridgeConfig) -> Self {
        Self {
            slot,
            pending_timeout: config.pending_timeout(),
            spawn_deadline_tasks: config.spawn_deadline_tasks,
            deadlines: DashMap::new(),
            counters: Counters::default(),
        }
    }

    pub fn slot(&self) -> &Arc<PendingOperationSlot> {
        &self.slot
    }

    pub fn pending_timeout(&self) -> Duration {
        self.pending_timeout
    }

    /// Park a handle under `token` and arm its deadline.
    ///
    /// On rejection the handle comes back untouched inside [`SlotOccupied`].
    pub fn park(
        self: &Arc<Self>,
        token: RequestToken,
        handle: CompletionHandle,
    ) -> Result<ParkedOperation, SlotOccupied> {
        let method = handle.method().to_string();
        let call_id = handle.call_id();
        let registration_id = self.slot.set(token, handle)?;
        self.counters.parked.fetch_add(1, Ordering::Relaxed);

        debug!(
            method = %method,
            call_id = %call_id,
            request_token = token,
            registration_id = %registration_id,
            "Operation parked awaiting external flow"
        );

        let parked = ParkedOperation {
            token,
            registration_id,
        };
        self.arm_deadline(parked);
        Ok(parked)
    }

    /// Withdraw a parked operation whose external flow never started and fail it
    pub fn abandon(&self, parked: ParkedOperation, error: BridgeError) -> bool {
        match self
            .slot
            .take_registration(parked.token, parked.registration_id)
        {
            Some(registration) => {
                self.counters.abandoned.fetch_add(1, Ordering::Relaxed);
                self.finish(registration, Err(error), "abandoned");
                true
            }
            None => {
                warn!(
                    request_token = parked.token,
                    registration_id = %parked.registration_id,
                    "Abandon requested for an operation that is no longer parked"
                );
                false
            }
        }
    }

    /// Host callback: `(request_token, result_code, payload)`
    pub fn on_flow_result(
        &self,
        token: RequestToken,
        result_code: i32,
        payload: Option<String>,
    ) -> Delivery {
        self.on_external_event(token, FlowOutcome::from_result_code(result_code, payload))
    }

    /// Complete the operation parked under `token` with `outcome`, if there is one
    pub fn on_external_event(&self, token: RequestToken, outcome: FlowOutcome) -> Delivery {
        let Some(registration) = self.slot.take_if_matches(token) else {
            let pending_tokens = self.slot.pending_tokens();
            let reason = if pending_tokens.is_empty() {
                DiscardReason::NothingPending
            } else {
                DiscardReason::TokenMismatch
            };
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            warn!(
                request_token = token,
                outcome = outcome.label(),
                reason = ?reason,
                pending_tokens = ?pending_tokens,
                "External event discarded - no matching pending operation"
            );
            return Delivery::Discarded(reason);
        };

        let label = outcome.label();
        let result = match outcome {
            FlowOutcome::Selected { resource } => Ok(serde_json::Value::String(resource)),
            FlowOutcome::Cancelled => Err(BridgeError::Cancelled),
            FlowOutcome::Failed { cause } => Err(BridgeError::SubsystemFailure { cause }),
        };

        self.counters.delivered.fetch_add(1, Ordering::Relaxed);
        self.finish(registration, result, label);
        Delivery::Delivered
    }

    /// Fail every operation parked for longer than the pending timeout.
    /// Returns how many were expired.
    pub fn expire_overdue(&self) -> usize {
        let expired = self.slot.take_expired(self.pending_timeout);
        let count = expired.len();
        for registration in expired {
            self.fail_with_timeout(registration);
        }
        count
    }

    /// Fail every parked operation; used when the host tears the bridge down
    pub fn shutdown(&self) -> usize {
        let drained = self.slot.drain();
        let count = drained.len();
        for registration in drained {
            self.counters.shut_down.fetch_add(1, Ordering::Relaxed);
            self.finish(
                registration,
                Err(BridgeError::subsystem("bridge shut down")),
                "shutdown",
            );
        }
        count
    }

    pub fn stats(&self) -> ContinuationStats {
        ContinuationStats {
            parked: self.counters.parked.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
            abandoned: self.counters.abandoned.load(Ordering::Relaxed),
            shut_down: self.counters.shut_down.load(Ordering::Relaxed),
        }
    }

    /// Deadline tasks that have not fired or been cancelled yet
    pub fn armed_deadlines(&self) -> usize {
        self.deadlines.len()
    }

    fn arm_deadline(self: &Arc<Self>, parked: ParkedOperation) {
        if !self.spawn_deadline_tasks {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(
                request_token = parked.token,
                registration_id = %parked.registration_id,
                "No tokio runtime - deadline relies on expire_overdue sweeps"
            );
            return;
        };

        let router: Weak<ContinuationRouter> = Arc::downgrade(self);
        let timeout = self.pending_timeout;
        let task = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(router) = router.upgrade() {
                router.deadlines.remove(&parked.registration_id);
                router.expire_registration(parked);
            }
        });

        self.deadlines
            .insert(parked.registration_id, task.abort_handle());
        // A task that already ran could not remove an entry that did not exist yet
        if task.is_finished() {
            self.deadlines.remove(&parked.registration_id);
        }
    }

    fn cancel_deadline(&self, registration_id: Uuid) {
        if let Some((_, task)) = self.deadlines.remove(&registration_id) {
            task.abort();
        }
    }

    fn expire_registration(&self, parked: ParkedOperation) {
        if let Some(registration) = self
            .slot
            .take_registration(parked.token, parked.registration_id)
        {
            self.fail_with_timeout(registration);
        }
    }

    fn fail_with_timeout(&self, registration: PendingRegistration) {
        self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
        let after_ms = self.pending_timeout.as_millis() as u64;
        error!(
            method = %registration.method(),
            call_id = %registration.call_id(),
            request_token = registration.token(),
            timeout_ms = after_ms,
            "Parked operation timed out without an external event"
        );
        self.finish(registration, Err(BridgeError::Timeout { after_ms }), "timeout");
    }

    fn finish(
        &self,
        registration: PendingRegistration,
        result: Result<serde_json::Value, BridgeError>,
        outcome: &str,
    ) {
        self.cancel_deadline(registration.registration_id());
        log_continuation(
            registration.method(),
            registration.token(),
            &registration.registration_id().to_string(),
            outcome,
            registration.elapsed().as_millis(),
        );
        registration.into_handle().complete(result);
    }
}
