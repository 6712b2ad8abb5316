//! # Pending Operation Slot
//!
//! Holds the completion handle of a deferred method call while its external
//! flow is running. Each request token owns one slot: a second registration
//! for a token that is still pending is rejected, never overwritten.
//!
//! Both critical sections are single map operations. Registration goes through
//! the entry API, which holds the shard lock between the emptiness check and
//! the insert; consumption goes through `remove`/`remove_if`, so two
//! concurrent deliveries cannot both take the same handle.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::completion::CompletionHandle;

/// Correlation token echoed back by the host when a flow concludes
pub type RequestToken = i32;

/// A parked completion handle together with its correlation data
#[derive(Debug)]
pub struct PendingRegistration {
    registration_id: Uuid,
    token: RequestToken,
    handle: CompletionHandle,
    parked_at: Instant,
}

impl PendingRegistration {
    pub fn registration_id(&self) -> Uuid {
        self.registration_id
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn method(&self) -> &str {
        self.handle.method()
    }

    pub fn call_id(&self) -> Uuid {
        self.handle.call_id()
    }

    pub fn elapsed(&self) -> Duration {
        self.parked_at.elapsed()
    }

    /// Release the handle so it can be completed
    pub fn into_handle(self) -> CompletionHandle {
        self.handle
    }
}

/// Returned by [`PendingOperationSlot::set`] when the token is already taken.
/// The rejected handle is handed back so the caller can fail it.
pub struct SlotOccupied {
    pub token: RequestToken,
    pub handle: CompletionHandle,
}

impl fmt::Debug for SlotOccupied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotOccupied")
            .field("token", &self.token)
            .field("method", &self.handle.method())
            .finish()
    }
}

/// Snapshot of pending operations for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingMetrics {
    pub pending_count: usize,
    pub oldest_pending_age_ms: Option<u64>,
    pub oldest_token: Option<RequestToken>,
}

#[derive(Debug, Default)]
pub struct PendingOperationSlot {
    entries: DashMap<RequestToken, PendingRegistration>,
}

impl PendingOperationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `handle` under `token`; fails if the token already has a pending operation
    pub fn set(&self, token: RequestToken, handle: CompletionHandle) -> Result<Uuid, SlotOccupied> {
        match self.entries.entry(token) {
            Entry::Occupied(_) => Err(SlotOccupied { token, handle }),
            Entry::Vacant(vacant) => {
                let registration_id = Uuid::new_v4();
                vacant.insert(PendingRegistration {
                    registration_id,
                    token,
                    handle,
                    parked_at: Instant::now(),
                });
                Ok(registration_id)
            }
        }
    }

    /// Take the registration for `token`, leaving the slot empty.
    /// Returns `None` without touching state when nothing is parked under it.
    pub fn take_if_matches(&self, token: RequestToken) -> Option<PendingRegistration> {
        self.entries.remove(&token).map(|(_, registration)| registration)
    }

    /// Take a specific registration; a newer registration under the same token is left alone
    pub fn take_registration(
        &self,
        token: RequestToken,
        registration_id: Uuid,
    ) -> Option<PendingRegistration> {
        self.entries
            .remove_if(&token, |_, registration| {
                registration.registration_id == registration_id
            })
            .map(|(_, registration)| registration)
    }

    /// Take every registration parked for longer than `timeout`
    pub fn take_expired(&self, timeout: Duration) -> Vec<PendingRegistration> {
        let overdue: Vec<(RequestToken, Uuid)> = self
            .entries
            .iter()
            .filter(|entry| entry.value().elapsed() > timeout)
            .map(|entry| (*entry.key(), entry.value().registration_id))
            .collect();

        overdue
            .into_iter()
            .filter_map(|(token, id)| self.take_registration(token, id))
            .collect()
    }

    /// Take every registration
    pub fn drain(&self) -> Vec<PendingRegistration> {
        let tokens: Vec<RequestToken> = self.entries.iter().map(|entry| *entry.key()).collect();
        tokens
            .into_iter()
            .filter_map(|token| self.take_if_matches(token))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_pending(&self, token: RequestToken) -> bool {
        self.entries.contains_key(&token)
    }

    pub fn pending_tokens(&self) -> Vec<RequestToken> {
        let mut tokens: Vec<RequestToken> = self.entries.iter().map(|entry| *entry.key()).collect();
        tokens.sort_unstable();
        tokens
    }

    pub fn metrics(&self) -> PendingMetrics {
        let oldest = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().elapsed()))
            .max_by_key(|(_, age)| *age);

        PendingMetrics {
            pending_count: self.entries.len(),
            oldest_pending_age_ms: oldest.map(|(_, age)| age.as_millis() as u64),
            oldest_token: oldest.map(|(token, _)| token),
        }
    }
}
