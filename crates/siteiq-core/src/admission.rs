//! Admission gate and active-query registry
//!
//! The gate is a fair counting semaphore: waiters are admitted in arrival
//! order, and a waiter leaves the queue without a permit when its deadline
//! passes or its cancellation token fires. Admitted queries are listed in the
//! registry until their [`Registration`] guard drops.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Result, SiteIqError};
use crate::query::{Priority, Query, QueryState};
use crate::types::{now, Timestamp};

/// Permit held for the whole time a query is processed; released on drop
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

/// Registry entry for an admitted query
#[derive(Debug, Clone)]
pub struct ActiveQuery {
    pub query: Query,
    pub state: QueryState,
    pub priority: Priority,
    pub admitted_at: Timestamp,
    pub cancel: CancellationToken,
}

/// Read-only view of an [`ActiveQuery`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveQuerySnapshot {
    pub query_id: Uuid,
    pub user_id: String,
    pub project_id: String,
    pub state: QueryState,
    pub priority: Priority,
    pub admitted_at: Timestamp,
}

impl From<&ActiveQuery> for ActiveQuerySnapshot {
    fn from(active: &ActiveQuery) -> Self {
        Self {
            query_id: active.query.id,
            user_id: active.query.user_id.clone(),
            project_id: active.query.project_id.clone(),
            state: active.state,
            priority: active.priority,
            admitted_at: active.admitted_at,
        }
    }
}

type Registry = Arc<DashMap<Uuid, ActiveQuery>>;

/// Removes its query from the registry when dropped
#[derive(Debug)]
pub struct Registration {
    registry: Registry,
    query_id: Uuid,
}

impl Registration {
    /// Mirror the query's lifecycle state into the registry
    pub fn set_state(&self, state: QueryState) {
        if let Some(mut entry) = self.registry.get_mut(&self.query_id) {
            entry.state = state;
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(&self.query_id);
    }
}

/// Bounded-concurrency gate for in-flight queries
#[derive(Debug)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    active: Registry,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            active: Arc::new(DashMap::new()),
        }
    }

    /// Wait for a permit until `deadline`, or until `cancel` fires
    pub async fn acquire(
        &self,
        query_id: Uuid,
        priority: Priority,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<AdmissionPermit> {
        let started = Instant::now();
        tracing::debug!(
            query_id = %query_id,
            priority = %priority,
            available = self.semaphore.available_permits(),
            "waiting for admission"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SiteIqError::Cancelled(query_id)),
            permit = self.semaphore.clone().acquire_owned() => permit
                .map(|permit| AdmissionPermit { _permit: permit })
                .map_err(|_| SiteIqError::Internal("admission gate closed".to_string())),
            _ = tokio::time::sleep_until(deadline) => {
                Err(SiteIqError::AdmissionTimeout(started.elapsed()))
            }
        }
    }

    /// List an admitted query; the entry lives as long as the returned guard
    pub fn register(&self, query: &Query, cancel: CancellationToken) -> Registration {
        self.active.insert(
            query.id,
            ActiveQuery {
                query: query.clone(),
                state: QueryState::MandatoryAnalysis,
                priority: query.priority,
                admitted_at: now(),
                cancel,
            },
        );
        Registration {
            registry: Arc::clone(&self.active),
            query_id: query.id,
        }
    }

    /// Fire the cancellation token of an admitted query
    pub fn cancel(&self, query_id: Uuid) -> bool {
        match self.active.get(&query_id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Admitted queries, oldest first
    pub fn active_queries(&self) -> Vec<ActiveQuerySnapshot> {
        let mut snapshots: Vec<ActiveQuerySnapshot> = self
            .active
            .iter()
            .map(|entry| ActiveQuerySnapshot::from(entry.value()))
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.admitted_at);
        snapshots
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
