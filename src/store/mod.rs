//! Guest store collaborator.
//!
//! Everything that touches persisted guests and parties goes through
//! the [`GuestStore`] trait so lookup, form submission, reconciliation,
//! and reporting stay testable against an in-memory double. The
//! production implementation ([`postgrest::SupabaseStore`]) talks to a
//! managed Postgres over its REST query API.
//!
//! Retries live here too: idempotent store calls are sent through
//! [`send_with_retry`], which backs off on rate limits, timeouts, and
//! server errors.

pub mod postgrest;

#[cfg(test)]
pub(crate) mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{Guest, NewGuest, NewParty, Party, PartyLogistics};

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid store URL: {0}")]
    Url(String),
    #[error("store returned an incomplete result: {0}")]
    Incomplete(String),
}

// ============================================================================
// Retry policy
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retryable,
    NonRetryable,
}

fn retry_decision_for_status(status: reqwest::StatusCode) -> RetryDecision {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        RetryDecision::Retryable
    } else {
        RetryDecision::NonRetryable
    }
}

fn retry_delay(
    attempt: u32,
    policy: &RetryPolicy,
    retry_after: Option<&reqwest::header::HeaderValue>,
) -> Duration {
    if let Some(value) = retry_after.and_then(|v| v.to_str().ok()) {
        if let Ok(secs) = value.parse::<u64>() {
            return Duration::from_secs(secs.min(30));
        }
    }

    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    let jitter = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0))
        % 150;
    Duration::from_millis(base.saturating_add(jitter))
}

/// Send a request with bounded retries.
///
/// Retries 429/408/5xx responses and connect/timeout transport errors,
/// honoring a numeric `Retry-After` header when present. Every call in
/// this crate is either a read or a keyed upsert, so replaying a
/// request is safe.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, StoreError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request.send().await.map_err(StoreError::Http);
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                let decision = retry_decision_for_status(status);
                if decision == RetryDecision::Retryable && attempt < attempts {
                    let delay = retry_delay(
                        attempt,
                        policy,
                        response.headers().get(reqwest::header::RETRY_AFTER),
                    );
                    log::warn!(
                        "store retry {}/{} after status {} (sleep {:?})",
                        attempt,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                let retryable_transport = err.is_timeout() || err.is_connect();
                if retryable_transport && attempt < attempts {
                    let delay = retry_delay(attempt, policy, None);
                    log::warn!(
                        "store retry {}/{} after transport error: {} (sleep {:?})",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(StoreError::Http(err));
            }
        }
    }

    Err(StoreError::Incomplete("request exhausted retries".to_string()))
}

// ============================================================================
// Store trait
// ============================================================================

/// Operations the rest of the crate needs from the backing store.
///
/// Batched writes are all-or-nothing per call, matching the underlying
/// REST API's per-request semantics. Empty batches must succeed without
/// touching the store.
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Guests whose full name contains the fragment, case-insensitively.
    async fn search_guests_by_name(&self, fragment: &str) -> Result<Vec<Guest>, StoreError>;

    /// Parties whose label contains the fragment, case-insensitively.
    async fn search_parties_by_name(&self, fragment: &str) -> Result<Vec<Party>, StoreError>;

    async fn parties_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Party>, StoreError>;

    /// Every guest belonging to any of the given parties.
    async fn guests_in_parties(&self, party_ids: &[Uuid]) -> Result<Vec<Guest>, StoreError>;

    /// The full guest collection, in a stable name order.
    async fn all_guests(&self) -> Result<Vec<Guest>, StoreError>;

    async fn all_parties(&self) -> Result<Vec<Party>, StoreError>;

    /// Guests whose `updated_at` is at or after the cutoff.
    async fn guests_updated_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Guest>, StoreError>;

    /// Batched upsert keyed on `id`.
    async fn upsert_guests(&self, guests: &[Guest]) -> Result<(), StoreError>;

    /// Batched insert; the store assigns ids. Returns the created rows.
    async fn insert_guests(&self, guests: &[NewGuest]) -> Result<Vec<Guest>, StoreError>;

    async fn upsert_parties(&self, parties: &[Party]) -> Result<(), StoreError>;

    async fn insert_parties(&self, parties: &[NewParty]) -> Result<Vec<Party>, StoreError>;

    /// Overwrite one party's logistics columns (explicit nulls clear).
    async fn update_party_logistics(
        &self,
        party_id: Uuid,
        logistics: &PartyLogistics,
    ) -> Result<(), StoreError>;

    /// Cheapest possible read, used as a keep-alive so the managed
    /// store doesn't suspend the project for inactivity.
    async fn ping(&self) -> Result<(), StoreError>;
}

// ============================================================================
// Tests
// ============================================================================
