//! Supabase store client.
//!
//! Talks to the project's PostgREST endpoint (`{base}/rest/v1/`) with
//! the anon key in both the `apikey` and `Authorization` headers.
//! Filters are encoded as PostgREST query operators (`ilike.*frag*`,
//! `id=in.(...)`, `updated_at=gte.<timestamp>`); `*` inside an `ilike`
//! value is the wildcard. Batched writes ride on single requests:
//! upserts POST with `resolution=merge-duplicates` keyed on `id`,
//! inserts POST with `return=representation` so the caller gets the
//! store-assigned ids back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

use super::{send_with_retry, GuestStore, RetryPolicy, StoreError};
use crate::types::{Guest, NewGuest, NewParty, Party, PartyLogistics};

// ============================================================================
// Filter encoding
// ============================================================================

/// Case-insensitive substring match. PostgREST translates `*` to `%`.
fn ilike_contains(fragment: &str) -> String {
    format!("ilike.*{fragment}*")
}

fn id_in(ids: &[Uuid]) -> String {
    let joined = ids
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

fn updated_gte(cutoff: DateTime<Utc>) -> String {
    format!("gte.{}", cutoff.to_rfc3339())
}

// ============================================================================
// Client
// ============================================================================

pub struct SupabaseStore {
    http: reqwest::Client,
    guests_url: Url,
    parties_url: Url,
    api_key: String,
    retry: RetryPolicy,
}

impl SupabaseStore {
    /// Build a client from the project base URL (not the REST path)
    /// and the anon key.
    pub fn new(base_url: &str, api_key: &str) -> Result<SupabaseStore, StoreError> {
        let base = Url::parse(base_url)
            .map_err(|e| StoreError::Url(format!("{base_url}: {e}")))?;
        let rest = base
            .join("rest/v1/")
            .map_err(|e| StoreError::Url(e.to_string()))?;
        let guests_url = rest
            .join("guests")
            .map_err(|e| StoreError::Url(e.to_string()))?;
        let parties_url = rest
            .join("parties")
            .map_err(|e| StoreError::Url(e.to_string()))?;

        Ok(SupabaseStore {
            http: reqwest::Client::new(),
            guests_url,
            parties_url,
            api_key: api_key.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    fn auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Map a non-2xx response to `StoreError::Api` with the body text.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(resp)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, StoreError> {
        let request = self.auth(self.http.get(url.clone())).query(params);
        let resp = send_with_retry(request, &self.retry).await?;
        let rows = Self::check(resp).await?.json::<Vec<T>>().await?;
        Ok(rows)
    }

    /// Fire a write request, keeping only the success/failure outcome.
    async fn write(&self, request: reqwest::RequestBuilder) -> Result<(), StoreError> {
        let resp = send_with_retry(request, &self.retry).await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn insert_returning<R, T>(
        &self,
        url: &Url,
        rows: &[T],
        what: &str,
    ) -> Result<Vec<R>, StoreError>
    where
        R: serde::de::DeserializeOwned,
        T: serde::Serialize,
    {
        let request = self
            .auth(self.http.post(url.clone()))
            .header("Prefer", "return=representation")
            .json(rows);
        let resp = send_with_retry(request, &self.retry).await?;
        let created: Vec<R> = Self::check(resp).await?.json().await?;
        if created.len() != rows.len() {
            return Err(StoreError::Incomplete(format!(
                "insert returned {} of {} {what} rows",
                created.len(),
                rows.len()
            )));
        }
        Ok(created)
    }

    async fn upsert<T: serde::Serialize>(
        &self,
        url: &Url,
        rows: &[T],
    ) -> Result<(), StoreError> {
        let request = self
            .auth(self.http.post(url.clone()))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows);
        self.write(request).await
    }
}

#[async_trait]
impl GuestStore for SupabaseStore {
    async fn search_guests_by_name(&self, fragment: &str) -> Result<Vec<Guest>, StoreError> {
        let pattern = ilike_contains(fragment);
        self.fetch(
            &self.guests_url,
            &[("select", "*"), ("full_name", pattern.as_str())],
        )
        .await
    }

    async fn search_parties_by_name(&self, fragment: &str) -> Result<Vec<Party>, StoreError> {
        let pattern = ilike_contains(fragment);
        self.fetch(
            &self.parties_url,
            &[("select", "*"), ("name", pattern.as_str())],
        )
        .await
    }

    async fn parties_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Party>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = id_in(ids);
        self.fetch(&self.parties_url, &[("select", "*"), ("id", filter.as_str())])
            .await
    }

    async fn guests_in_parties(&self, party_ids: &[Uuid]) -> Result<Vec<Guest>, StoreError> {
        if party_ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = id_in(party_ids);
        self.fetch(
            &self.guests_url,
            &[("select", "*"), ("party_id", filter.as_str())],
        )
        .await
    }

    async fn all_guests(&self) -> Result<Vec<Guest>, StoreError> {
        self.fetch(
            &self.guests_url,
            &[("select", "*"), ("order", "full_name.asc")],
        )
        .await
    }

    async fn all_parties(&self) -> Result<Vec<Party>, StoreError> {
        self.fetch(&self.parties_url, &[("select", "*"), ("order", "name.asc")])
            .await
    }

    async fn guests_updated_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Guest>, StoreError> {
        let filter = updated_gte(cutoff);
        self.fetch(
            &self.guests_url,
            &[("select", "*"), ("updated_at", filter.as_str())],
        )
        .await
    }

    async fn upsert_guests(&self, guests: &[Guest]) -> Result<(), StoreError> {
        if guests.is_empty() {
            return Ok(());
        }
        self.upsert(&self.guests_url, guests).await
    }

    async fn insert_guests(&self, guests: &[NewGuest]) -> Result<Vec<Guest>, StoreError> {
        if guests.is_empty() {
            return Ok(Vec::new());
        }
        self.insert_returning(&self.guests_url, guests, "guest").await
    }

    async fn upsert_parties(&self, parties: &[Party]) -> Result<(), StoreError> {
        if parties.is_empty() {
            return Ok(());
        }
        self.upsert(&self.parties_url, parties).await
    }

    async fn insert_parties(&self, parties: &[NewParty]) -> Result<Vec<Party>, StoreError> {
        if parties.is_empty() {
            return Ok(Vec::new());
        }
        self.insert_returning(&self.parties_url, parties, "party").await
    }

    async fn update_party_logistics(
        &self,
        party_id: Uuid,
        logistics: &PartyLogistics,
    ) -> Result<(), StoreError> {
        let filter = format!("eq.{party_id}");
        let request = self
            .auth(self.http.patch(self.parties_url.clone()))
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=minimal")
            .json(logistics);
        self.write(request).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let request = self
            .auth(self.http.get(self.guests_url.clone()))
            .query(&[("select", "id"), ("limit", "1")]);
        let resp = send_with_retry(request, &self.retry).await?;
        Self::check(resp).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
