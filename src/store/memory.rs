//! In-memory store double for tests.
//!
//! Simulates the store-side behaviors the crate relies on: id and
//! timestamp assignment on insert, `updated_at` bumps on writes, and
//! the filter/read operations. A read counter backs the "no store
//! access on invalid input" assertions, and a failure toggle stands in
//! for an unreachable store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{GuestStore, StoreError};
use crate::types::{Guest, InvitationType, NewGuest, NewParty, Party, PartyLogistics};

#[derive(Default)]
struct Inner {
    guests: Vec<Guest>,
    parties: Vec<Party>,
    fail: bool,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore::default()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// When set, every subsequent operation fails like an outage.
    pub fn set_failing(&self, fail: bool) {
        self.inner.lock().unwrap().fail = fail;
    }

    pub fn seed_party(&self, name: &str) -> Party {
        let now = Utc::now();
        let party = Party {
            id: Uuid::new_v4(),
            name: name.to_string(),
            accommodation_choice: None,
            weekend_duration: None,
            song_request: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.inner.lock().unwrap().parties.push(party.clone());
        party
    }

    pub fn seed_guest(
        &self,
        party_id: Uuid,
        full_name: &str,
        invitation_type: InvitationType,
    ) -> Guest {
        let now = Utc::now();
        let guest = Guest {
            id: Uuid::new_v4(),
            party_id,
            full_name: full_name.to_string(),
            invitation_type,
            is_attending: None,
            dietary_preferences: None,
            additional_message: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.inner.lock().unwrap().guests.push(guest.clone());
        guest
    }

    /// Stamp an RSVP answer directly, bumping `updated_at`.
    pub fn set_guest_rsvp(&self, id: Uuid, is_attending: Option<bool>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(g) = inner.guests.iter_mut().find(|g| g.id == id) {
            g.is_attending = is_attending;
            g.updated_at = Some(Utc::now());
        }
    }

    /// Backdate a guest's `updated_at` for window tests.
    pub fn set_guest_updated_at(&self, id: Uuid, when: DateTime<Utc>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(g) = inner.guests.iter_mut().find(|g| g.id == id) {
            g.updated_at = Some(when);
        }
    }

    pub fn set_party_logistics_direct(&self, id: Uuid, logistics: &PartyLogistics) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(p) = inner.parties.iter_mut().find(|p| p.id == id) {
            p.accommodation_choice = logistics.accommodation_choice.clone();
            p.weekend_duration = logistics.weekend_duration.clone();
            p.song_request = logistics.song_request.clone();
        }
    }

    pub fn guest(&self, id: Uuid) -> Guest {
        self.inner
            .lock()
            .unwrap()
            .guests
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .unwrap()
    }

    pub fn party(&self, id: Uuid) -> Party {
        self.inner
            .lock()
            .unwrap()
            .parties
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .unwrap()
    }

    pub fn guests_snapshot(&self) -> Vec<Guest> {
        self.inner.lock().unwrap().guests.clone()
    }

    pub fn parties_snapshot(&self) -> Vec<Party> {
        self.inner.lock().unwrap().parties.clone()
    }

    fn read_op(&self) -> Result<(), StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.outage_check()
    }

    fn write_op(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.outage_check()
    }

    fn outage_check(&self) -> Result<(), StoreError> {
        if self.inner.lock().unwrap().fail {
            Err(StoreError::Api {
                status: 503,
                message: "simulated outage".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GuestStore for InMemoryStore {
    async fn search_guests_by_name(&self, fragment: &str) -> Result<Vec<Guest>, StoreError> {
        self.read_op()?;
        let needle = fragment.to_lowercase();
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .guests
            .iter()
            .filter(|g| g.full_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn search_parties_by_name(&self, fragment: &str) -> Result<Vec<Party>, StoreError> {
        self.read_op()?;
        let needle = fragment.to_lowercase();
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .parties
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn parties_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Party>, StoreError> {
        self.read_op()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .parties
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn guests_in_parties(&self, party_ids: &[Uuid]) -> Result<Vec<Guest>, StoreError> {
        self.read_op()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .guests
            .iter()
            .filter(|g| party_ids.contains(&g.party_id))
            .cloned()
            .collect())
    }

    async fn all_guests(&self) -> Result<Vec<Guest>, StoreError> {
        self.read_op()?;
        let inner = self.inner.lock().unwrap();
        let mut guests = inner.guests.clone();
        guests.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(guests)
    }

    async fn all_parties(&self) -> Result<Vec<Party>, StoreError> {
        self.read_op()?;
        let inner = self.inner.lock().unwrap();
        let mut parties = inner.parties.clone();
        parties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(parties)
    }

    async fn guests_updated_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Guest>, StoreError> {
        self.read_op()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .guests
            .iter()
            .filter(|g| g.updated_at.is_some_and(|u| u >= cutoff))
            .cloned()
            .collect())
    }

    async fn upsert_guests(&self, guests: &[Guest]) -> Result<(), StoreError> {
        if guests.is_empty() {
            return Ok(());
        }
        self.write_op()?;
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        for incoming in guests {
            if let Some(existing) = inner.guests.iter_mut().find(|g| g.id == incoming.id) {
                let created_at = existing.created_at;
                *existing = incoming.clone();
                existing.created_at = created_at;
                existing.updated_at = Some(now);
            } else {
                let mut row = incoming.clone();
                row.created_at = Some(now);
                row.updated_at = Some(now);
                inner.guests.push(row);
            }
        }
        Ok(())
    }

    async fn insert_guests(&self, guests: &[NewGuest]) -> Result<Vec<Guest>, StoreError> {
        if guests.is_empty() {
            return Ok(Vec::new());
        }
        self.write_op()?;
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        let mut created = Vec::with_capacity(guests.len());
        for g in guests {
            let row = Guest {
                id: Uuid::new_v4(),
                party_id: g.party_id,
                full_name: g.full_name.clone(),
                invitation_type: g.invitation_type,
                is_attending: g.is_attending,
                dietary_preferences: g.dietary_preferences.clone(),
                additional_message: g.additional_message.clone(),
                created_at: Some(now),
                updated_at: Some(now),
            };
            inner.guests.push(row.clone());
            created.push(row);
        }
        Ok(created)
    }

    async fn upsert_parties(&self, parties: &[Party]) -> Result<(), StoreError> {
        if parties.is_empty() {
            return Ok(());
        }
        self.write_op()?;
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        for incoming in parties {
            if let Some(existing) = inner.parties.iter_mut().find(|p| p.id == incoming.id) {
                let created_at = existing.created_at;
                *existing = incoming.clone();
                existing.created_at = created_at;
                existing.updated_at = Some(now);
            } else {
                let mut row = incoming.clone();
                row.created_at = Some(now);
                row.updated_at = Some(now);
                inner.parties.push(row);
            }
        }
        Ok(())
    }

    async fn insert_parties(&self, parties: &[NewParty]) -> Result<Vec<Party>, StoreError> {
        if parties.is_empty() {
            return Ok(Vec::new());
        }
        self.write_op()?;
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        let mut created = Vec::with_capacity(parties.len());
        for p in parties {
            let row = Party {
                id: Uuid::new_v4(),
                name: p.name.clone(),
                accommodation_choice: None,
                weekend_duration: None,
                song_request: None,
                created_at: Some(now),
                updated_at: Some(now),
            };
            inner.parties.push(row.clone());
            created.push(row);
        }
        Ok(created)
    }

    async fn update_party_logistics(
        &self,
        party_id: Uuid,
        logistics: &PartyLogistics,
    ) -> Result<(), StoreError> {
        self.write_op()?;
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        if let Some(p) = inner.parties.iter_mut().find(|p| p.id == party_id) {
            p.accommodation_choice = logistics.accommodation_choice.clone();
            p.weekend_duration = logistics.weekend_duration.clone();
            p.song_request = logistics.song_request.clone();
            p.updated_at = Some(now);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read_op()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_ids_and_timestamps() {
        let store = InMemoryStore::new();
        let party = store.seed_party("Smith Family");
        let created = store
            .insert_guests(&[NewGuest::invited(
                party.id,
                "Alice Smith",
                InvitationType::Weekend,
            )])
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        assert!(created[0].created_at.is_some());
        assert_eq!(created[0].is_attending, None);
    }

    #[tokio::test]
    async fn test_upsert_bumps_updated_at_and_keeps_created_at() {
        let store = InMemoryStore::new();
        let party = store.seed_party("Smith Family");
        let guest = store.seed_guest(party.id, "Alice Smith", InvitationType::Weekend);
        let created_at = store.guest(guest.id).created_at;

        let old = Utc::now() - chrono::Duration::days(30);
        store.set_guest_updated_at(guest.id, old);

        let mut updated = guest.clone();
        updated.is_attending = Some(true);
        store.upsert_guests(&[updated]).await.unwrap();

        let stored = store.guest(guest.id);
        assert_eq!(stored.is_attending, Some(true));
        assert_eq!(stored.created_at, created_at);
        assert!(stored.updated_at.unwrap() > old);
    }

    #[tokio::test]
    async fn test_failure_toggle_surfaces_api_error() {
        let store = InMemoryStore::new();
        store.set_failing(true);
        let err = store.all_guests().await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 503, .. }));
    }
}
