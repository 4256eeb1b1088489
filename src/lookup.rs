//! Party lookup behind the RSVP page.
//!
//! Guests type a name fragment and get back every invited party whose
//! guest names or party label contain it. Queries shorter than three
//! characters are rejected before any store access.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::error::RsvpError;
use crate::store::GuestStore;
use crate::types::{Guest, Party};

const MIN_QUERY_CHARS: usize = 3;

const MSG_QUERY_TOO_SHORT: &str = "Please enter at least 3 characters.";

const MSG_NOT_FOUND: &str = "We couldn't find an invitation for that name. Please try one full, \
     first or last name. If that does not work, send us a message on WhatsApp!";

const MSG_LOOKUP_FAILED: &str = "An error occurred during lookup. Please try again.";

/// One invited party with all of its members, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct PartyMatch {
    pub party: Party,
    pub guests: Vec<Guest>,
}

/// Find every party whose guest names or label contain `query`.
///
/// Matching is case-insensitive on both fields and the two match sets
/// are unioned, so "smith" finds the Smith family whether the fragment
/// hits a guest's name or the party label. Each party appears once,
/// with its full member list.
pub async fn find_parties(
    store: &dyn GuestStore,
    query: &str,
) -> Result<Vec<PartyMatch>, RsvpError> {
    let needle = query.trim();
    if needle.chars().count() < MIN_QUERY_CHARS {
        return Err(RsvpError::Validation(MSG_QUERY_TOO_SHORT.to_string()));
    }

    let guest_matches = store.search_guests_by_name(needle).await?;
    let party_matches = store.search_parties_by_name(needle).await?;

    // Union of both match sets, first occurrence wins.
    let mut party_ids: Vec<Uuid> = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::new();
    let matched = guest_matches
        .iter()
        .map(|g| g.party_id)
        .chain(party_matches.iter().map(|p| p.id));
    for id in matched {
        if seen.insert(id) {
            party_ids.push(id);
        }
    }

    if party_ids.is_empty() {
        return Err(RsvpError::NotFound(MSG_NOT_FOUND.to_string()));
    }

    let parties = store.parties_by_ids(&party_ids).await?;
    let mut members = store.guests_in_parties(&party_ids).await?;
    members.sort_by(|a, b| a.full_name.cmp(&b.full_name));

    let mut by_id: HashMap<Uuid, Party> = parties.into_iter().map(|p| (p.id, p)).collect();
    let mut results = Vec::with_capacity(party_ids.len());
    for id in party_ids {
        match by_id.remove(&id) {
            Some(party) => {
                let guests: Vec<Guest> =
                    members.iter().filter(|g| g.party_id == id).cloned().collect();
                results.push(PartyMatch { party, guests });
            }
            None => {
                // A matched guest can point at a party row that is gone.
                log::warn!("lookup: matched party {} could not be loaded", id);
            }
        }
    }
    Ok(results)
}

/// Message a guest-facing surface should display for a lookup error.
///
/// Validation and not-found errors carry their own guidance; anything
/// else collapses to a generic retry prompt so store internals never
/// leak to guests.
pub fn user_message(err: &RsvpError) -> String {
    match err {
        RsvpError::Validation(msg) | RsvpError::NotFound(msg) => msg.clone(),
        _ => MSG_LOOKUP_FAILED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use crate::store::StoreError;
    use crate::types::InvitationType;

    #[tokio::test]
    async fn test_short_query_rejected_without_store_access() {
        let store = InMemoryStore::new();
        let party = store.seed_party("Smith Family");
        store.seed_guest(party.id, "Alice Smith", InvitationType::Weekend);

        let err = find_parties(&store, "  ab  ").await.unwrap_err();
        match err {
            RsvpError::Validation(msg) => {
                assert_eq!(msg, "Please enter at least 3 characters.")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(store.read_count(), 0);
    }

    #[tokio::test]
    async fn test_length_check_counts_characters_not_bytes() {
        let store = InMemoryStore::new();
        // Three characters, six bytes. This must reach the store.
        let err = find_parties(&store, "ééé").await.unwrap_err();
        assert!(matches!(err, RsvpError::NotFound(_)));
        assert!(store.read_count() > 0);
    }

    #[tokio::test]
    async fn test_match_is_case_insensitive_and_deduplicated() {
        let store = InMemoryStore::new();
        let party = store.seed_party("Smith Family");
        store.seed_guest(party.id, "Alice Smith", InvitationType::Weekend);
        store.seed_guest(party.id, "Ben Smith", InvitationType::Weekend);

        // "SMITH" hits both guests and the party label. One result.
        let results = find_parties(&store, "SMITH").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].party.id, party.id);
        assert_eq!(results[0].guests.len(), 2);
    }

    #[tokio::test]
    async fn test_party_label_alone_can_match() {
        let store = InMemoryStore::new();
        let party = store.seed_party("The Hiking Crew");
        store.seed_guest(party.id, "Bob Jones", InvitationType::Friday);

        let results = find_parties(&store, "hiking").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].guests[0].full_name, "Bob Jones");
    }

    #[tokio::test]
    async fn test_members_grouped_per_party_and_sorted() {
        let store = InMemoryStore::new();
        let smiths = store.seed_party("Smith Family");
        store.seed_guest(smiths.id, "Zoe Smith", InvitationType::Weekend);
        store.seed_guest(smiths.id, "Alice Smith", InvitationType::Weekend);
        let joneses = store.seed_party("Jones Family");
        store.seed_guest(joneses.id, "Cara Jones", InvitationType::Friday);

        let results = find_parties(&store, "family").await.unwrap();
        assert_eq!(results.len(), 2);
        for m in &results {
            assert!(m.guests.iter().all(|g| g.party_id == m.party.id));
        }
        let smith_match = results.iter().find(|m| m.party.id == smiths.id).unwrap();
        let names: Vec<&str> = smith_match.guests.iter().map(|g| g.full_name.as_str()).collect();
        assert_eq!(names, vec!["Alice Smith", "Zoe Smith"]);
    }

    #[tokio::test]
    async fn test_no_match_returns_guidance_distinct_from_outage() {
        let store = InMemoryStore::new();
        let err = find_parties(&store, "nobody at all").await.unwrap_err();
        let guidance = user_message(&err);
        assert!(matches!(err, RsvpError::NotFound(_)));
        assert!(guidance.contains("couldn't find an invitation"));

        let outage = RsvpError::Store(StoreError::Api {
            status: 503,
            message: "unavailable".to_string(),
        });
        let retry = user_message(&outage);
        assert_eq!(retry, "An error occurred during lookup. Please try again.");
        assert_ne!(guidance, retry);
    }

    #[tokio::test]
    async fn test_store_failure_propagates_as_store_error() {
        let store = InMemoryStore::new();
        store.set_failing(true);
        let err = find_parties(&store, "smith").await.unwrap_err();
        assert!(matches!(err, RsvpError::Store(_)));
    }
}
