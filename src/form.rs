//! RSVP form submission.
//!
//! Takes the party a guest found via lookup plus their answers, and
//! persists them as one batched guest upsert followed by one party
//! logistics update. Logistics only survive when somebody is actually
//! coming; a fully declining party has them cleared even if values
//! were entered while toggling.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SongRequestPolicy;
use crate::error::RsvpError;
use crate::lookup::PartyMatch;
use crate::store::GuestStore;
use crate::types::{Guest, PartyLogistics};

const MSG_CONFIRM_ALL: &str =
    "Please confirm attendance (Accept/Decline) for all members of your party.";

const MSG_UNKNOWN_GUEST: &str = "Submission includes a guest who is not part of this party.";

const MSG_LOGISTICS_REQUIRED: &str =
    "Please choose accommodation and weekend duration for your party.";

const MSG_SUBMIT_FAILED: &str =
    "A network error occurred. Please try again or contact the couple.";

/// One member's answers. `attending: None` means still unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestAnswer {
    pub guest_id: Uuid,
    pub attending: Option<bool>,
    #[serde(default)]
    pub dietary_preferences: Option<String>,
    #[serde(default)]
    pub additional_message: Option<String>,
}

/// The whole form: per-guest answers plus party-level logistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsvpSubmission {
    pub answers: Vec<GuestAnswer>,
    #[serde(default)]
    pub accommodation_choice: Option<String>,
    #[serde(default)]
    pub weekend_duration: Option<String>,
    #[serde(default)]
    pub song_request: Option<String>,
}

/// What the confirmation screen needs, no further store read required.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RsvpOutcome {
    /// True when at least one member of the party accepted.
    pub attending: bool,
    pub guests_updated: usize,
}

/// Validate and persist a party's RSVP.
///
/// Every member must have attendance resolved before anything is
/// written. Accommodation and duration are required while anyone
/// attends and cleared otherwise; the song request follows `policy`.
/// The submission is taken by reference so a caller can retry the same
/// value after a transient store failure.
pub async fn submit_rsvp(
    store: &dyn GuestStore,
    party: &PartyMatch,
    submission: &RsvpSubmission,
    policy: SongRequestPolicy,
) -> Result<RsvpOutcome, RsvpError> {
    let known: HashSet<Uuid> = party.guests.iter().map(|g| g.id).collect();
    if submission.answers.iter().any(|a| !known.contains(&a.guest_id)) {
        return Err(RsvpError::Validation(MSG_UNKNOWN_GUEST.to_string()));
    }

    let mut answers: HashMap<Uuid, &GuestAnswer> = HashMap::new();
    for answer in &submission.answers {
        answers.insert(answer.guest_id, answer);
    }

    let mut updates: Vec<Guest> = Vec::with_capacity(party.guests.len());
    let mut any_attending = false;
    for member in &party.guests {
        let answer = match answers.get(&member.id) {
            Some(a) if a.attending.is_some() => *a,
            _ => return Err(RsvpError::Validation(MSG_CONFIRM_ALL.to_string())),
        };
        if answer.attending == Some(true) {
            any_attending = true;
        }
        let mut row = member.clone();
        row.is_attending = answer.attending;
        row.dietary_preferences = trimmed_opt(answer.dietary_preferences.as_deref());
        row.additional_message = trimmed_opt(answer.additional_message.as_deref());
        updates.push(row);
    }

    let accommodation = trimmed_opt(submission.accommodation_choice.as_deref());
    let duration = trimmed_opt(submission.weekend_duration.as_deref());
    let song = trimmed_opt(submission.song_request.as_deref());

    if any_attending && (accommodation.is_none() || duration.is_none()) {
        return Err(RsvpError::Validation(MSG_LOGISTICS_REQUIRED.to_string()));
    }

    let logistics = PartyLogistics {
        accommodation_choice: if any_attending { accommodation } else { None },
        weekend_duration: if any_attending { duration } else { None },
        song_request: match policy {
            SongRequestPolicy::Always => song,
            SongRequestPolicy::AttendingOnly if any_attending => song,
            SongRequestPolicy::AttendingOnly => None,
        },
    };

    store.upsert_guests(&updates).await?;
    store.update_party_logistics(party.party.id, &logistics).await?;

    log::info!(
        "rsvp saved for party \"{}\": {} guests, attending: {}",
        party.party.name,
        updates.len(),
        any_attending
    );

    Ok(RsvpOutcome {
        attending: any_attending,
        guests_updated: updates.len(),
    })
}

/// Message a guest-facing surface should display for a submit error.
pub fn user_message(err: &RsvpError) -> String {
    match err {
        RsvpError::Validation(msg) => msg.clone(),
        _ => MSG_SUBMIT_FAILED.to_string(),
    }
}

fn trimmed_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
