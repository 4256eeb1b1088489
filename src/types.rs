//! Domain model: parties and the guests that belong to them.
//!
//! The store keeps two collections. `parties` owns the party-level
//! logistics answers exactly once; `guests` holds per-person attendance
//! and references its party by id. Field names match the store's
//! column names, so the structs serialize straight into PostgREST
//! request bodies and back out of response rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accommodation answers offered by the RSVP form. Stored as plain
/// strings; the report counts exact matches and flags anything else.
pub const ACCOMMODATION_STAYING: &str = "Staying with us";
pub const ACCOMMODATION_BOOKING_OWN: &str = "Booking own";

/// Weekend-duration answers offered by the RSVP form.
pub const DURATION_FULL_WEEKEND: &str = "Full Weekend";
pub const DURATION_FRIDAY_ONLY: &str = "Friday Only";
pub const DURATION_OTHER: &str = "Other";

/// Which invitation a guest received. Friday-only guests are not asked
/// the accommodation question and are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationType {
    Weekend,
    Friday,
}

impl InvitationType {
    /// Parse the exact wire value. Matching is strict; the import
    /// validator rejects anything that is not `weekend` or `friday`.
    pub fn parse(value: &str) -> Option<InvitationType> {
        match value {
            "weekend" => Some(InvitationType::Weekend),
            "friday" => Some(InvitationType::Friday),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationType::Weekend => "weekend",
            InvitationType::Friday => "friday",
        }
    }
}

impl std::fmt::Display for InvitationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invited person.
///
/// Identity fields (`full_name`, `party_id`, `invitation_type`) are
/// owned by the CSV import; RSVP fields start blank and are only ever
/// written by a form submission. `is_attending` is tri-state: `None`
/// means no response yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    pub id: Uuid,
    pub party_id: Uuid,
    pub full_name: String,
    pub invitation_type: InvitationType,
    pub is_attending: Option<bool>,
    #[serde(default)]
    pub dietary_preferences: Option<String>,
    #[serde(default)]
    pub additional_message: Option<String>,
    /// Maintained by the store; present on reads, never sent on writes.
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for a guest the store has not seen yet. The store
/// assigns the id; RSVP fields serialize as explicit nulls.
#[derive(Debug, Clone, Serialize)]
pub struct NewGuest {
    pub party_id: Uuid,
    pub full_name: String,
    pub invitation_type: InvitationType,
    pub is_attending: Option<bool>,
    pub dietary_preferences: Option<String>,
    pub additional_message: Option<String>,
}

impl NewGuest {
    /// A newly invited guest with blank RSVP state.
    pub fn invited(party_id: Uuid, full_name: &str, invitation_type: InvitationType) -> NewGuest {
        NewGuest {
            party_id,
            full_name: full_name.to_string(),
            invitation_type,
            is_attending: None,
            dietary_preferences: None,
            additional_message: None,
        }
    }
}

/// A group of guests who RSVP together and share logistics answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub id: Uuid,
    /// Display label and the searchable half of the import identity key.
    pub name: String,
    pub accommodation_choice: Option<String>,
    pub weekend_duration: Option<String>,
    pub song_request: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for a party the store has not seen yet. Logistics
/// columns start null.
#[derive(Debug, Clone, Serialize)]
pub struct NewParty {
    pub name: String,
}

/// Patch payload for a party's logistics columns. All three fields are
/// always serialized, so a `None` clears the stored value rather than
/// leaving it untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartyLogistics {
    pub accommodation_choice: Option<String>,
    pub weekend_duration: Option<String>,
    pub song_request: Option<String>,
}

/// Display label for tri-state attendance, used by import warnings and
/// the weekly report.
pub fn attendance_label(is_attending: Option<bool>) -> &'static str {
    match is_attending {
        None => "No response",
        Some(true) => "Accepted",
        Some(false) => "Declined",
    }
}
