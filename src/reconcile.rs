//! Guest list reconciliation from CSV.
//!
//! The spreadsheet stays the source of truth for who is invited; the
//! store stays the source of truth for what they answered. An import
//! refreshes names and invitation types while preserving every RSVP
//! field, reports guests that disappeared from the sheet, and never
//! deletes anything.
//!
//! Guests match across the two sides by identity key: the trimmed,
//! lowercased full name and party label joined with `|`. A row whose
//! key exists keeps its store id; a row with a fresh key becomes an
//! insert with all RSVP state unset.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RsvpError;
use crate::store::{GuestStore, StoreError};
use crate::types::{attendance_label, Guest, InvitationType, NewGuest, NewParty, Party};

// ============================================================================
// CSV input
// ============================================================================

/// One spreadsheet row. `line` is 1-based with the header on line 1.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvGuestRow {
    pub full_name: String,
    pub party_name: String,
    pub invitation_type: String,
    #[serde(skip)]
    pub line: usize,
}

/// Read rows from a headered CSV, trimming whitespace around fields.
pub fn read_guest_csv(path: &Path) -> Result<Vec<CsvGuestRow>, RsvpError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| RsvpError::CsvRead(format!("{}: {}", path.display(), e)))?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let mut row: CsvGuestRow = record.deserialize(Some(&headers))?;
        row.line = line;
        rows.push(row);
    }
    Ok(rows)
}

// ============================================================================
// Planning
// ============================================================================

/// One row that failed validation.
#[derive(Debug, Clone, Serialize)]
pub struct RowIssue {
    pub line: usize,
    pub full_name: String,
    pub party_name: String,
    pub problem: String,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.full_name.is_empty() && self.party_name.is_empty() {
            write!(f, "line {}: {}", self.line, self.problem)
        } else {
            write!(
                f,
                "line {} ({} / {}): {}",
                self.line, self.full_name, self.party_name, self.problem
            )
        }
    }
}

/// An existing guest missing from the CSV. Warned about, never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedGuest {
    pub full_name: String,
    pub party_name: String,
    pub status: String,
}

impl fmt::Display for RemovedGuest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {}", self.full_name, self.party_name, self.status)
    }
}

/// A row with no existing match, to insert once its party id is known.
#[derive(Debug, Clone)]
pub struct PlannedGuest {
    pub party_key: String,
    pub full_name: String,
    pub invitation_type: InvitationType,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub new_guests: usize,
    pub existing_guests: usize,
    pub weekend_invites: usize,
    pub friday_invites: usize,
    pub new_parties: usize,
}

#[derive(Debug, Clone)]
pub struct ImportPlan {
    /// Existing parties whose label casing changed. Logistics ride along
    /// unchanged.
    pub party_updates: Vec<Party>,
    pub new_parties: Vec<NewParty>,
    /// Identity key of each existing party, for resolving planned guests.
    pub party_ids: HashMap<String, Uuid>,
    /// Existing guests with refreshed name and invitation type. Ids and
    /// RSVP fields are carried over untouched.
    pub guest_updates: Vec<Guest>,
    pub new_guests: Vec<PlannedGuest>,
    pub removed: Vec<RemovedGuest>,
    pub summary: ImportSummary,
}

fn identity_key(full_name: &str, party_name: &str) -> String {
    format!(
        "{}|{}",
        full_name.trim().to_lowercase(),
        party_name.trim().to_lowercase()
    )
}

fn party_key(name: &str) -> String {
    name.trim().to_lowercase()
}

struct CleanRow {
    full_name: String,
    party_label: String,
    invitation: InvitationType,
}

fn validate_rows(rows: &[CsvGuestRow]) -> Result<Vec<CleanRow>, Vec<RowIssue>> {
    let mut issues: Vec<RowIssue> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut clean: Vec<CleanRow> = Vec::new();

    for row in rows {
        let full_name = row.full_name.trim();
        let party_label = row.party_name.trim();
        let type_text = row.invitation_type.trim();
        let push_issue = |problem: String, issues: &mut Vec<RowIssue>| {
            issues.push(RowIssue {
                line: row.line,
                full_name: full_name.to_string(),
                party_name: party_label.to_string(),
                problem,
            });
        };

        let mut ok = true;
        if full_name.is_empty() {
            push_issue("missing full_name".to_string(), &mut issues);
            ok = false;
        }
        if party_label.is_empty() {
            push_issue("missing party_name".to_string(), &mut issues);
            ok = false;
        }
        let invitation = if type_text.is_empty() {
            push_issue("missing invitation_type".to_string(), &mut issues);
            ok = false;
            None
        } else {
            match InvitationType::parse(type_text) {
                Some(t) => Some(t),
                None => {
                    push_issue(
                        format!(
                            "invalid invitation_type \"{}\" (must be \"weekend\" or \"friday\")",
                            type_text
                        ),
                        &mut issues,
                    );
                    ok = false;
                    None
                }
            }
        };

        if !full_name.is_empty() && !party_label.is_empty() {
            let key = identity_key(full_name, party_label);
            if let Some(first) = seen.get(&key) {
                push_issue(format!("duplicate of line {}", first), &mut issues);
                ok = false;
            } else {
                seen.insert(key, row.line);
            }
        }

        if ok {
            if let Some(invitation) = invitation {
                clean.push(CleanRow {
                    full_name: full_name.to_string(),
                    party_label: party_label.to_string(),
                    invitation,
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(clean)
    } else {
        Err(issues)
    }
}

/// Decide what an import would do, without touching the store.
///
/// Every row is validated before anything is planned; any bad row
/// aborts the whole import with the complete list of problems.
pub fn plan_import(
    rows: &[CsvGuestRow],
    parties: &[Party],
    guests: &[Guest],
) -> Result<ImportPlan, RsvpError> {
    let clean = validate_rows(rows).map_err(RsvpError::ImportIntegrity)?;

    let parties_by_id: HashMap<Uuid, &Party> = parties.iter().map(|p| (p.id, p)).collect();
    let parties_by_key: HashMap<String, &Party> =
        parties.iter().map(|p| (party_key(&p.name), p)).collect();

    let mut existing: HashMap<String, &Guest> = HashMap::new();
    for guest in guests {
        match parties_by_id.get(&guest.party_id) {
            Some(party) => {
                existing.insert(identity_key(&guest.full_name, &party.name), guest);
            }
            None => log::warn!(
                "guest \"{}\" references missing party {}; skipping in reconciliation",
                guest.full_name,
                guest.party_id
            ),
        }
    }

    // Parties, in first-seen CSV order.
    let mut party_updates: Vec<Party> = Vec::new();
    let mut new_parties: Vec<NewParty> = Vec::new();
    let mut party_ids: HashMap<String, Uuid> = HashMap::new();
    let mut planned_parties: HashSet<String> = HashSet::new();
    for row in &clean {
        let key = party_key(&row.party_label);
        if !planned_parties.insert(key.clone()) {
            continue;
        }
        match parties_by_key.get(&key) {
            Some(party) => {
                party_ids.insert(key, party.id);
                if party.name != row.party_label {
                    let mut updated = (*party).clone();
                    updated.name = row.party_label.clone();
                    party_updates.push(updated);
                }
            }
            None => new_parties.push(NewParty {
                name: row.party_label.clone(),
            }),
        }
    }

    // Guests: existing keys keep id, party and RSVP fields; fresh keys
    // become inserts with RSVP state unset.
    let mut guest_updates: Vec<Guest> = Vec::new();
    let mut planned_guests: Vec<PlannedGuest> = Vec::new();
    let mut weekend = 0usize;
    let mut friday = 0usize;
    for row in &clean {
        match row.invitation {
            InvitationType::Weekend => weekend += 1,
            InvitationType::Friday => friday += 1,
        }
        let key = identity_key(&row.full_name, &row.party_label);
        match existing.get(&key) {
            Some(current) => {
                let mut updated = (*current).clone();
                updated.full_name = row.full_name.clone();
                updated.invitation_type = row.invitation;
                guest_updates.push(updated);
            }
            None => planned_guests.push(PlannedGuest {
                party_key: party_key(&row.party_label),
                full_name: row.full_name.clone(),
                invitation_type: row.invitation,
            }),
        }
    }

    // Existing guests absent from the sheet.
    let csv_keys: HashSet<String> = clean
        .iter()
        .map(|r| identity_key(&r.full_name, &r.party_label))
        .collect();
    let mut removed: Vec<RemovedGuest> = Vec::new();
    for guest in guests {
        if let Some(party) = parties_by_id.get(&guest.party_id) {
            if !csv_keys.contains(&identity_key(&guest.full_name, &party.name)) {
                removed.push(RemovedGuest {
                    full_name: guest.full_name.clone(),
                    party_name: party.name.clone(),
                    status: attendance_label(guest.is_attending).to_string(),
                });
            }
        }
    }

    let summary = ImportSummary {
        total_rows: clean.len(),
        new_guests: planned_guests.len(),
        existing_guests: guest_updates.len(),
        weekend_invites: weekend,
        friday_invites: friday,
        new_parties: new_parties.len(),
    };

    Ok(ImportPlan {
        party_updates,
        new_parties,
        party_ids,
        guest_updates,
        new_guests: planned_guests,
        removed,
        summary,
    })
}

// ============================================================================
// Application
// ============================================================================

/// Write a plan to the store. Returns `(inserted, updated)` guest counts.
///
/// Parties go first so planned guests can resolve their party ids, and
/// updates go through the id-conflict upsert while fresh rows go
/// through plain inserts.
pub async fn apply_import(
    store: &dyn GuestStore,
    plan: &ImportPlan,
) -> Result<(usize, usize), RsvpError> {
    store.upsert_parties(&plan.party_updates).await?;
    let created_parties = store.insert_parties(&plan.new_parties).await?;

    let mut party_ids = plan.party_ids.clone();
    for party in &created_parties {
        party_ids.insert(party_key(&party.name), party.id);
    }

    store.upsert_guests(&plan.guest_updates).await?;

    let mut inserts: Vec<NewGuest> = Vec::with_capacity(plan.new_guests.len());
    for planned in &plan.new_guests {
        match party_ids.get(&planned.party_key) {
            Some(id) => inserts.push(NewGuest::invited(
                *id,
                &planned.full_name,
                planned.invitation_type,
            )),
            None => {
                return Err(RsvpError::Store(StoreError::Incomplete(format!(
                    "no party id resolved for \"{}\"",
                    planned.party_key
                ))))
            }
        }
    }
    let created_guests = store.insert_guests(&inserts).await?;

    Ok((created_guests.len(), plan.guest_updates.len()))
}

/// Fetch, plan, log and apply one reconciliation run.
pub async fn import_guest_list(
    store: &dyn GuestStore,
    rows: &[CsvGuestRow],
) -> Result<ImportSummary, RsvpError> {
    let parties = store.all_parties().await?;
    let guests = store.all_guests().await?;
    let plan = plan_import(rows, &parties, &guests)?;

    log::info!(
        "import summary: {}",
        serde_json::to_string(&plan.summary).unwrap_or_default()
    );
    if !plan.removed.is_empty() {
        log::warn!(
            "{} guests are in the store but NOT in the CSV (they will not be removed):",
            plan.removed.len()
        );
        for gone in &plan.removed {
            log::warn!("  - {}", gone);
        }
    }

    let (inserted, updated) = apply_import(store, &plan).await?;
    log::info!("guest list import complete: {} inserted, {} updated", inserted, updated);
    Ok(plan.summary)
}
