//! Guest list reconciliation: pushes the spreadsheet into the store.
//!
//! Standalone binary run whenever the guest list CSV changes. Existing
//! guests keep their RSVP answers, nobody is ever deleted, and a single
//! invalid row aborts the whole run before anything is written.
//!
//! Usage: `import_guests [path/to/guestlist.csv]` with SUPABASE_URL and
//! SUPABASE_ANON_KEY set. The path defaults to data/guestlist.csv.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use guestlist::config::StoreConfig;
use guestlist::error::RsvpError;
use guestlist::reconcile;
use guestlist::store::postgrest::SupabaseStore;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let csv_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/guestlist.csv"));

    match import(&csv_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(RsvpError::ImportIntegrity(issues)) => {
            eprintln!("Import aborted, nothing was written. Fix these rows and run again:");
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Import failed: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn import(csv_path: &Path) -> Result<(), RsvpError> {
    let config = StoreConfig::from_env()?;
    let store = SupabaseStore::new(&config.base_url, &config.api_key)?;

    let rows = reconcile::read_guest_csv(csv_path)?;
    log::info!("read {} rows from {}", rows.len(), csv_path.display());

    let summary = reconcile::import_guest_list(&store, &rows).await?;
    println!(
        "Imported {} rows: {} new, {} existing (RSVP data preserved), {} weekend, {} friday, {} new parties",
        summary.total_rows,
        summary.new_guests,
        summary.existing_guests,
        summary.weekend_invites,
        summary.friday_invites,
        summary.new_parties
    );
    Ok(())
}
