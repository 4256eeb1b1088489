//! Scheduled store maintenance: keep-alive ping and weekly report.
//!
//! Standalone binary fired on two cron cadences. The scheduler passes
//! the triggering cron expression in SCHEDULE_TYPE: a five-minute
//! expression (`*/5 ...`) means ping only, the Sunday expression
//! (`... * * 0`) means send the weekly report, and an unset variable
//! (manual run) does both.
//!
//! Usage: `ping_report` with SUPABASE_URL and SUPABASE_ANON_KEY set;
//! report runs additionally need EMAIL_USER and EMAIL_PASS (and may set
//! RECIPIENT_EMAIL, SMTP_RELAY, REPORT_TIMEZONE).

use std::process::ExitCode;

use chrono::Utc;

use guestlist::config::{MailConfig, ReportConfig, StoreConfig};
use guestlist::error::RsvpError;
use guestlist::mailer::{ReportMailer, SmtpReportMailer};
use guestlist::maintenance;
use guestlist::store::postgrest::SupabaseStore;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Maintenance run failed: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), RsvpError> {
    let store_config = StoreConfig::from_env()?;
    let store = SupabaseStore::new(&store_config.base_url, &store_config.api_key)?;
    let report_config = ReportConfig::from_env()?;
    let hint = std::env::var("SCHEDULE_TYPE").ok();

    maintenance::run(
        &store,
        report_config.timezone,
        hint.as_deref(),
        Utc::now(),
        || {
            let mail = MailConfig::from_env()?;
            let mailer = SmtpReportMailer::from_config(&mail)?;
            Ok(Box::new(mailer) as Box<dyn ReportMailer>)
        },
    )
    .await
}
