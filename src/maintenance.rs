//! Scheduled maintenance: keep-alive pings and the weekly report.
//!
//! Both cadences funnel through one entry point; the triggering cron
//! expression arrives as a hint string and decides what the run does.
//! A failed ping is logged and swallowed so the free-tier keep-alive
//! never crash-loops, while report failures propagate and fail the run.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::error::RsvpError;
use crate::mailer::ReportMailer;
use crate::report::{render_report_html, report_subject, weekly_stats, WeeklyStats};
use crate::store::GuestStore;
use crate::types::{Guest, Party};

/// What a maintenance invocation should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMode {
    pub ping: bool,
    pub report: bool,
}

impl RunMode {
    /// Read the cadence from the triggering schedule expression.
    ///
    /// A five-minute cron carries `*/5`, the weekly Sunday cron carries
    /// `* * 0`, and a missing hint (manual invocation) does both.
    pub fn from_hint(hint: Option<&str>) -> RunMode {
        match hint {
            Some(h) if !h.trim().is_empty() => RunMode {
                ping: h.contains("*/5"),
                report: h.contains("* * 0"),
            },
            _ => RunMode {
                ping: true,
                report: true,
            },
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match (self.ping, self.report) {
            (true, true) => "ping+report",
            (true, false) => "ping",
            (false, true) => "report",
            (false, false) => "none",
        })
    }
}

/// One cheap read to keep the free-tier store from pausing.
///
/// Returns whether it worked; failure is logged, never fatal.
pub async fn ping(store: &dyn GuestStore) -> bool {
    match store.ping().await {
        Ok(()) => {
            log::info!("database ping successful");
            true
        }
        Err(err) => {
            log::warn!("database ping failed: {}", err);
            false
        }
    }
}

/// Everything a report render needs, fetched in one pass.
pub struct ReportData {
    pub stats: WeeklyStats,
    pub all: Vec<Guest>,
    pub recent: Vec<Guest>,
    pub parties: Vec<Party>,
}

/// Fetch all guests, the trailing-week slice and the parties.
pub async fn collect_report(
    store: &dyn GuestStore,
    now: DateTime<Utc>,
) -> Result<ReportData, RsvpError> {
    let all = store.all_guests().await?;
    let recent = store.guests_updated_since(now - Duration::days(7)).await?;
    let parties = store.all_parties().await?;
    let stats = weekly_stats(&all, &recent);
    Ok(ReportData {
        stats,
        all,
        recent,
        parties,
    })
}

/// Collect, render and deliver the weekly report.
///
/// Unlike [`ping`], every failure here propagates; the operator finds
/// out through the failed run rather than a silently missing email.
pub async fn send_weekly_report(
    store: &dyn GuestStore,
    mailer: &dyn ReportMailer,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<WeeklyStats, RsvpError> {
    let data = collect_report(store, now).await?;
    log::info!(
        "weekly stats: {}",
        serde_json::to_string(&data.stats).unwrap_or_default()
    );

    let html = render_report_html(&data.stats, &data.all, &data.recent, &data.parties, now, tz);
    let subject = report_subject(now, tz);
    mailer.send(&subject, &html).await?;
    Ok(data.stats)
}

/// One maintenance invocation: always ping, report when asked.
///
/// The mailer is built lazily so ping-cadence runs never need mail
/// credentials in their environment.
pub async fn run<M>(
    store: &dyn GuestStore,
    tz: Tz,
    hint: Option<&str>,
    now: DateTime<Utc>,
    make_mailer: M,
) -> Result<(), RsvpError>
where
    M: FnOnce() -> Result<Box<dyn ReportMailer>, RsvpError>,
{
    let mode = RunMode::from_hint(hint);
    log::info!("maintenance run starting in {} mode", mode);

    ping(store).await;

    if mode.report {
        let mailer = make_mailer()?;
        let stats = send_weekly_report(store, mailer.as_ref(), tz, now).await?;
        log::info!(
            "weekly report sent ({} of {} guests accepted)",
            stats.total_accepted,
            stats.total_guests
        );
    }

    log::info!("maintenance run complete");
    Ok(())
}
