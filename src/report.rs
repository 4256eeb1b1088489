//! Weekly RSVP report: aggregate numbers and the narrative email body.
//!
//! Everything here is pure so it can be tested against fixed guest
//! lists; fetching and sending live in [`crate::maintenance`]. The
//! aggregation works from two slices: every guest, and the guests whose
//! rows changed in the trailing seven days.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

use crate::types::{
    attendance_label, Guest, InvitationType, Party, ACCOMMODATION_BOOKING_OWN,
    ACCOMMODATION_STAYING, DURATION_FRIDAY_ONLY, DURATION_FULL_WEEKEND, DURATION_OTHER,
};

/// One week's headline numbers. Serialized as the structured log record
/// accompanying every sent report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyStats {
    pub total_guests: usize,
    pub total_accepted: usize,
    pub total_declined: usize,
    pub total_pending: usize,
    pub weekly_accepted: usize,
    pub weekly_declined: usize,
    pub total_parties: usize,
    pub parties_accepted: usize,
    pub parties_pending: usize,
    /// Integer percent of guests who accepted, 0 when nobody is invited.
    pub acceptance_rate: u32,
    pub weekend_invited: usize,
    pub friday_invited: usize,
    pub weekend_accepted: usize,
    pub friday_accepted: usize,
}

/// Aggregate the two guest slices into headline numbers.
pub fn weekly_stats(all: &[Guest], recent: &[Guest]) -> WeeklyStats {
    let total_guests = all.len();
    let total_accepted = all.iter().filter(|g| g.is_attending == Some(true)).count();
    let total_declined = all.iter().filter(|g| g.is_attending == Some(false)).count();
    let total_pending = all.iter().filter(|g| g.is_attending.is_none()).count();

    let parties: HashSet<Uuid> = all.iter().map(|g| g.party_id).collect();
    let parties_accepted: HashSet<Uuid> = all
        .iter()
        .filter(|g| g.is_attending == Some(true))
        .map(|g| g.party_id)
        .collect();
    let parties_pending: HashSet<Uuid> = all
        .iter()
        .filter(|g| g.is_attending.is_none())
        .map(|g| g.party_id)
        .collect();

    let of_type = |t: InvitationType| all.iter().filter(move |g| g.invitation_type == t);

    WeeklyStats {
        total_guests,
        total_accepted,
        total_declined,
        total_pending,
        weekly_accepted: recent.iter().filter(|g| g.is_attending == Some(true)).count(),
        weekly_declined: recent.iter().filter(|g| g.is_attending == Some(false)).count(),
        total_parties: parties.len(),
        parties_accepted: parties_accepted.len(),
        parties_pending: parties_pending.len(),
        acceptance_rate: if total_guests == 0 {
            0
        } else {
            ((total_accepted as f64 / total_guests as f64) * 100.0).round() as u32
        },
        weekend_invited: of_type(InvitationType::Weekend).count(),
        friday_invited: of_type(InvitationType::Friday).count(),
        weekend_accepted: of_type(InvitationType::Weekend)
            .filter(|g| g.is_attending == Some(true))
            .count(),
        friday_accepted: of_type(InvitationType::Friday)
            .filter(|g| g.is_attending == Some(true))
            .count(),
    }
}

/// Subject line for the weekly email, dated in the report timezone.
pub fn report_subject(now: DateTime<Utc>, tz: Tz) -> String {
    format!(
        "Wedding RSVP Report - Week of {}",
        now.with_timezone(&tz).format("%b %-d")
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn section_heading(title: &str) -> String {
    format!("<h3 style=\"color: #8B7355;\">{}</h3>\n", title)
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Render the weekly email body.
///
/// `all` should be every guest, `recent` the trailing-week slice used
/// for `stats`, and `parties` every party (logistics live there). The
/// section set follows the couple's long-standing email: weekly
/// activity, overall statistics, party progress, accommodation for
/// weekend guests, durations, then songs, dietary needs and messages
/// whenever there are any.
pub fn render_report_html(
    stats: &WeeklyStats,
    all: &[Guest],
    recent: &[Guest],
    parties: &[Party],
    generated_at: DateTime<Utc>,
    tz: Tz,
) -> String {
    let party_index: HashMap<Uuid, &Party> = parties.iter().map(|p| (p.id, p)).collect();
    let party_name = |guest: &Guest| party_index.get(&guest.party_id).map(|p| p.name.as_str());
    let label = |guest: &Guest| match party_name(guest) {
        Some(name) => format!("{} ({})", escape_html(&guest.full_name), escape_html(name)),
        None => escape_html(&guest.full_name),
    };

    let attending: Vec<&Guest> = all.iter().filter(|g| g.is_attending == Some(true)).collect();
    let attending_parties: HashSet<Uuid> = attending.iter().map(|g| g.party_id).collect();

    let mut html = String::new();
    html.push_str(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\n",
    );
    html.push_str("<h2 style=\"color: #8B7355;\">Weekly Wedding RSVP Report</h2>\n");
    html.push_str(&format!(
        "<p style=\"color: #666;\">Report generated: {}</p>\n",
        generated_at
            .with_timezone(&tz)
            .format("%A, %B %-d, %Y at %I:%M %p")
    ));
    html.push_str("<hr style=\"border: 1px solid #ddd; margin: 20px 0;\">\n");

    // This week's activity: counts plus every answered response.
    html.push_str(&section_heading("This Week's Activity"));
    html.push_str("<div style=\"background: #f9f9f9; padding: 15px; border-radius: 8px;\">\n");
    html.push_str(&format!(
        "<p><strong>{}</strong> new acceptances | <strong>{}</strong> new declines</p>\n",
        stats.weekly_accepted, stats.weekly_declined
    ));
    let recent_items: Vec<String> = recent
        .iter()
        .filter(|g| g.is_attending.is_some())
        .map(|g| format!("<li>{} - {}</li>", label(g), attendance_label(g.is_attending)))
        .collect();
    if recent_items.is_empty() {
        html.push_str("<p style=\"color: #999;\">No new responses this week</p>\n");
    } else {
        html.push_str(&format!("<ul>{}</ul>\n", recent_items.join("")));
    }
    html.push_str("</div>\n");

    // Overall statistics table.
    html.push_str(&section_heading("Overall Statistics"));
    html.push_str("<div style=\"background: #f0f8f0; padding: 15px; border-radius: 8px;\">\n");
    html.push_str("<table style=\"width: 100%; border-collapse: collapse;\">\n");
    html.push_str(&format!(
        "<tr><td><strong>Accepted:</strong></td><td style=\"text-align: right;\">{} of {} guests ({}%)</td></tr>\n",
        stats.total_accepted, stats.total_guests, stats.acceptance_rate
    ));
    html.push_str(&format!(
        "<tr><td><strong>Declined:</strong></td><td style=\"text-align: right;\">{} guests</td></tr>\n",
        stats.total_declined
    ));
    html.push_str(&format!(
        "<tr><td><strong>Pending:</strong></td><td style=\"text-align: right;\">{} guests</td></tr>\n",
        stats.total_pending
    ));
    html.push_str(&format!(
        "<tr style=\"border-top: 2px solid #8B7355;\"><td><strong>Weekend Guests:</strong></td><td style=\"text-align: right;\">{} of {} accepted</td></tr>\n",
        stats.weekend_accepted, stats.weekend_invited
    ));
    html.push_str(&format!(
        "<tr><td><strong>Friday Only Guests:</strong></td><td style=\"text-align: right;\">{} of {} accepted</td></tr>\n",
        stats.friday_accepted, stats.friday_invited
    ));
    html.push_str("</table>\n</div>\n");

    // Party progress with the pending list tucked behind a disclosure.
    html.push_str(&section_heading("Party Progress"));
    html.push_str("<div style=\"background: #f9f9f9; padding: 15px; border-radius: 8px;\">\n");
    html.push_str(&format!(
        "<p><strong>Confirmed parties:</strong> {} of {}</p>\n",
        stats.parties_accepted, stats.total_parties
    ));
    html.push_str(&format!(
        "<p><strong>Pending parties:</strong> {}</p>\n",
        stats.parties_pending
    ));
    let pending_parties: BTreeSet<&str> = all
        .iter()
        .filter(|g| g.is_attending.is_none())
        .filter_map(|g| party_name(g))
        .collect();
    if !pending_parties.is_empty() {
        let items: Vec<String> = pending_parties
            .iter()
            .map(|name| format!("<li>{}</li>", escape_html(name)))
            .collect();
        html.push_str(&format!(
            "<details><summary style=\"cursor: pointer; color: #8B7355;\"><strong>View pending parties</strong></summary><ul>{}</ul></details>\n",
            items.join("")
        ));
    }
    html.push_str("</div>\n");

    // Accommodation is a weekend-guest question only.
    let weekend_attending: Vec<&Guest> = attending
        .iter()
        .copied()
        .filter(|g| g.invitation_type == InvitationType::Weekend)
        .collect();
    let accommodation_of = |guest: &Guest| {
        party_index
            .get(&guest.party_id)
            .and_then(|p| p.accommodation_choice.as_deref())
    };
    let staying = weekend_attending
        .iter()
        .filter(|g| accommodation_of(g) == Some(ACCOMMODATION_STAYING))
        .count();
    let booking = weekend_attending
        .iter()
        .filter(|g| accommodation_of(g) == Some(ACCOMMODATION_BOOKING_OWN))
        .count();
    html.push_str(&section_heading("Accommodation (Weekend Guests Only)"));
    html.push_str("<div style=\"background: #f9f9f9; padding: 15px; border-radius: 8px;\">\n");
    html.push_str(&format!("<p><strong>Staying with us:</strong> {} guests</p>\n", staying));
    html.push_str(&format!("<p><strong>Booking own:</strong> {} guests</p>\n", booking));
    if weekend_attending.len() > staying + booking {
        html.push_str(&format!(
            "<p style=\"color: #d97706;\"><strong>Not specified:</strong> {} guests</p>\n",
            weekend_attending.len() - staying - booking
        ));
    }
    html.push_str("</div>\n");

    // Duration applies to everyone attending.
    let duration_of = |guest: &Guest| {
        party_index
            .get(&guest.party_id)
            .and_then(|p| p.weekend_duration.as_deref())
    };
    let full_weekend = attending
        .iter()
        .filter(|g| duration_of(g) == Some(DURATION_FULL_WEEKEND))
        .count();
    let friday_only = attending
        .iter()
        .filter(|g| duration_of(g) == Some(DURATION_FRIDAY_ONLY))
        .count();
    let other = attending
        .iter()
        .filter(|g| duration_of(g) == Some(DURATION_OTHER))
        .count();
    html.push_str(&section_heading("Weekend Duration (All Attending)"));
    html.push_str("<div style=\"background: #f9f9f9; padding: 15px; border-radius: 8px;\">\n");
    html.push_str(&format!(
        "<p><strong>Full Weekend (Fri-Sun):</strong> {} guests</p>\n",
        full_weekend
    ));
    html.push_str(&format!("<p><strong>Friday Only:</strong> {} guests</p>\n", friday_only));
    if other > 0 {
        html.push_str(&format!("<p><strong>Other/Custom:</strong> {} guests</p>\n", other));
    }
    html.push_str("</div>\n");

    // One song per party, counted once no matter how many members come.
    let song_items: Vec<String> = parties
        .iter()
        .filter(|p| attending_parties.contains(&p.id) && has_text(&p.song_request))
        .filter_map(|p| {
            p.song_request.as_deref().map(|song| {
                format!(
                    "<li>{} <em>({})</em></li>",
                    escape_html(song.trim()),
                    escape_html(&p.name)
                )
            })
        })
        .collect();
    if !song_items.is_empty() {
        html.push_str(&section_heading(&format!("Song Requests ({})", song_items.len())));
        html.push_str("<div style=\"background: #fff9f0; padding: 15px; border-radius: 8px;\">\n");
        html.push_str(&format!("<ul style=\"margin: 0;\">{}</ul>\n", song_items.join("")));
        html.push_str("</div>\n");
    }

    let dietary_items: Vec<String> = attending
        .iter()
        .filter(|g| has_text(&g.dietary_preferences))
        .filter_map(|g| {
            g.dietary_preferences.as_deref().map(|text| {
                format!(
                    "<li><strong>{}:</strong> {}</li>",
                    escape_html(&g.full_name),
                    escape_html(text.trim())
                )
            })
        })
        .collect();
    if !dietary_items.is_empty() {
        html.push_str(&section_heading(&format!(
            "Dietary Requirements ({} guests)",
            dietary_items.len()
        )));
        html.push_str("<div style=\"background: #fff9f0; padding: 15px; border-radius: 8px;\">\n");
        html.push_str(&format!("<ul style=\"margin: 0;\">{}</ul>\n", dietary_items.join("")));
        html.push_str("</div>\n");
    }

    let message_items: Vec<String> = attending
        .iter()
        .filter(|g| has_text(&g.additional_message))
        .filter_map(|g| {
            g.additional_message.as_deref().map(|text| {
                format!("<li><strong>{}:</strong> {}</li>", label(g), escape_html(text.trim()))
            })
        })
        .collect();
    if !message_items.is_empty() {
        html.push_str(&section_heading("Guest Messages"));
        html.push_str("<div style=\"background: #f0f8ff; padding: 15px; border-radius: 8px;\">\n");
        html.push_str(&format!("<ul style=\"margin: 0;\">{}</ul>\n", message_items.join("")));
        html.push_str("</div>\n");
    }

    html.push_str("<hr style=\"border: 1px solid #ddd; margin: 20px 0;\">\n");
    html.push_str(
        "<p style=\"color: #888; font-size: 12px; text-align: center;\">This is an automated weekly report from your wedding website.</p>\n",
    );
    html.push_str("</div>\n");
    html
}
