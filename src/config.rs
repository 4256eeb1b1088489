//! Environment-backed configuration.
//!
//! Each runtime surface reads only the variables it needs: the store
//! credentials are always required, while mail settings are read only
//! when a report is actually going to be sent.

use std::env;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::error::RsvpError;

fn required_var(name: &str) -> Result<String, RsvpError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(RsvpError::Config(format!("{} is not set", name))),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
}

impl StoreConfig {
    pub fn from_env() -> Result<StoreConfig, RsvpError> {
        Ok(StoreConfig {
            base_url: required_var("SUPABASE_URL")?,
            api_key: required_var("SUPABASE_ANON_KEY")?,
        })
    }
}

// ============================================================================
// Mail
// ============================================================================

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_relay: String,
    pub username: String,
    pub password: String,
    /// Defaults to the sending account when RECIPIENT_EMAIL is unset.
    pub recipient: String,
}

impl MailConfig {
    pub fn from_env() -> Result<MailConfig, RsvpError> {
        let username = required_var("EMAIL_USER")?;
        let password = required_var("EMAIL_PASS")?;
        let recipient = optional_var("RECIPIENT_EMAIL").unwrap_or_else(|| username.clone());
        Ok(MailConfig {
            smtp_relay: optional_var("SMTP_RELAY").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            username,
            password,
            recipient,
        })
    }
}

// ============================================================================
// Report
// ============================================================================

/// When a party's song request is kept on submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongRequestPolicy {
    /// Save the request even when the whole party declines. A declining
    /// party can still put a song on the playlist.
    Always,
    /// Clear it along with the other logistics when nobody attends.
    AttendingOnly,
}

impl Default for SongRequestPolicy {
    fn default() -> Self {
        SongRequestPolicy::Always
    }
}

impl FromStr for SongRequestPolicy {
    type Err = RsvpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(SongRequestPolicy::Always),
            "attending_only" | "attending-only" => Ok(SongRequestPolicy::AttendingOnly),
            other => Err(RsvpError::Config(format!(
                "invalid SONG_REQUEST_POLICY \"{}\" (expected always or attending_only)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Timezone used for timestamps in the rendered report.
    pub timezone: Tz,
}

impl ReportConfig {
    pub fn from_env() -> Result<ReportConfig, RsvpError> {
        let timezone = match optional_var("REPORT_TIMEZONE") {
            Some(name) => parse_timezone(&name)?,
            None => chrono_tz::Europe::Brussels,
        };
        Ok(ReportConfig { timezone })
    }
}

pub fn song_policy_from_env() -> Result<SongRequestPolicy, RsvpError> {
    match optional_var("SONG_REQUEST_POLICY") {
        Some(value) => value.parse(),
        None => Ok(SongRequestPolicy::default()),
    }
}

fn parse_timezone(name: &str) -> Result<Tz, RsvpError> {
    name.parse::<Tz>()
        .map_err(|_| RsvpError::Config(format!("invalid REPORT_TIMEZONE \"{}\"", name)))
}
