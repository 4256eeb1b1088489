//! Error types for the RSVP flows
//!
//! Errors are classified by who has to act on them:
//! - Validation / NotFound: the caller sent something we can answer
//!   directly, no store involvement needed
//! - Store / Mail: a backing service misbehaved, worth retrying
//! - ImportIntegrity: the guest list CSV is inconsistent and the whole
//!   import was aborted

use thiserror::Error;

use crate::mailer::MailError;
use crate::reconcile::RowIssue;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum RsvpError {
    /// Input rejected before any store access.
    #[error("{0}")]
    Validation(String),

    /// Lookup matched nothing. Carries the guidance shown to guests.
    #[error("{0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// One or more CSV rows failed validation; nothing was written.
    #[error("import aborted: {} invalid row(s)", .0.len())]
    ImportIntegrity(Vec<RowIssue>),

    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not read guest list: {0}")]
    CsvRead(String),
}

impl RsvpError {
    /// Whether retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RsvpError::Store(_) | RsvpError::Mail(_))
    }

    /// Whether the caller's input (not our infrastructure) is at fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RsvpError::Validation(_) | RsvpError::NotFound(_) | RsvpError::ImportIntegrity(_)
        )
    }
}

impl From<csv::Error> for RsvpError {
    fn from(err: csv::Error) -> Self {
        RsvpError::CsvRead(err.to_string())
    }
}
