//! Wedding guest list service: RSVP lookup and submission, CSV guest
//! list reconciliation, and the scheduled keep-alive ping plus weekly
//! email report, all backed by a Supabase PostgREST store.

pub mod config;
pub mod error;
pub mod form;
pub mod lookup;
pub mod mailer;
pub mod maintenance;
pub mod reconcile;
pub mod report;
pub mod store;
pub mod types;
