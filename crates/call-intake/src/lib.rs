//! Intake pipeline for call applications submitted through the website form.
//!
//! A submission is archived as raw JSON, validated, rendered into a PDF
//! summary and turned into a tracker task. Applicants optionally receive a
//! confirmation email. Archived submissions can be re-rendered on demand.

pub mod config;
pub mod document;
pub mod error;
pub mod intake;
pub mod mailer;
pub mod storage;
pub mod submission;
pub mod telemetry;
pub mod tracker;
