//! Tracker tasks: deriving name/notes/labels from a submission and the
//! REST client that files them.

mod client;
mod mapping;

pub use crate::config::{LabelId, LabelTable};
pub use client::{MeisterTaskClient, TaskId, TrackerError, TrackerGateway};
pub use mapping::{is_already_interested, package_label, TaskDraft};
