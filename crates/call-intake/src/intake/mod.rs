//! The webhook surface: `POST /submit` accepts form deliveries and
//! `GET /export` re-renders archived submissions.

pub mod router;
pub mod service;
mod stream;

#[cfg(test)]
mod tests;

pub use router::intake_router;
pub use service::{ExportError, IntakeService, SubmitError, SubmitReceipt, TaskReport};
pub use stream::document_body;
