//! The PDF summary attached to tracker tasks and served by the export route.

mod fonts;
mod layout;
mod pdf;

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::submission::Submission;

pub use fonts::Font;
pub use layout::{layout, Layout, Page, TextRun, CONTENT_WIDTH, MARGIN, PAGE_HEIGHT, PAGE_WIDTH};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to assemble pdf: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to write pdf: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders the summary into `sink`, writing as the document is serialized.
///
/// The sink is flushed on success and dropped on failure, so a streaming
/// consumer always sees the end of the output.
pub fn render<W: Write>(
    submission: &Submission,
    rendered_at: DateTime<Utc>,
    mut sink: W,
) -> Result<(), RenderError> {
    let layout = layout(submission, rendered_at);
    pdf::write_pdf(&layout, &mut sink)
}

/// Renders the summary into memory, for uploads that need the whole body.
pub fn render_to_vec(
    submission: &Submission,
    rendered_at: DateTime<Utc>,
) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    render(submission, rendered_at, &mut bytes)?;
    Ok(bytes)
}
