use call_intake::document;
use call_intake::error::AppError;
use call_intake::storage::StoreError;
use call_intake::submission::Submission;
use chrono::Utc;
use clap::Args;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    /// Archived submission JSON (`<request id>.json`)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Destination of the rendered PDF
    #[arg(long)]
    pub(crate) output: PathBuf,
}

pub(crate) fn run_render(args: RenderArgs) -> Result<(), AppError> {
    render_file(&args.input, &args.output)?;
    println!("Rendered {} -> {}", args.input.display(), args.output.display());
    Ok(())
}

/// Uses the same tolerant reading as the export route.
pub(crate) fn render_file(input: &Path, output: &Path) -> Result<(), AppError> {
    let bytes = std::fs::read(input)?;
    let raw: serde_json::Value = serde_json::from_slice(&bytes).map_err(StoreError::from)?;
    let submission = Submission::from_archive(&raw);

    let sink = BufWriter::new(File::create(output)?);
    document::render(&submission, Utc::now(), sink)?;
    Ok(())
}
