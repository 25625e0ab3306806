//! Bulk export (`greetcard bulk ...`).

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Args;
use greetcard::bulk::{archive_file_name, read_name_list};
use greetcard::{BulkOptions, bulk_render};

use crate::cli::common::{CollisionArg, OnErrorArg};
use crate::cli::utils::{Context, write_output};

/// Args for `greetcard bulk`.
#[derive(Args, Debug)]
pub struct BulkArgs {
    /// Template id.
    pub id: String,
    /// Name list, one name per line (`.csv` or `.txt`).
    pub names: PathBuf,
    /// Output ZIP file. Defaults to a timestamped `greeting_cards_*.zip`.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Override the configured failure policy.
    #[arg(long = "on-error", value_enum)]
    pub on_error: Option<OnErrorArg>,
    /// Override the configured collision policy.
    #[arg(long, value_enum)]
    pub collisions: Option<CollisionArg>,
}

/// Execute the bulk command.
pub async fn handle(ctx: &Context, args: BulkArgs) -> Result<()> {
    let template = ctx.template(&args.id)?;
    let raw = read_name_list(&args.names)
        .with_context(|| format!("failed to read name list {}", args.names.display()))?;
    let options = BulkOptions {
        on_error: args.on_error.map(Into::into).unwrap_or(ctx.config.on_error),
        collisions: args.collisions.map(Into::into).unwrap_or(ctx.config.collisions),
    };
    let renderer = ctx.renderer()?;

    let mut stderr = io::stderr();
    let report = bulk_render(&renderer, &template, &raw, &options, |percent| {
        let _ = write!(stderr, "\rGenerating cards... {percent:>3}%");
        let _ = stderr.flush();
    })
    .await;
    eprintln!();
    let report = report.with_context(|| format!("bulk export of '{}' failed", template.id))?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(archive_file_name(Utc::now())));
    write_output(&output, &report.archive)?;
    println!(
        "Generated {} cards -> {}",
        report.rendered,
        output.display()
    );
    for skipped in &report.skipped {
        println!("  skipped {:?}: {}", skipped.name, skipped.reason);
    }
    Ok(())
}
