//! Single-card rendering (`greetcard render ...`).

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use greetcard::export::{digest, single_file_name};
use greetcard::render_to_png;

use crate::cli::utils::{Context, write_output};

/// Args for `greetcard render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template id.
    pub id: String,
    /// Recipient name substituted for `[name]`.
    #[arg(long, default_value = "")]
    pub name: String,
    /// Output PNG file (`-` for stdout). Defaults to `greeting_card_<name>.png`.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

/// Execute the render command.
pub async fn handle(ctx: &Context, args: RenderArgs) -> Result<()> {
    let template = ctx.template(&args.id)?;
    let renderer = ctx.renderer()?;
    let png = render_to_png(&renderer, &template, &args.name)
        .await
        .with_context(|| format!("failed to render template '{}'", template.id))?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(single_file_name(&args.name)));
    write_output(&output, &png)?;
    if output.as_os_str() != "-" {
        println!(
            "Rendered {} -> {} (sha256 {})",
            template.name,
            output.display(),
            digest(&png)
        );
    }
    Ok(())
}
