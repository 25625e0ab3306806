//! Command-line interface wiring for the `greetcard` binary.
//!
//! This module owns the clap definitions and delegates execution to
//! submodules for each command family.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod bulk;
pub mod common;
pub mod font;
pub mod render;
pub mod template;
pub mod utils;

/// Parsed CLI entrypoint for the `greetcard` binary.
#[derive(Parser, Debug)]
#[command(name = "greetcard", version, about = "Personalized greeting card renderer")]
pub struct Cli {
    /// Directory holding templates, fonts and uploaded images.
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,
    /// Explicit JSON config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Extra directory scanned for `.ttf`/`.otf` fonts.
    #[arg(long = "font-dir", global = true)]
    pub font_dirs: Vec<PathBuf>,
    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Top-level command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// High-level command families made available to end users.
#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Template(template::TemplateCommand),
    /// Render one personalized card to PNG.
    Render(render::RenderArgs),
    /// Render one card per name into a ZIP archive.
    Bulk(bulk::BulkArgs),
    #[command(subcommand)]
    Font(font::FontCommand),
}

/// Execute the requested command.
pub async fn run(cli: Cli) -> Result<()> {
    let ctx = utils::Context::load(&cli)?;
    match cli.command {
        Command::Template(cmd) => template::handle(&ctx, cmd).await,
        Command::Render(args) => render::handle(&ctx, args).await,
        Command::Bulk(args) => bulk::handle(&ctx, args).await,
        Command::Font(cmd) => font::handle(&ctx, cmd),
    }
}
