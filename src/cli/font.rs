//! Font management (`greetcard font ...`).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use greetcard::FontBook;

use crate::cli::utils::Context;

/// Font subcommands.
#[derive(Subcommand, Debug)]
pub enum FontCommand {
    /// Install a `.ttf`/`.otf` font; its family is the file name.
    Add(FontAddArgs),
    /// List installed font families.
    List,
}

#[derive(Args, Debug)]
pub struct FontAddArgs {
    /// Font file to install.
    pub file: PathBuf,
}

/// Execute a font command.
pub fn handle(ctx: &Context, command: FontCommand) -> Result<()> {
    match command {
        FontCommand::Add(args) => add(ctx, args),
        FontCommand::List => list(ctx),
    }
}

fn add(ctx: &Context, args: FontAddArgs) -> Result<()> {
    // Parse before copying so a broken file never lands in the fonts dir.
    let family = FontBook::new().load_file(&args.file)?;
    let dir = ctx.config.fonts_dir();
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let file_name = args
        .file
        .file_name()
        .with_context(|| format!("{} has no file name", args.file.display()))?;
    let target = dir.join(file_name);
    fs::copy(&args.file, &target)
        .with_context(|| format!("failed to copy {}", args.file.display()))?;
    println!("Installed font family {} -> {}", family, target.display());
    Ok(())
}

fn list(ctx: &Context) -> Result<()> {
    let book = ctx.font_book()?;
    let families: Vec<&str> = book.families().collect();
    if families.is_empty() {
        println!("No fonts installed; text uses the built-in face");
        return Ok(());
    }
    println!("Font families:");
    for family in families {
        println!("  - {family}");
    }
    if let Some(default) = &ctx.config.default_font {
        println!("Default: {default}");
    }
    Ok(())
}
