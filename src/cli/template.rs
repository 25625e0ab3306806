//! Template designer commands (`greetcard template ...`).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use clap::{Args, Subcommand};
use greetcard::loader::image_file_size;
use greetcard::template::{canonical_size, validate_name};
use greetcard::{CardTemplate, ImageLoader, SourceLoader, TemplateStore, TextRegion};

use crate::cli::common::{AlignArg, DirectionArg};
use crate::cli::utils::Context;

/// Template subcommands.
#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Create a template from a background image.
    Create(TemplateCreateArgs),
    /// List stored templates.
    List,
    /// Show a template and its text regions.
    Show(TemplateIdArgs),
    /// Delete a stored template.
    Delete(TemplateIdArgs),
    /// Append a text region with default geometry and style.
    AddRegion(TemplateIdArgs),
    /// Change fields of an existing text region.
    UpdateRegion(RegionArgs),
    /// Remove a text region.
    RemoveRegion(RegionIdArgs),
    /// Print the shareable link for a template.
    Link(TemplateLinkArgs),
}

/// Arguments for `greetcard template create`.
#[derive(Args, Debug)]
pub struct TemplateCreateArgs {
    /// Display name of the template.
    #[arg(long)]
    pub name: String,
    /// Background image: a local PNG/JPEG file, an `http(s)://` URL or a
    /// base64 `data:` URL.
    #[arg(long)]
    pub image: String,
    /// Add one default `[name]` region right away.
    #[arg(long = "with-region")]
    pub with_region: bool,
}

#[derive(Args, Debug)]
pub struct TemplateIdArgs {
    /// Template id.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct RegionIdArgs {
    /// Template id.
    pub id: String,
    /// Region id.
    pub region: String,
}

/// Arguments for `greetcard template update-region`; unset fields are kept.
#[derive(Args, Debug)]
pub struct RegionArgs {
    /// Template id.
    pub id: String,
    /// Region id.
    pub region: String,
    /// Text with `[name]` placeholders.
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub x: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub y: Option<i32>,
    #[arg(long)]
    pub width: Option<i32>,
    #[arg(long)]
    pub height: Option<i32>,
    /// CSS-style family list, e.g. `"Amiri", serif`.
    #[arg(long)]
    pub font: Option<String>,
    #[arg(long = "font-size")]
    pub font_size: Option<u32>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long, value_enum)]
    pub align: Option<AlignArg>,
    #[arg(long, value_enum)]
    pub direction: Option<DirectionArg>,
}

#[derive(Args, Debug)]
pub struct TemplateLinkArgs {
    /// Template id.
    pub id: String,
    /// Base URL of the site serving cards.
    #[arg(long = "base-url", default_value = "http://localhost:3000")]
    pub base_url: String,
}

/// Execute a template command.
pub async fn handle(ctx: &Context, command: TemplateCommand) -> Result<()> {
    match command {
        TemplateCommand::Create(args) => create(ctx, args).await,
        TemplateCommand::List => list(ctx),
        TemplateCommand::Show(args) => show(ctx, args),
        TemplateCommand::Delete(args) => delete(ctx, args),
        TemplateCommand::AddRegion(args) => add_region(ctx, args),
        TemplateCommand::UpdateRegion(args) => update_region(ctx, args),
        TemplateCommand::RemoveRegion(args) => remove_region(ctx, args),
        TemplateCommand::Link(args) => link(ctx, args),
    }
}

/// Sources kept as references instead of being copied into the data dir.
fn is_remote(source: &str) -> bool {
    ["http://", "https://", "data:"].iter().any(|scheme| source.starts_with(scheme))
}

async fn create(ctx: &Context, args: TemplateCreateArgs) -> Result<()> {
    validate_name(&args.name)?;
    let mut template = CardTemplate::new(args.name.trim(), "", 0, 0);

    let (source_width, source_height) = if is_remote(&args.image) {
        let loader = SourceLoader::new(ctx.config.image_timeout())?;
        let image = loader.load(&args.image).await?;
        template.image_url = args.image.clone();
        (image.width(), image.height())
    } else {
        let source = PathBuf::from(&args.image);
        let size = image_file_size(&source)?;
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
            .to_lowercase();
        let images = ctx.images_dir();
        fs::create_dir_all(&images)
            .with_context(|| format!("failed to create {}", images.display()))?;
        let stored = images.join(format!("{}.{ext}", template.id));
        fs::copy(&source, &stored)
            .with_context(|| format!("failed to copy {}", source.display()))?;
        let stored = stored.canonicalize().unwrap_or(stored);
        template.image_url = stored.display().to_string();
        size
    };

    let (width, height) = canonical_size(source_width, source_height, ctx.config.canonical_width);
    template.image_width = width;
    template.image_height = height;
    if args.with_region {
        template.add_region();
    }
    ctx.store.save(&template)?;
    println!(
        "Created template {} ({}, {}x{})",
        template.id, template.name, width, height
    );
    Ok(())
}

fn list(ctx: &Context) -> Result<()> {
    let templates = ctx.store.list()?;
    if templates.is_empty() {
        println!("No templates stored in {}", ctx.store.dir().display());
        return Ok(());
    }
    println!("Templates:");
    for tpl in templates {
        println!(
            "  - {}: {} ({}x{}, {} regions)",
            tpl.id,
            tpl.name,
            tpl.image_width,
            tpl.image_height,
            tpl.text_areas.len()
        );
    }
    Ok(())
}

fn show(ctx: &Context, args: TemplateIdArgs) -> Result<()> {
    let tpl = ctx.template(&args.id)?;
    println!("Template: {} ({})", tpl.name, tpl.id);
    println!("Image: {} ({}x{})", tpl.image_url, tpl.image_width, tpl.image_height);
    for region in &tpl.text_areas {
        println!(
            "  {} @ {},{} {}x{} {}px {} {} {} {}: {:?}",
            region.id,
            region.x,
            region.y,
            region.width,
            region.height,
            region.font_size,
            region.font_family,
            region.color,
            region.alignment,
            region.direction,
            region.content
        );
    }
    Ok(())
}

fn delete(ctx: &Context, args: TemplateIdArgs) -> Result<()> {
    ctx.store
        .delete(&args.id)
        .with_context(|| format!("failed to delete template '{}'", args.id))?;
    println!("Deleted template {}", args.id);
    Ok(())
}

fn add_region(ctx: &Context, args: TemplateIdArgs) -> Result<()> {
    let mut tpl = ctx.template(&args.id)?;
    let region = tpl.add_region();
    ctx.store.save(&tpl)?;
    println!("Added region {} to {}", region, tpl.id);
    Ok(())
}

fn update_region(ctx: &Context, args: RegionArgs) -> Result<()> {
    let mut tpl = ctx.template(&args.id)?;
    let mut region: TextRegion = tpl
        .region(&args.region)
        .cloned()
        .ok_or_else(|| anyhow!("template '{}' has no region '{}'", args.id, args.region))?;
    if let Some(content) = args.content {
        region.content = content;
    }
    if let Some(x) = args.x {
        region.x = x;
    }
    if let Some(y) = args.y {
        region.y = y;
    }
    if let Some(width) = args.width {
        region.width = width;
    }
    if let Some(height) = args.height {
        region.height = height;
    }
    if let Some(font) = args.font {
        region.font_family = font;
    }
    if let Some(size) = args.font_size {
        region.font_size = size;
    }
    if let Some(color) = args.color {
        region.color = color;
    }
    if let Some(align) = args.align {
        region.alignment = align.into();
    }
    if let Some(direction) = args.direction {
        region.direction = direction.into();
    }
    tpl.update_region(region)?;
    ctx.store.save(&tpl)?;
    println!("Updated region {} in {}", args.region, tpl.id);
    Ok(())
}

fn remove_region(ctx: &Context, args: RegionIdArgs) -> Result<()> {
    let mut tpl = ctx.template(&args.id)?;
    tpl.remove_region(&args.region)?;
    ctx.store.save(&tpl)?;
    println!("Removed region {} from {}", args.region, tpl.id);
    Ok(())
}

fn link(ctx: &Context, args: TemplateLinkArgs) -> Result<()> {
    let tpl = ctx.template(&args.id)?;
    println!("{}", tpl.share_link(&args.base_url));
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use image::RgbaImage;

    use crate::cli::{Cli, run};

    fn cli(data_dir: &std::path::Path, args: &[&str]) -> Cli {
        let mut argv = vec!["greetcard", "--data-dir", data_dir.to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[tokio::test]
    async fn blank_name_is_rejected_before_copying_the_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("bg.png");
        RgbaImage::new(20, 10).save(&image).unwrap();
        let data = dir.path().join("data");

        let args = cli(&data, &["template", "create", "--name", "  ", "--image", image.to_str().unwrap()]);
        let err = run(args).await.unwrap_err();
        assert!(err.to_string().contains("name"), "{err}");
        assert!(!data.join("images").exists());
    }

    #[tokio::test]
    async fn create_stores_template_at_canonical_width() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("bg.png");
        RgbaImage::new(200, 100).save(&image).unwrap();
        let data = dir.path().join("data");

        let args = cli(
            &data,
            &["template", "create", "--name", "Eid", "--image", image.to_str().unwrap(), "--with-region"],
        );
        run(args).await.unwrap();

        let stored: Vec<_> = std::fs::read_dir(data.join("templates")).unwrap().collect();
        assert_eq!(stored.len(), 1);
        let raw = std::fs::read_to_string(stored[0].as_ref().unwrap().path()).unwrap();
        let template: greetcard::CardTemplate = serde_json::from_str(&raw).unwrap();
        assert_eq!((template.image_width, template.image_height), (1080, 540));
        assert_eq!(template.text_areas.len(), 1);
        assert_eq!(std::fs::read_dir(data.join("images")).unwrap().count(), 1);
    }
}
