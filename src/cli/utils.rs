//! Convenience helpers shared across command handlers.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use greetcard::{CardRenderer, CardTemplate, Config, FontBook, JsonTemplateStore, SourceLoader, TemplateStore};

use crate::cli::Cli;

/// Everything a command needs: resolved config, template store and fonts.
pub struct Context {
    pub config: Config,
    pub store: JsonTemplateStore,
    font_dirs: Vec<PathBuf>,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref(), cli.data_dir.as_deref())
            .context("failed to load configuration")?;
        let store = JsonTemplateStore::open(config.templates_dir())
            .context("failed to open template store")?;
        let mut font_dirs = vec![config.fonts_dir()];
        font_dirs.extend(config.font_dirs.iter().cloned());
        font_dirs.extend(cli.font_dirs.iter().cloned());
        Ok(Self {
            config,
            store,
            font_dirs,
        })
    }

    /// Fonts from the data dir and every configured font directory.
    pub fn font_book(&self) -> Result<FontBook> {
        let mut book = FontBook::new();
        for dir in &self.font_dirs {
            book.load_dir(dir)
                .with_context(|| format!("failed to scan fonts in {}", dir.display()))?;
        }
        book.set_default_family(self.config.default_font.clone());
        Ok(book)
    }

    pub fn renderer(&self) -> Result<CardRenderer<SourceLoader>> {
        let loader = SourceLoader::new(self.config.image_timeout())?;
        Ok(CardRenderer::new(loader, Arc::new(self.font_book()?)))
    }

    /// Load a template by id, attaching the id to any error.
    pub fn template(&self, id: &str) -> Result<CardTemplate> {
        self.store
            .require(id)
            .with_context(|| format!("failed to load template '{id}'"))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.config.data_dir.join("images")
    }
}

/// Persist bytes either to a file or stdout when `-` is provided.
pub fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    if path.as_os_str() == "-" {
        io::stdout().write_all(content)?;
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
