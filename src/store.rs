//! Template persistence behind a small repository interface.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{CardError, Result};
use crate::template::CardTemplate;

/// Get/list/save/delete access to stored templates.
///
/// Rendering only ever reads snapshots returned by [`TemplateStore::get`].
pub trait TemplateStore {
    fn get(&self, id: &str) -> Result<Option<CardTemplate>>;
    fn list(&self) -> Result<Vec<CardTemplate>>;
    /// Validate and insert or replace the template with the same id.
    fn save(&self, template: &CardTemplate) -> Result<()>;
    /// Remove a template; missing ids are reported as [`CardError::NotFound`].
    fn delete(&self, id: &str) -> Result<()>;

    /// Like [`TemplateStore::get`] but treats a missing template as an error.
    fn require(&self, id: &str) -> Result<CardTemplate> {
        self.get(id)?.ok_or_else(|| CardError::NotFound(id.to_string()))
    }
}

/// Stores each template as `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonTemplateStore {
    dir: PathBuf,
}

impl JsonTemplateStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            CardError::Storage(format!("failed to create {}: {err}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(CardError::Validation(format!("invalid template id '{id}'")));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    fn read(path: &Path) -> Result<CardTemplate> {
        let file = OpenOptions::new().read(true).open(path)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|err| {
            CardError::Storage(format!("failed to parse template {}: {err}", path.display()))
        })
    }
}

impl TemplateStore for JsonTemplateStore {
    fn get(&self, id: &str) -> Result<Option<CardTemplate>> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn list(&self) -> Result<Vec<CardTemplate>> {
        let mut templates = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                templates.push(Self::read(&path)?);
            }
        }
        templates.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(templates)
    }

    fn save(&self, template: &CardTemplate) -> Result<()> {
        template.validate()?;
        let path = self.path_for(&template.id)?;
        let tmp = path.with_extension("json.tmp");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, template).map_err(|err| {
            CardError::Storage(format!("failed to serialize template {}: {err}", template.id))
        })?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);
        fs::rename(&tmp, &path)?;
        debug!(id = %template.id, path = %path.display(), "template saved");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(CardError::NotFound(id.to_string()));
        }
        fs::remove_file(&path)?;
        debug!(id, "template deleted");
        Ok(())
    }
}

/// Process-local store, mostly for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: Mutex<BTreeMap<String, CardTemplate>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, CardTemplate>>> {
        self.templates
            .lock()
            .map_err(|_| CardError::Storage("template store lock poisoned".into()))
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn get(&self, id: &str) -> Result<Option<CardTemplate>> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<CardTemplate>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn save(&self, template: &CardTemplate) -> Result<()> {
        template.validate()?;
        self.lock()?.insert(template.id.clone(), template.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.lock()?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CardError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(name: &str) -> CardTemplate {
        let mut t = CardTemplate::new(name, "bg.png", 1080, 720);
        t.add_region();
        t
    }

    #[test]
    fn json_store_round_trips_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTemplateStore::open(dir.path().join("templates")).unwrap();
        let a = sample("Birthday");
        let b = sample("Anniversary");
        store.save(&a).unwrap();
        store.save(&b).unwrap();

        assert_eq!(store.get(&a.id).unwrap(), Some(a.clone()));
        let names: Vec<_> = store.list().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Anniversary".to_string(), "Birthday".to_string()]);
    }

    #[test]
    fn save_replaces_existing_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTemplateStore::open(dir.path()).unwrap();
        let mut t = sample("Eid");
        store.save(&t).unwrap();
        t.name = "Eid Mubarak".into();
        store.save(&t).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(store.require(&t.id).unwrap().name, "Eid Mubarak");
    }

    #[test]
    fn save_rejects_invalid_template() {
        let store = MemoryTemplateStore::new();
        let t = CardTemplate::new(" ", "bg.png", 10, 10);
        assert!(matches!(store.save(&t), Err(CardError::Validation(_))));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTemplateStore::open(dir.path()).unwrap();
        let t = sample("Card");
        store.save(&t).unwrap();
        store.delete(&t.id).unwrap();
        assert!(matches!(store.delete(&t.id), Err(CardError::NotFound(_))));
        assert!(matches!(store.require(&t.id), Err(CardError::NotFound(_))));
    }

    #[test]
    fn ids_cannot_escape_store_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTemplateStore::open(dir.path()).unwrap();
        assert!(matches!(store.get("../etc"), Err(CardError::Validation(_))));
    }
}
