//! Batch rendering of one template for a list of names into a ZIP archive.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::mem;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{CardError, Result};
use crate::export::encode_png;
use crate::loader::ImageLoader;
use crate::render::CardRenderer;
use crate::template::CardTemplate;

const NAME_LIST_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// What to do when one name fails to render.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the batch and discard everything rendered so far.
    #[default]
    Abort,
    /// Record the failure and carry on with the next name.
    Skip,
}

/// What to do when two names sanitize to the same entry name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Keep both, appending `_2`, `_3`, ... to later entries.
    #[default]
    Suffix,
    /// Keep only the last card written under that name.
    Overwrite,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BulkOptions {
    pub on_error: FailurePolicy,
    pub collisions: CollisionPolicy,
}

/// A name left out of the archive under [`FailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedName {
    pub name: String,
    pub reason: String,
}

/// Result of a finished batch.
#[derive(Debug)]
pub struct BulkReport {
    /// ZIP bytes, one PNG per entry and nothing else.
    pub archive: Vec<u8>,
    /// Entry names in archive order.
    pub entries: Vec<String>,
    pub rendered: usize,
    pub skipped: Vec<SkippedName>,
}

/// Split a raw name list on newlines, trimming and dropping blank lines.
///
/// No delimiter parsing happens even for `.csv` uploads: each line is one
/// name, commas included. Duplicates are kept.
pub fn parse_names(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read an uploaded name list, accepting `.csv` and `.txt` files only.
pub fn read_name_list(path: &Path) -> Result<String> {
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| NAME_LIST_EXTENSIONS.iter().any(|ok| e.eq_ignore_ascii_case(ok)));
    if !supported {
        return Err(CardError::unsupported(path, "a .csv or .txt name list"));
    }
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| CardError::unsupported(path, "UTF-8 text"))
}

/// Replace everything outside `[A-Za-z0-9]` with `_` and lower-case.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Archive entry name for a recipient.
pub fn entry_name(name: &str) -> String {
    format!("greeting_card_{}.png", sanitize_name(name))
}

/// Percent complete after `done` of `total` names, rounded up so the first
/// name of three reports 34 and only the last reports 100.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100).div_ceil(total)).min(100) as u8
}

/// Download name for a finished archive.
pub fn archive_file_name(at: DateTime<Utc>) -> String {
    format!("greeting_cards_{}.zip", at.format("%Y-%m-%dT%H-%M-%S%.3fZ"))
}

/// ZIP assembly for a batch.
///
/// Under [`CollisionPolicy::Suffix`] every entry is final once added, so its
/// bytes go straight into the writer. [`CollisionPolicy::Overwrite`] has to
/// hold entries back until the end because a later name may replace them.
struct ArchiveBuilder {
    policy: CollisionPolicy,
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: Vec<String>,
    index: HashMap<String, usize>,
    held: Vec<Vec<u8>>,
}

impl ArchiveBuilder {
    fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: Vec::new(),
            index: HashMap::new(),
            held: Vec::new(),
        }
    }

    /// Add an entry, returning the name it was stored under.
    fn add(&mut self, name: String, bytes: Vec<u8>) -> Result<String> {
        let name = match (self.index.get(&name).copied(), self.policy) {
            (Some(slot), CollisionPolicy::Overwrite) => {
                self.held[slot] = bytes;
                return Ok(name);
            }
            (Some(_), CollisionPolicy::Suffix) => {
                let stem = name.trim_end_matches(".png");
                (2..)
                    .map(|n| format!("{stem}_{n}.png"))
                    .find(|candidate| !self.index.contains_key(candidate))
                    .unwrap_or_default()
            }
            (None, _) => name,
        };
        self.index.insert(name.clone(), self.names.len());
        self.names.push(name.clone());
        match self.policy {
            CollisionPolicy::Suffix => write_entry(&mut self.writer, &name, &bytes)?,
            CollisionPolicy::Overwrite => self.held.push(bytes),
        }
        Ok(name)
    }

    fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        for (name, bytes) in self.names.iter().zip(mem::take(&mut self.held)) {
            write_entry(&mut self.writer, name, &bytes)?;
        }
        let cursor = self
            .writer
            .finish()
            .map_err(|e| CardError::Encoding(format!("failed to finalize archive: {e}")))?;
        Ok(cursor.into_inner())
    }
}

fn write_entry(writer: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, bytes: &[u8]) -> Result<()> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer
        .start_file(name, options)
        .map_err(|e| CardError::Encoding(format!("failed to add {name} to archive: {e}")))?;
    writer.write_all(bytes)?;
    Ok(())
}

/// Render `template` once per name in `raw` and pack the PNGs into a ZIP.
///
/// Names are processed one at a time on a single reused surface.
/// `on_progress` receives the percent complete after each name.
pub async fn bulk_render<L, F>(
    renderer: &CardRenderer<L>,
    template: &CardTemplate,
    raw: &str,
    options: &BulkOptions,
    mut on_progress: F,
) -> Result<BulkReport>
where
    L: ImageLoader,
    F: FnMut(u8),
{
    template.validate()?;
    let names = parse_names(raw);
    if names.is_empty() {
        return Err(CardError::Validation("no names found in the name list".into()));
    }

    let total = names.len();
    info!(template = %template.id, total, "bulk export started");
    let mut surface = renderer.surface();
    let mut archive = ArchiveBuilder::new(options.collisions);
    let mut skipped = Vec::new();

    for (idx, name) in names.iter().enumerate() {
        let outcome = match renderer.render(&mut surface, template, name).await {
            Ok(()) => encode_png(&surface),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(png) => {
                let stored = archive.add(entry_name(name), png)?;
                debug!(name = %name, entry = %stored, "card added");
            }
            Err(err) => match options.on_error {
                FailurePolicy::Abort => {
                    warn!(name = %name, %err, "bulk export aborted");
                    return Err(err);
                }
                FailurePolicy::Skip => {
                    warn!(name = %name, %err, "skipping name");
                    skipped.push(SkippedName {
                        name: name.clone(),
                        reason: err.to_string(),
                    });
                }
            },
        }
        on_progress(progress_percent(idx + 1, total));
    }

    let rendered = total - skipped.len();
    if rendered == 0 {
        return Err(CardError::Validation(format!(
            "none of the {total} names could be rendered"
        )));
    }
    let entries = archive.names();
    let bytes = archive.finish()?;
    info!(rendered, skipped = skipped.len(), bytes = bytes.len(), "bulk export finished");
    Ok(BulkReport {
        archive: bytes,
        entries,
        rendered,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Read;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_are_trimmed_and_blank_lines_dropped() {
        let raw = "  Alice \r\n\nBob\n   \nAlice\n";
        assert_eq!(parse_names(raw), vec!["Alice", "Bob", "Alice"]);
        assert!(parse_names("\n \n\t\n").is_empty());
    }

    #[test]
    fn csv_lines_are_not_split_on_commas() {
        assert_eq!(parse_names("Doe, Jane\nRoe, Richard"), vec!["Doe, Jane", "Roe, Richard"]);
    }

    #[test]
    fn sanitized_entry_names() {
        assert_eq!(entry_name("José O'Brien!"), "greeting_card_jos__o_brien_.png");
        assert_eq!(entry_name("ALICE"), "greeting_card_alice.png");
        assert_eq!(sanitize_name("محمد"), "____");
    }

    #[test]
    fn progress_for_three_names() {
        let seq: Vec<u8> = (1..=3).map(|i| progress_percent(i, 3)).collect();
        assert_eq!(seq, vec![34, 67, 100]);
        assert_eq!(progress_percent(1, 1), 100);
        assert_eq!(progress_percent(1, 200), 1);
    }

    #[test]
    fn archive_name_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(archive_file_name(at), "greeting_cards_2026-03-01T09-05-07.000Z.zip");
    }

    fn archive_contents(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn suffix_policy_keeps_colliding_entries() {
        let mut builder = ArchiveBuilder::new(CollisionPolicy::Suffix);
        builder.add(entry_name("Alice"), vec![1]).unwrap();
        builder.add(entry_name("alice"), vec![2]).unwrap();
        builder.add(entry_name("ALICE"), vec![3]).unwrap();
        assert!(builder.held.is_empty());
        assert_eq!(
            builder.names(),
            vec![
                "greeting_card_alice.png",
                "greeting_card_alice_2.png",
                "greeting_card_alice_3.png"
            ]
        );
    }

    #[test]
    fn suffix_entries_are_written_as_they_arrive() {
        let mut builder = ArchiveBuilder::new(CollisionPolicy::Suffix);
        builder.add(entry_name("Ann"), vec![7; 4]).unwrap();
        builder.add(entry_name("ann"), vec![8; 2]).unwrap();
        assert!(builder.held.is_empty());
        assert_eq!(
            archive_contents(builder.finish().unwrap()),
            vec![
                ("greeting_card_ann.png".to_string(), vec![7; 4]),
                ("greeting_card_ann_2.png".to_string(), vec![8; 2]),
            ]
        );
    }

    #[test]
    fn overwrite_policy_keeps_last_write_in_first_position() {
        let mut builder = ArchiveBuilder::new(CollisionPolicy::Overwrite);
        builder.add(entry_name("Bob"), vec![1]).unwrap();
        builder.add(entry_name("Cy"), vec![5]).unwrap();
        builder.add(entry_name("bob"), vec![2]).unwrap();
        assert_eq!(builder.names(), vec!["greeting_card_bob.png", "greeting_card_cy.png"]);
        assert_eq!(
            archive_contents(builder.finish().unwrap()),
            vec![
                ("greeting_card_bob.png".to_string(), vec![2]),
                ("greeting_card_cy.png".to_string(), vec![5]),
            ]
        );
    }

    #[test]
    fn name_list_extension_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("names.CSV");
        fs::write(&good, "Alice\n").unwrap();
        assert_eq!(read_name_list(&good).unwrap(), "Alice\n");

        let bad = dir.path().join("names.xlsx");
        fs::write(&bad, "Alice\n").unwrap();
        assert!(matches!(read_name_list(&bad), Err(CardError::UnsupportedFile { .. })));
    }
}
