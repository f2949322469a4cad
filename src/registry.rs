//! Loading the ship registry spreadsheet into an [`EntityStore`].
//!
//! Expected columns: `Tag`, `Aliases` (space separated, may be absent), `Character A`,
//! `Character B`, `Score`.

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::FilterConfig;
use crate::model::condition::Score;
use crate::model::entity::Ship;
use crate::model::store::EntityStore;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to open registry: {0}")]
    Io(#[from] io::Error),
    #[error("malformed registry: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct RegistryRow {
    #[serde(rename = "Tag")]
    tag: String,
    #[serde(rename = "Aliases", default)]
    aliases: String,
    #[serde(rename = "Character A")]
    first: String,
    #[serde(rename = "Character B")]
    second: String,
    #[serde(rename = "Score")]
    score: Score,
}

/// Entity store plus what was learned along the way.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub store: EntityStore,
    /// Every distinct participant name kept, for spotting typos.
    pub names: BTreeSet<String>,
    pub duplicates: usize,
    pub excluded: usize,
    /// File lines of rows rejected as malformed ships.
    pub rejected: Vec<u64>,
}

/// Capitalises each run of ASCII letters and lowercases the rest of it. An apostrophe
/// followed by a letter continues the run, so `fightin' six` becomes `Fightin' Six` and
/// `o'neil` becomes `O'neil`.
pub fn titlecase(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_alphabetic() {
            if in_word {
                out.push(c.to_ascii_lowercase());
            } else {
                out.push(c.to_ascii_uppercase());
                in_word = true;
            }
        } else {
            in_word = in_word && c == '\'' && chars.peek().is_some_and(|n| n.is_ascii_alphabetic());
            out.push(c);
        }
    }
    out
}

pub struct RegistryLoader {
    exclude: HashSet<String>,
    titlecase: bool,
}

impl RegistryLoader {
    pub fn new(filter: &FilterConfig) -> RegistryLoader {
        RegistryLoader {
            exclude: filter.exclude.iter().map(|name| name.trim().to_lowercase()).collect(),
            titlecase: filter.titlecase,
        }
    }

    fn normalize(&self, name: &str) -> String {
        let name = name.trim();
        if self.titlecase {
            titlecase(name)
        } else {
            name.to_string()
        }
    }

    pub fn load_path(&self, path: &Path) -> Result<Registry, RegistryError> {
        self.load(File::open(path)?)
    }

    pub fn load<R: io::Read>(&self, reader: R) -> Result<Registry, RegistryError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut registry = Registry::default();
        let mut tags: HashSet<String> = HashSet::new();
        let headers = reader.headers()?.clone();
        let mut record = csv::StringRecord::new();

        while reader.read_record(&mut record)? {
            let line = record.position().map_or(0, |position| position.line());
            let row: RegistryRow = record.deserialize(Some(&headers))?;

            let row_tags: Vec<&str> = std::iter::once(row.tag.trim())
                .chain(row.aliases.split_whitespace())
                .filter(|tag| !tag.is_empty())
                .collect();
            let seen = row_tags.iter().any(|tag| tags.contains(*tag));
            tags.extend(row_tags.iter().map(|tag| tag.to_string()));
            if seen {
                debug!(line, tag = %row.tag, "duplicate tag, skipping");
                registry.duplicates += 1;
                continue;
            }

            if [&row.first, &row.second]
                .iter()
                .any(|name| self.exclude.contains(&name.trim().to_lowercase()))
            {
                debug!(line, tag = %row.tag, "excluded participant, skipping");
                registry.excluded += 1;
                continue;
            }

            let (first, second) = (self.normalize(&row.first), self.normalize(&row.second));
            match Ship::new(first.clone(), second.clone()) {
                Ok(ship) => {
                    registry.names.insert(first);
                    registry.names.insert(second);
                    registry.store.add(ship, row.score);
                }
                Err(err) => {
                    warn!(line, tag = %row.tag, %err, "rejecting row");
                    registry.rejected.push(line);
                }
            }
        }

        debug!(
            ships = registry.store.len(),
            names = registry.names.len(),
            duplicates = registry.duplicates,
            excluded = registry.excluded,
            rejected = registry.rejected.len(),
            "registry loaded"
        );
        Ok(registry)
    }
}
