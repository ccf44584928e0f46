//! Display metadata table: `RecipeId -> DisplayRecord`.
//!
//! The vector index stores only identifiers. At query time hits are joined
//! against this table to recover names, descriptions, tags and ingredients.

use crate::error::IndexError;
use crate::recipe::{read_json_lines, DisplayLine, DisplayRecord};
use crate::search::types::RecipeId;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument, warn};

/// In-memory display table, immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct DisplayMetadata {
    records: HashMap<RecipeId, DisplayRecord>,
}

impl DisplayMetadata {
    /// Loads a JSON-lines metadata file.
    ///
    /// Lines that do not parse are logged and skipped; they only make the
    /// affected recipes unreachable from vector search. If an identifier
    /// appears twice the first occurrence wins.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let mut records = HashMap::new();
        let mut skipped = 0usize;

        for item in read_json_lines::<DisplayLine>(path.as_ref())? {
            match item {
                Ok(DisplayLine { id, display }) => {
                    if records.contains_key(&id) {
                        warn!("Duplicate metadata entry for recipe {}; keeping the first", id);
                        continue;
                    }
                    records.insert(id, display);
                }
                Err(e) if e.is_skippable() => {
                    warn!("Skipping metadata line: {}", e);
                    skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("Loaded display metadata: {} recipes, {} lines skipped", records.len(), skipped);
        Ok(Self { records })
    }

    /// Looks up the display record of `id`.
    pub fn get(&self, id: RecipeId) -> Option<&DisplayRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(RecipeId, DisplayRecord)> for DisplayMetadata {
    fn from_iter<I: IntoIterator<Item = (RecipeId, DisplayRecord)>>(iter: I) -> Self {
        let mut records = HashMap::new();
        for (id, display) in iter {
            records.entry(id).or_insert(display);
        }
        Self { records }
    }
}
