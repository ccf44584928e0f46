//! Recipe records and the JSON-lines corpus boundary.
//!
//! Records are validated once, when they are read. Downstream code works with
//! [`RecipeRecord`] and [`DisplayRecord`] and never sees raw JSON.
//!
//! # Input format
//!
//! One JSON object per line:
//!
//! ```text
//! {"id": "42", "name": "chocolate chip cookies", "description": "", "tags": ["desserts"], "ingredients": ["flour"]}
//! ```
//!
//! `id` may be a string-encoded integer (canonical) or a bare integer.
//! `description`, `tags` and `ingredients` may be missing or `null`.

use crate::config::NAME_BOOST;
use crate::error::RecordError;
use crate::normalize::{light_normalize, normalize_list};
use crate::search::types::RecipeId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;

/// Canonical normalized recipe, as produced by the corpus normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRecipe")]
pub struct RecipeRecord {
    /// Stable identifier (serialized as a string-encoded integer)
    #[serde(serialize_with = "id_as_string")]
    pub id: RecipeId,
    /// Recipe name
    pub name: String,
    /// Free-text description, possibly empty
    pub description: String,
    /// Tags; order carries no meaning
    pub tags: Vec<String>,
    /// Ingredients; order carries no meaning
    pub ingredients: Vec<String>,
}

impl RecipeRecord {
    /// Text handed to the encoder when building the embedding store.
    pub fn embedding_text(&self) -> String {
        format!(
            "name: {}\ndescription: {}\ningredients: {}\ntags: {}",
            self.name,
            self.description,
            self.ingredients.join(", "),
            self.tags.join(", ")
        )
    }

    /// Weighted blob indexed by the lexical index.
    ///
    /// The name is repeated [`NAME_BOOST`] times so that exact-name matches
    /// outrank incidental mentions, followed by the description, the tags and
    /// the ingredients.
    pub fn lexical_text(&self) -> String {
        let mut text = String::with_capacity(
            (self.name.len() + 1) * NAME_BOOST + self.description.len() + 64,
        );
        for _ in 0..NAME_BOOST {
            text.push_str(&self.name);
            text.push(' ');
        }
        text.push_str(&self.description);
        text.push(' ');
        text.push_str(&self.tags.join(" "));
        text.push(' ');
        text.push_str(&self.ingredients.join(" "));
        text
    }

    /// Applies [`light_normalize`] to every text field.
    ///
    /// List entries that normalize to nothing are dropped. Idempotent, so it is
    /// safe to call on a corpus that is already normalized.
    pub fn normalized(self) -> Self {
        Self {
            id: self.id,
            name: light_normalize(&self.name),
            description: light_normalize(&self.description),
            tags: normalize_list(&self.tags),
            ingredients: normalize_list(&self.ingredients),
        }
    }

    /// Display view of this record.
    pub fn to_display(&self) -> DisplayRecord {
        DisplayRecord {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            ingredients: self.ingredients.clone(),
        }
    }
}

/// Presentation fields of a recipe. Every field defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ingredients: Vec<String>,
}

/// One line of the display metadata table.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawDisplayLine")]
pub(crate) struct DisplayLine {
    pub(crate) id: RecipeId,
    pub(crate) display: DisplayRecord,
}

#[derive(Deserialize)]
struct RawDisplayLine {
    id: RawId,
    #[serde(flatten)]
    display: DisplayRecord,
}

impl TryFrom<RawDisplayLine> for DisplayLine {
    type Error = String;

    fn try_from(raw: RawDisplayLine) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id.parse()?,
            display: raw.display,
        })
    }
}

/// Identifier as it appears on the wire: a string-encoded or bare integer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    pub(crate) fn parse(self) -> Result<RecipeId, String> {
        match self {
            RawId::Number(n) => Ok(RecipeId::from_u64(n)),
            RawId::Text(s) => s
                .parse::<RecipeId>()
                .map_err(|e| format!("invalid recipe id {:?}: {}", s, e)),
        }
    }
}

#[derive(Deserialize)]
struct RawRecipe {
    id: RawId,
    #[serde(default, deserialize_with = "null_as_default")]
    name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    ingredients: Vec<String>,
}

impl TryFrom<RawRecipe> for RecipeRecord {
    type Error = String;

    fn try_from(raw: RawRecipe) -> Result<Self, Self::Error> {
        let id = raw.id.parse()?;
        let name = raw
            .name
            .ok_or_else(|| format!("recipe {} has no name", id))?;
        Ok(Self {
            id,
            name,
            description: raw.description,
            tags: raw.tags,
            ingredients: raw.ingredients,
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn id_as_string<S: Serializer>(id: &RecipeId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

// ============================================================================
// JSON-lines reader
// ============================================================================

/// Iterator over the records of a JSON-lines stream.
///
/// Blank lines are ignored. A line that fails to parse yields
/// [`RecordError::Malformed`] with its 1-based line number and iteration
/// continues. So does a line that is not valid UTF-8. Any other read
/// failure yields [`RecordError::Io`].
pub struct JsonLines<R, T> {
    lines: std::io::Lines<R>,
    line: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<R: BufRead, T: DeserializeOwned> JsonLines<R, T> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            _marker: PhantomData,
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for JsonLines<R, T> {
    type Item = Result<T, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.lines.next()?;
            self.line += 1;
            let text = match next {
                Ok(text) => text,
                // The reader has already consumed the offending line.
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    return Some(Err(RecordError::Malformed {
                        line: self.line,
                        reason: e.to_string(),
                    }))
                }
                Err(e) => return Some(Err(RecordError::Io(e))),
            };

            if text.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&text).map_err(|e| RecordError::Malformed {
                line: self.line,
                reason: e.to_string(),
            }));
        }
    }
}

/// Opens a JSON-lines file of type `T`.
pub fn read_json_lines<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<JsonLines<BufReader<File>, T>, RecordError> {
    let file = File::open(path.as_ref())?;
    Ok(JsonLines::new(BufReader::new(file)))
}

/// Opens a normalized recipe corpus.
pub fn read_corpus(
    path: impl AsRef<Path>,
) -> Result<JsonLines<BufReader<File>, RecipeRecord>, RecordError> {
    read_json_lines(path)
}
