//! Configuration and path resolution for the CLI.
//!
//! Every artifact lives under one data directory, resolved in this order:
//! 1. `--data-dir` (or the `SAFFRON_DATA_DIR` environment variable, via clap)
//! 2. The platform data directory from [`ProjectDirs`]
//!
//! Model files for the JinaBERT encoder are looked up separately, see
//! [`find_model_dir`].

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use saffron_core::embedding::{Embedder, HashEmbedder};
use saffron_core::store::EmbeddingStorePaths;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Model file names
const MODEL_FILENAME: &str = "jina-bert.safetensors";
const TOKENIZER_FILENAME: &str = "jina-bert-tokenizer.json";

/// Environment variable for a custom model directory
pub const MODEL_DIR_ENV: &str = "SAFFRON_MODEL_DIR";

/// Returns the data directory.
///
/// - macOS: `~/Library/Application Support/dev.saffron.Saffron/`
/// - Linux: `~/.local/share/saffron/`
/// - Windows: `%APPDATA%\saffron\Saffron\data\`
pub fn get_data_dir(custom_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = custom_dir {
        return Ok(dir.to_path_buf());
    }

    ProjectDirs::from("dev", "saffron", "Saffron")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

/// Standard artifact locations inside a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the data directory (see [`get_data_dir`]).
    pub fn resolve(custom_dir: Option<&Path>) -> Result<Self> {
        Ok(Self::new(get_data_dir(custom_dir)?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalized recipe corpus (JSON lines)
    pub fn corpus(&self) -> PathBuf {
        self.root.join("corpus.jsonl")
    }

    /// Display metadata table (JSON lines)
    pub fn metadata(&self) -> PathBuf {
        self.root.join("metadata.jsonl")
    }

    /// Embedding store files
    pub fn store(&self) -> EmbeddingStorePaths {
        EmbeddingStorePaths::in_dir(self.root.join("store"))
    }

    /// Vector index artifact
    pub fn vector_index(&self) -> PathBuf {
        self.root.join("vectors.redb")
    }

    /// Lexical index directory
    pub fn lexical_index(&self) -> PathBuf {
        self.root.join("lexical")
    }

    /// Judged evaluation queries
    pub fn queries(&self) -> PathBuf {
        self.root.join("eval").join("queries.json")
    }
}

/// Text encoder selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EncoderKind {
    /// FNV-1a feature hashing (no model files needed)
    Hash,
    /// JinaBERT via Candle (requires the `jina-bert` feature and model files)
    Jina,
}

/// Constructs the selected encoder.
pub fn build_embedder(kind: EncoderKind) -> Result<Arc<dyn Embedder>> {
    match kind {
        EncoderKind::Hash => Ok(Arc::new(HashEmbedder::default())),
        EncoderKind::Jina => load_jina(),
    }
}

#[cfg(feature = "jina-bert")]
fn load_jina() -> Result<Arc<dyn Embedder>> {
    use anyhow::Context;
    use saffron_core::embedding::{JinaBertConfig, JinaBertEmbedder};

    let dir = find_model_dir()?;
    let embedder = JinaBertEmbedder::from_files(
        dir.join(MODEL_FILENAME),
        dir.join(TOKENIZER_FILENAME),
        JinaBertConfig::default(),
    )
    .with_context(|| format!("Failed to load JinaBERT from {}", dir.display()))?;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "jina-bert"))]
fn load_jina() -> Result<Arc<dyn Embedder>> {
    Err(anyhow!(
        "This build does not include the JinaBERT encoder. \
         Rebuild with `--features jina-bert` or use `--encoder hash`."
    ))
}

/// Finds the directory holding the JinaBERT weights and tokenizer.
///
/// Search order:
/// 1. `$SAFFRON_MODEL_DIR`
/// 2. `models/` under the platform data directory
/// 3. Executable-relative `../assets/models/` (bundled distribution)
pub fn find_model_dir() -> Result<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(dir) = std::env::var(MODEL_DIR_ENV) {
        candidates.push(PathBuf::from(dir));
    }
    if let Ok(data_dir) = get_data_dir(None) {
        candidates.push(data_dir.join("models"));
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join("../assets/models"));
    }

    candidates
        .iter()
        .find(|dir| dir.join(MODEL_FILENAME).exists() && dir.join(TOKENIZER_FILENAME).exists())
        .cloned()
        .ok_or_else(|| {
            anyhow!(
                "Model files not found ({} and {}). Searched:\n{}",
                MODEL_FILENAME,
                TOKENIZER_FILENAME,
                candidates
                    .iter()
                    .map(|p| format!("  - {}", p.display()))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        })
}

/// Fails with a hint if an artifact an earlier step should have produced is missing.
pub fn require_exists(path: &Path, produced_by: &str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} not found. Run `saffron {}` first.",
            path.display(),
            produced_by
        ))
    }
}
