use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::hashing::fingerprint_level_text;

/// Raw text of one numbered level file (`{index}.txt`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSource {
    pub index: usize,
    pub path: PathBuf,
    pub text: String,
    pub fingerprint: String,
}

#[derive(Debug, Error)]
pub enum LevelSourceError {
    #[error("failed to read levels directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read level file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no level files found in {path}; expected 0.txt, 1.txt, ...")]
    NoLevels { path: PathBuf },
    #[error("level files must be numbered contiguously from 0; missing {missing_index}.txt in {path}")]
    MissingIndex { path: PathBuf, missing_index: usize },
}

/// Loads `0.txt, 1.txt, ...` from `levels_dir`. Files not named `<number>.txt` are ignored.
pub fn discover_level_sources(levels_dir: &Path) -> Result<Vec<LevelSource>, LevelSourceError> {
    let entries = fs::read_dir(levels_dir).map_err(|source| LevelSourceError::ReadDir {
        path: levels_dir.to_path_buf(),
        source,
    })?;

    let mut numbered = BTreeMap::<usize, PathBuf>::new();
    for entry in entries {
        let entry = entry.map_err(|source| LevelSourceError::ReadDir {
            path: levels_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        match level_index_from_path(&path) {
            Some(index) => {
                numbered.insert(index, path);
            }
            None => debug!(path = %path.display(), "level_discovery_skipped_file"),
        }
    }

    if numbered.is_empty() {
        return Err(LevelSourceError::NoLevels {
            path: levels_dir.to_path_buf(),
        });
    }

    let mut sources = Vec::with_capacity(numbered.len());
    for (expected, (index, path)) in numbered.into_iter().enumerate() {
        if index != expected {
            return Err(LevelSourceError::MissingIndex {
                path: levels_dir.to_path_buf(),
                missing_index: expected,
            });
        }
        let text = fs::read_to_string(&path).map_err(|source| LevelSourceError::ReadFile {
            path: path.clone(),
            source,
        })?;
        sources.push(LevelSource {
            index,
            fingerprint: fingerprint_level_text(&text),
            path,
            text,
        });
    }

    info!(
        levels_dir = %levels_dir.display(),
        level_count = sources.len(),
        "level_sources_discovered"
    );
    Ok(sources)
}

fn level_index_from_path(path: &Path) -> Option<usize> {
    if !path.is_file() {
        return None;
    }
    let is_txt = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    if !is_txt {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}
