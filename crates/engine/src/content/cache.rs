use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::atomic_io::write_text_atomic;
use super::database::{SpeciesDatabase, SpeciesDef};
use super::hashing::hash_xml_inputs;
use super::species::{compile_species_database, ContentError};

pub(crate) const SPECIES_CACHE_FORMAT_VERSION: u16 = 1;
pub(crate) const SPECIES_COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");
const SPECIES_CACHE_FILE_NAME: &str = "species.json";

#[derive(Debug, Error)]
pub enum SpeciesCacheError {
    #[error("failed to hash content inputs under {path}: {source}")]
    HashInputs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Compile(#[from] ContentError),
    #[error("failed to encode species cache {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write species cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpeciesCacheFile {
    format_version: u16,
    compiler_version: String,
    input_hash_sha256_hex: String,
    defs: Vec<SpeciesDef>,
}

pub(crate) fn species_cache_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(SPECIES_CACHE_FILE_NAME)
}

/// Reuses `cache_dir/species.json` when its input hash matches the XML under
/// `content_dir`; otherwise compiles and rewrites it. A corrupt cache is rebuilt, never fatal.
pub fn build_or_load_species_database(
    content_dir: &Path,
    cache_dir: &Path,
) -> Result<SpeciesDatabase, SpeciesCacheError> {
    let input_hash = hash_xml_inputs(content_dir).map_err(|error| SpeciesCacheError::HashInputs {
        path: error.path,
        source: error.source,
    })?;
    let cache_path = species_cache_path(cache_dir);

    match try_load_cached(&cache_path, &input_hash.hash_hex) {
        Ok(defs) => {
            info!(
                cache_path = %cache_path.display(),
                input_hash = %input_hash.hash_hex,
                species_count = defs.len(),
                "species_cache_hit"
            );
            return Ok(SpeciesDatabase::from_defs(defs));
        }
        Err(reason) => {
            if cache_path.exists() {
                warn!(
                    cache_path = %cache_path.display(),
                    reason = %reason,
                    "species_cache_invalid_rebuilding"
                );
            }
        }
    }

    let database = compile_species_database(content_dir)?;
    let cache = SpeciesCacheFile {
        format_version: SPECIES_CACHE_FORMAT_VERSION,
        compiler_version: SPECIES_COMPILER_VERSION.to_string(),
        input_hash_sha256_hex: input_hash.hash_hex.clone(),
        defs: database.defs().to_vec(),
    };
    let text = serde_json::to_string_pretty(&cache).map_err(|source| SpeciesCacheError::Encode {
        path: cache_path.clone(),
        source,
    })?;
    write_text_atomic(&cache_path, &text).map_err(|source| SpeciesCacheError::Write {
        path: cache_path.clone(),
        source,
    })?;
    info!(
        cache_path = %cache_path.display(),
        xml_file_count = input_hash.xml_file_count,
        input_hash = %input_hash.hash_hex,
        species_count = database.len(),
        "species_compiled"
    );
    Ok(database)
}

fn try_load_cached(cache_path: &Path, expected_hash: &str) -> Result<Vec<SpeciesDef>, String> {
    let raw = fs::read_to_string(cache_path).map_err(|error| format!("cache unreadable: {error}"))?;
    let cache = serde_json::from_str::<SpeciesCacheFile>(&raw)
        .map_err(|error| format!("cache malformed: {error}"))?;
    if cache.format_version != SPECIES_CACHE_FORMAT_VERSION {
        return Err("cache format_version mismatch".to_string());
    }
    if cache.compiler_version != SPECIES_COMPILER_VERSION {
        return Err("cache compiler_version mismatch".to_string());
    }
    if cache.input_hash_sha256_hex != expected_hash {
        return Err("cache input_hash mismatch".to_string());
    }
    Ok(cache.defs)
}
