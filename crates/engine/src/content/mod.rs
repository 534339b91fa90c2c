mod atomic_io;
mod cache;
mod database;
mod hashing;
mod levels;
mod species;

use thiserror::Error;
use tracing::info;

use crate::AppPaths;

pub use atomic_io::write_text_atomic;
pub use cache::{build_or_load_species_database, SpeciesCacheError};
pub use database::{SpeciesDatabase, SpeciesDef, SpeciesId};
pub use hashing::fingerprint_level_text;
pub use levels::{discover_level_sources, LevelSource, LevelSourceError};
pub use species::{
    compile_species_database, ContentError, ContentErrorCode, SourceLocation,
    RESERVED_LEVEL_MARKERS,
};

#[derive(Debug, Error)]
pub enum ContentLoadError {
    #[error(transparent)]
    Species(#[from] SpeciesCacheError),
    #[error(transparent)]
    Levels(#[from] LevelSourceError),
}

/// Everything a scene needs from disk before its first tick.
#[derive(Debug, Clone, Default)]
pub struct ContentCatalog {
    pub species: SpeciesDatabase,
    pub levels: Vec<LevelSource>,
}

impl ContentCatalog {
    pub fn load(paths: &AppPaths) -> Result<Self, ContentLoadError> {
        let species = build_or_load_species_database(&paths.base_content_dir, &paths.cache_dir)?;
        let levels = discover_level_sources(&paths.levels_dir)?;
        info!(
            species_count = species.len(),
            level_count = levels.len(),
            "content_catalog_loaded"
        );
        Ok(Self { species, levels })
    }

    pub fn level(&self, index: usize) -> Option<&LevelSource> {
        self.levels.get(index)
    }
}
