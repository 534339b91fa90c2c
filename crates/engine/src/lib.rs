use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
mod asset_keys;
pub mod content;

pub use app::{
    run_app, world_to_screen, AppError, Color, DrawCommand, DrawLayer,
    InputAction, InputSnapshot, LoopConfig, LoopMetricsSnapshot, Rect,
    RenderFrame, Scene, SceneCommand, SceneLoadError, SimTime, Vec2, Viewport,
    SLOW_FRAME_ENV_VAR,
};
pub use asset_keys::AssetKeyError;
pub use content::{
    build_or_load_species_database, compile_species_database, discover_level_sources,
    fingerprint_level_text, write_text_atomic, ContentCatalog, ContentError, ContentErrorCode,
    ContentLoadError, LevelSource, LevelSourceError, SourceLocation, SpeciesCacheError,
    SpeciesDatabase, SpeciesDef, SpeciesId, RESERVED_LEVEL_MARKERS,
};

pub const ROOT_ENV_VAR: &str = "PLATFORMER_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub base_content_dir: PathBuf,
    pub levels_dir: PathBuf,
    pub backgrounds_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub saves_dir: PathBuf,
}

impl AppPaths {
    /// Lays out the standard asset and cache directories under `root`.
    pub fn under_root(root: PathBuf) -> Self {
        let assets = root.join("assets");
        let cache_dir = root.join("cache");
        Self {
            base_content_dir: assets.join("base"),
            levels_dir: assets.join("levels"),
            backgrounds_dir: assets.join("backgrounds"),
            saves_dir: cache_dir.join("saves"),
            cache_dir,
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("failed to create directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "{var}={path} is not a project root (needs Cargo.toml next to assets/ or crates/)",
        var = ROOT_ENV_VAR
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "no project root above {start_dir}; set {var} to the directory holding Cargo.toml and assets/",
        var = ROOT_ENV_VAR
    )]
    RootNotFound { start_dir: PathBuf },
}

/// Finds the project root and makes sure the writable directories exist.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let paths = AppPaths::under_root(resolve_root()?);
    for dir in [&paths.cache_dir, &paths.saves_dir] {
        fs::create_dir_all(dir).map_err(|source| StartupError::CreateDir {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(paths)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    let configured = match env::var(ROOT_ENV_VAR) {
        Ok(value) => Some(PathBuf::from(value)),
        Err(env::VarError::NotPresent) => None,
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            })
        }
    };
    if let Some(root) = configured {
        let root = canonical_or_raw(&root);
        return if looks_like_root(&root) {
            Ok(root)
        } else {
            Err(StartupError::InvalidEnvRoot { path: root })
        };
    }

    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let start_dir = exe.parent().unwrap_or(&exe);
    find_root_above(start_dir).ok_or_else(|| StartupError::RootNotFound {
        start_dir: canonical_or_raw(start_dir),
    })
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| looks_like_root(dir))
        .map(canonical_or_raw)
}

fn looks_like_root(dir: &Path) -> bool {
    dir.join("Cargo.toml").is_file() && (dir.join("assets").is_dir() || dir.join("crates").is_dir())
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn root_needs_cargo_toml_and_assets() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("assets")).expect("mkdir assets");
        assert!(!looks_like_root(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]").expect("write toml");
        assert!(looks_like_root(temp.path()));
    }

    #[test]
    fn root_is_found_from_a_nested_directory() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("assets")).expect("mkdir assets");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]").expect("write toml");
        let nested = temp.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("mkdir nested");

        let found = find_root_above(&nested).expect("root");
        assert_eq!(found, canonical_or_raw(temp.path()));
    }

    #[test]
    fn paths_under_root_follow_asset_layout() {
        let paths = AppPaths::under_root(PathBuf::from("/game"));
        assert_eq!(paths.levels_dir, PathBuf::from("/game/assets/levels"));
        assert_eq!(paths.base_content_dir, PathBuf::from("/game/assets/base"));
        assert_eq!(paths.backgrounds_dir, PathBuf::from("/game/assets/backgrounds"));
        assert_eq!(paths.saves_dir, PathBuf::from("/game/cache/saves"));
    }
}
