use std::env;

use engine::{resolve_app_paths, LoopConfig, Scene, StartupError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::PlatformerScene;

pub(crate) const START_LEVEL_ENV_VAR: &str = "PLATFORMER_START_LEVEL";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "platformer_startup");

    let paths = resolve_app_paths()?;
    let start_level = parse_start_level(env::var(START_LEVEL_ENV_VAR).ok().as_deref());
    info!(
        start_level,
        saves_dir = %paths.saves_dir.display(),
        "app_wired"
    );

    Ok(AppWiring {
        config: LoopConfig::default(),
        scene: Box::new(PlatformerScene::new(paths.saves_dir, start_level)),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Unset means level 0; anything unparsable is logged and ignored.
fn parse_start_level(raw: Option<&str>) -> usize {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return 0;
    };
    match raw.parse::<usize>() {
        Ok(index) => index,
        Err(error) => {
            warn!(value = raw, error = %error, "invalid_start_level_ignored");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_level_parses_or_falls_back_to_zero() {
        assert_eq!(parse_start_level(None), 0);
        assert_eq!(parse_start_level(Some("  ")), 0);
        assert_eq!(parse_start_level(Some(" 2 ")), 2);
        assert_eq!(parse_start_level(Some("two")), 0);
        assert_eq!(parse_start_level(Some("-1")), 0);
    }
}
