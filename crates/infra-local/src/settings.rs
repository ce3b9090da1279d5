// Settings Loader
// Defaults, then an optional TOML/JSON file, then HBCI_* environment overrides

use config::{Config, Environment, File};
use directories::ProjectDirs;
use hbci_core::application::EngineSettings;
use hbci_core::{AppError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

const ENV_PREFIX: &str = "HBCI";

/// `<config dir>/hbci-engine/settings.toml` for the current platform
pub fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "hbci", "hbci-engine").map(|d| d.config_dir().join("settings.toml"))
}

/// Load engine settings.
///
/// `path` overrides the platform default location. A missing file is not an
/// error; environment variables such as `HBCI_MAX_TRANSFERS_PER_JOB=4` win
/// over both.
pub fn load_settings(path: Option<&Path>) -> Result<EngineSettings> {
    load_with_prefix(path, ENV_PREFIX)
}

fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<EngineSettings> {
    let mut builder = Config::builder()
        .add_source(Config::try_from(&EngineSettings::default()).map_err(config_error)?);

    if let Some(file) = path.map(Path::to_path_buf).or_else(default_settings_path) {
        debug!(path = %file.display(), "Settings file");
        builder = builder.add_source(File::from(file).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(config_error)
}

fn config_error(e: config::ConfigError) -> AppError {
    AppError::Config(e.to_string())
}
