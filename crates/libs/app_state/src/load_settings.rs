use crate::{AppSettings, RawSettings};
use color_eyre::eyre::Result;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.yaml";

/// Loads settings from `.env`, the settings file and `APP__*` environment
/// variables, in increasing order of precedence.
///
/// Without an explicit `config_path` the default settings file is optional.
pub fn load_app_settings(config_path: Option<&Path>) -> Result<AppSettings> {
    // Load dotenv first so its values take part in the env layer below.
    dotenv::from_path(".env").ok();
    let raw_settings = load_raw_settings(config_path)?;
    debug!(?raw_settings, "Loaded raw settings");
    raw_settings.try_into()
}

pub fn load_raw_settings(config_path: Option<&Path>) -> Result<RawSettings> {
    let (path, required) = match config_path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_SETTINGS_PATH), false),
    };

    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(required))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("captioning.splits"),
        );

    Ok(builder.build()?.try_deserialize::<RawSettings>()?)
}
