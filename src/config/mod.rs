mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{HitPattern, HitSettings, LoggingSettings, Settings, WaitSettings};

/// Loads the configuration from the default file and environment variables.
///
/// Sources, later ones winning:
/// - `config/default.{toml,json,yaml,...}`, optional
/// - `PAGESUB_*` variables, `__` separating nested keys
///   (e.g. `PAGESUB_WAIT__DEFAULT_TIMEOUT_MS=250`), after `.env` is loaded
///
/// Whatever is missing falls back to `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let _ = dotenvy::dotenv();

    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("PAGESUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}

#[cfg(test)]
mod tests;
