use anyhow::Context;
use ::config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8001";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    /// Answer every prediction with this label instead of the filename rule.
    #[serde(default)]
    pub fixed_label: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            fixed_label: None,
        }
    }
}

/// Defaults, then `predict_server.toml`, then `APP__BIND_ADDR` /
/// `APP__FIXED_LABEL`.
pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings: Settings = Config::builder()
        .set_default("bind_addr", DEFAULT_BIND_ADDR)?
        .add_source(File::with_name("predict_server").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()
        .context("failed to load server settings")?
        .try_deserialize()
        .context("invalid server settings")?;

    settings.fixed_label = settings
        .fixed_label
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty());
    Ok(settings)
}
