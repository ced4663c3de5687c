use std::path::Path;

use anyhow::{bail, Context};
use ::config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::submission::DEFAULT_MAX_CONCURRENT_REQUESTS;

pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:8001/predict";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/sicklescan.db";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    pub endpoint_url: String,
    pub database_url: String,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.into(),
            database_url: DEFAULT_DATABASE_URL.into(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientSettings {
    pub fn endpoint(&self) -> anyhow::Result<Url> {
        let url = Url::parse(&self.endpoint_url)
            .with_context(|| format!("invalid analysis endpoint url '{}'", self.endpoint_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("analysis endpoint must be http or https, got '{}'", url.scheme());
        }
        Ok(url)
    }
}

/// Defaults, then `sicklescan.toml` in the working directory, then
/// `explicit_file`, then `APP__*` environment variables.
pub fn load_settings(explicit_file: Option<&Path>) -> anyhow::Result<ClientSettings> {
    let defaults = ClientSettings::default();
    let mut builder = Config::builder()
        .set_default("endpoint_url", defaults.endpoint_url)?
        .set_default("database_url", defaults.database_url)?
        .set_default("max_concurrent_requests", defaults.max_concurrent_requests as u64)?
        .set_default("request_timeout_secs", defaults.request_timeout_secs)?
        .add_source(File::with_name("sicklescan").required(false));

    if let Some(path) = explicit_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    let mut settings: ClientSettings = builder
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to load client settings")?
        .try_deserialize()
        .context("invalid client settings")?;

    settings.database_url = normalize_database_url(&settings.database_url);
    settings.max_concurrent_requests = settings.max_concurrent_requests.max(1);
    Ok(settings)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return DEFAULT_DATABASE_URL.to_string();
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
