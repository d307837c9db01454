use std::{fs, io::ErrorKind, path::Path, time::Duration};

use anyhow::Context;
use client_core::api::DEFAULT_TIMEOUT;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "flowing.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub suggestion_interval_ms: u64,
    /// `0` disables periodic SLA refresh.
    pub sla_refresh_secs: u64,
    pub ml_poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5005".into(),
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            suggestion_interval_ms: 8_000,
            sla_refresh_secs: 60,
            ml_poll_interval_ms: 2_000,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn suggestion_interval(&self) -> Duration {
        Duration::from_millis(self.suggestion_interval_ms)
    }

    pub fn sla_refresh(&self) -> Option<Duration> {
        (self.sla_refresh_secs > 0).then(|| Duration::from_secs(self.sla_refresh_secs))
    }

    pub fn ml_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ml_poll_interval_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    suggestion_interval_ms: Option<u64>,
    sla_refresh_secs: Option<u64>,
    ml_poll_interval_ms: Option<u64>,
}

/// Defaults, then the config file, then environment variables.
///
/// An explicitly requested file must exist; the default `flowing.toml` is
/// optional.
pub fn load_settings(explicit_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = explicit_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => {
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        Err(err) if err.kind() == ErrorKind::NotFound && explicit_path.is_none() => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
    }

    apply_env(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file.suggestion_interval_ms {
        settings.suggestion_interval_ms = v;
    }
    if let Some(v) = file.sla_refresh_secs {
        settings.sla_refresh_secs = v;
    }
    if let Some(v) = file.ml_poll_interval_ms {
        settings.ml_poll_interval_ms = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("FLOWING_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    let numeric = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
    if let Some(v) = numeric("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = numeric("APP__SUGGESTION_INTERVAL_MS") {
        settings.suggestion_interval_ms = v;
    }
    if let Some(v) = numeric("APP__SLA_REFRESH_SECS") {
        settings.sla_refresh_secs = v;
    }
    if let Some(v) = numeric("APP__ML_POLL_INTERVAL_MS") {
        settings.ml_poll_interval_ms = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
