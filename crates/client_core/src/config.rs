use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "mf_agent.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub teardown_on_reset: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".into(),
            request_timeout_secs: 60,
            teardown_on_reset: false,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn base_url(&self) -> anyhow::Result<Url> {
        parse_base_url(&self.api_base_url)
    }
}

/// Defaults, then `mf_agent.toml` in the working directory, then environment.
/// A missing default file is fine; one that exists but cannot be read or
/// parsed is an error.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    let path = Path::new(DEFAULT_SETTINGS_FILE);
    if !path.exists() {
        let mut settings = ClientSettings::default();
        apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
        return Ok(settings);
    }
    load_settings_from(path)
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;

    let mut settings = ClientSettings::default();
    apply_file_values(&mut settings, &file_cfg);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    tracing::debug!(path = %path.display(), "loaded settings file");
    Ok(settings)
}

fn apply_file_values(settings: &mut ClientSettings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("api_base_url").and_then(toml::Value::as_str) {
        settings.api_base_url = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
    {
        if let Ok(parsed) = u64::try_from(v) {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = file_cfg
        .get("teardown_on_reset")
        .and_then(toml::Value::as_bool)
    {
        settings.teardown_on_reset = v;
    }
}

pub(crate) fn apply_env_overrides(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("MF_AGENT_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = lookup("APP__TEARDOWN_ON_RESET") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => settings.teardown_on_reset = true,
            "0" | "false" | "no" | "off" => settings.teardown_on_reset = false,
            _ => {}
        }
    }
}

pub fn parse_base_url(raw: &str) -> anyhow::Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(anyhow!("backend url must not be empty"));
    }
    let url = Url::parse(trimmed).with_context(|| format!("invalid backend url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "backend url '{raw}' must use http or https, not '{}'",
            url.scheme()
        ));
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
