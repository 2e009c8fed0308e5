use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::SyncTimings;
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "registry-console.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub registry_url: String,
    pub database_url: String,
    pub login_redirect_ms: u64,
    pub update_redirect_ms: u64,
    pub register_redirect_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let timings = SyncTimings::default();
        Self {
            registry_url: "http://localhost:3000".into(),
            database_url: "sqlite://./data/registry-console.db".into(),
            login_redirect_ms: millis(timings.login_redirect),
            update_redirect_ms: millis(timings.update_redirect),
            register_redirect_ms: millis(timings.register_redirect),
        }
    }
}

impl Settings {
    pub fn timings(&self) -> SyncTimings {
        SyncTimings {
            login_redirect: Duration::from_millis(self.login_redirect_ms),
            update_redirect: Duration::from_millis(self.update_redirect_ms),
            register_redirect: Duration::from_millis(self.register_redirect_ms),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat key/value file if present, then the environment.
pub fn load_settings_from<F>(file: &Path, env: F) -> anyhow::Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", file.display()))?;
        apply_file(&mut settings, &file_cfg)
            .with_context(|| format!("invalid settings in '{}'", file.display()))?;
    }

    if let Some(v) = env("REGISTRY_URL") {
        settings.registry_url = v;
    }
    if let Some(v) = env("APP__REGISTRY_URL") {
        settings.registry_url = v;
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    for (key, slot) in [
        ("APP__LOGIN_REDIRECT_MS", &mut settings.login_redirect_ms),
        ("APP__UPDATE_REDIRECT_MS", &mut settings.update_redirect_ms),
        ("APP__REGISTER_REDIRECT_MS", &mut settings.register_redirect_ms),
    ] {
        if let Some(v) = env(key) {
            *slot = v
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole number of milliseconds"))?;
        }
    }

    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) -> anyhow::Result<()> {
    if let Some(v) = file_cfg.get("registry_url").and_then(toml::Value::as_str) {
        settings.registry_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("database_url").and_then(toml::Value::as_str) {
        settings.database_url = v.to_string();
    }

    for (key, slot) in [
        ("login_redirect_ms", &mut settings.login_redirect_ms),
        ("update_redirect_ms", &mut settings.update_redirect_ms),
        ("register_redirect_ms", &mut settings.register_redirect_ms),
    ] {
        let Some(value) = file_cfg.get(key) else {
            continue;
        };
        let parsed = value
            .as_integer()
            .and_then(|n| u64::try_from(n).ok())
            .with_context(|| format!("{key} must be a non-negative integer"))?;
        *slot = parsed;
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
