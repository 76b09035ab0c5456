use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context};
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "configurator.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the catalogue REST backend.
    pub api_url: String,
    /// Origin serving static assets (`/3d/{id}.glb`) and the AR viewer page.
    pub asset_base_url: String,
    pub database_url: String,
    /// Name of the local record holding the cart.
    pub cart_record_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".into(),
            asset_base_url: "http://127.0.0.1:5173".into(),
            database_url: "sqlite://./data/configurator.db".into(),
            cart_record_name: "panier".into(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("api_url", &self.api_url),
            ("asset_base_url", &self.asset_base_url),
        ] {
            let parsed = Url::parse(value)
                .with_context(|| format!("{name} '{value}' is not a valid URL"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("{name} '{value}' must use http or https");
            }
        }
        if self.cart_record_name.trim().is_empty() {
            bail!("cart_record_name must not be empty");
        }
        Ok(())
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> Settings {
    let file = fs::read_to_string(path).ok();
    resolve_settings(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the flat TOML file, then the environment.
pub fn resolve_settings(
    file_contents: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file_contents {
        match toml::from_str::<HashMap<String, String>>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("api_url") {
                    settings.api_url = v.clone();
                }
                if let Some(v) = file_cfg.get("asset_base_url") {
                    settings.asset_base_url = v.clone();
                }
                if let Some(v) = file_cfg.get("database_url") {
                    settings.database_url = v.clone();
                }
                if let Some(v) = file_cfg.get("cart_record_name") {
                    settings.cart_record_name = v.clone();
                }
            }
            Err(err) => tracing::warn!(error = %err, "ignoring unreadable settings file"),
        }
    }

    for key in ["API_URL", "APP__API_URL"] {
        if let Some(v) = env(key) {
            settings.api_url = v;
        }
    }
    for key in ["ASSET_BASE_URL", "APP__ASSET_BASE_URL"] {
        if let Some(v) = env(key) {
            settings.asset_base_url = v;
        }
    }
    for key in ["DATABASE_URL", "APP__DATABASE_URL"] {
        if let Some(v) = env(key) {
            settings.database_url = v;
        }
    }
    if let Some(v) = env("APP__CART_RECORD_NAME") {
        settings.cart_record_name = v;
    }

    settings.api_url = trim_base_url(&settings.api_url);
    settings.asset_base_url = trim_base_url(&settings.asset_base_url);
    settings
}

fn trim_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Turns a plain path or a `sqlite:` path into a `sqlite://` URL. The storage
/// layer creates missing parent directories when it opens the file.
pub fn prepare_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
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
