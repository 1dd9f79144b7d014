//! Configuration management.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub odoo: OdooConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

/// Connection settings for the Odoo instance.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct OdooConfig {
    /// Base URL, e.g. "https://example.odoo.com"
    #[serde(default)]
    pub url: String,
    /// Database (tenant) name
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    /// Password or API key
    #[serde(default)]
    pub password: String,
    /// Per-request timeout; unset means wait forever
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl OdooConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// Hand-written so the password never reaches logs.
impl fmt::Debug for OdooConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OdooConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Import behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// CSV file to read
    #[serde(default)]
    pub csv_path: String,
    /// Abort the run on the first row the remote declines
    #[serde(default)]
    pub stop_on_rejection: bool,
    /// CSV column -> partner field
    #[serde(default = "default_fields")]
    pub fields: BTreeMap<String, String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            csv_path: String::new(),
            stop_on_rejection: false,
            fields: default_fields(),
        }
    }
}

fn default_fields() -> BTreeMap<String, String> {
    ["name", "email", "phone"]
        .into_iter()
        .map(|f| (f.to_string(), f.to_string()))
        .collect()
}

impl ImportConfig {
    /// Columns the CSV header must carry: every mapped column plus `name`.
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.fields.keys().cloned().collect();
        if !self.fields.contains_key("name") {
            columns.insert(0, "name".to_string());
        }
        columns
    }
}

impl Config {
    /// Load configuration from default location.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            Self::from_file(&config_path.to_string_lossy())
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: &str) -> Result<Self> {
        let expanded = expand_path(path);
        let content = std::fs::read_to_string(&expanded)
            .with_context(|| format!("reading config file {}", expanded))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing config file {}", expanded))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("partner-import")
            .join("config.toml")
    }

    /// The CSV path with `~` expanded.
    pub fn csv_path(&self) -> PathBuf {
        PathBuf::from(expand_path(&self.import.csv_path))
    }

    /// Check that everything a run needs is present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            (&self.odoo.url, "Odoo URL", "--url or ODOO_URL"),
            (&self.odoo.database, "database", "--database or ODOO_DB"),
            (&self.odoo.username, "username", "--username or ODOO_USERNAME"),
            (&self.import.csv_path, "CSV path", "the CSV argument or [import].csv_path"),
        ];
        for (value, what, hint) in required {
            if value.trim().is_empty() {
                bail!("missing {}; set {}", what, hint);
            }
        }

        if !self.odoo.url.starts_with("http://") && !self.odoo.url.starts_with("https://") {
            bail!("Odoo URL must start with http:// or https://, got '{}'", self.odoo.url);
        }

        if self.import.fields.is_empty() {
            bail!("[import.fields] maps no columns");
        }

        Ok(())
    }
}

/// Expand ~ to home directory.
fn expand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path.to_string()
}
