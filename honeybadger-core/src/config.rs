//! Configuration resolution
//!
//! A [`Configuration`] is an immutable value. New values are derived with
//! [`Configuration::resolve`], which applies a [`ConfigOverrides`] on top of an
//! existing configuration without touching it.
//!
//! Sources, lowest precedence first:
//! - compiled-in defaults ([`Configuration::default`])
//! - an optional TOML file (`[honeybadger]` table, see [`Configuration::load_from`])
//! - `HONEYBADGER_*` environment variables
//! - call-time overrides passed to `configure`
//!
//! The default file location follows XDG: `$XDG_CONFIG_HOME/honeybadger/config.toml`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Production collection endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.honeybadger.io";

/// Environments that route to the fake transport unless forced
pub const DEVELOPMENT_ENVIRONMENTS: &[&str] = &["development", "test"];

const ENV_PREFIX: &str = "HONEYBADGER_";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Delivery parameters for one notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    /// API key sent as the `X-API-Key` header. Checked lazily at send time.
    pub api_key: Option<String>,

    /// Base URL of the collection service
    pub endpoint: String,

    /// Environment name reported with every notice
    pub environment: String,

    /// Error class names that are never reported
    pub excluded_exceptions: BTreeSet<String>,

    /// Report even from development-like environments
    pub force_report_data: bool,

    /// Hostname reported in `server.hostname`
    pub hostname: String,

    /// Project root reported in `server.project_root`
    pub project_root: String,

    /// Context keys whose values are replaced with `[FILTERED]`
    pub params_filters: Vec<String>,

    /// Hard bound on one delivery request, in seconds
    pub timeout_secs: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            environment: default_environment(),
            excluded_exceptions: BTreeSet::new(),
            force_report_data: false,
            hostname: default_hostname(),
            project_root: default_project_root(),
            params_filters: default_params_filters(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

fn default_project_root() -> String {
    std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| ".".to_string())
}

fn default_params_filters() -> Vec<String> {
    vec![
        "password".to_string(),
        "password_confirmation".to_string(),
        "credit_card".to_string(),
    ]
}

fn default_timeout_secs() -> u64 {
    10
}

/// A partial configuration. `None` fields leave the base value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub environment: Option<String>,
    pub excluded_exceptions: Option<Vec<String>>,
    pub force_report_data: Option<bool>,
    pub hostname: Option<String>,
    pub project_root: Option<String>,
    pub params_filters: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Read `HONEYBADGER_*` variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are logged and skipped so a typo in the environment
    /// never stops the host from starting.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let force_report_data = var("FORCE_REPORT_DATA").and_then(|raw| {
            let parsed = parse_bool(&raw);
            if parsed.is_none() {
                tracing::warn!(value = %raw, "Ignoring invalid HONEYBADGER_FORCE_REPORT_DATA");
            }
            parsed
        });

        let timeout_secs = var("TIMEOUT_SECS").and_then(|raw| match raw.parse::<u64>() {
            Ok(secs) => Some(secs),
            Err(e) => {
                tracing::warn!(value = %raw, error = %e, "Ignoring invalid HONEYBADGER_TIMEOUT_SECS");
                None
            }
        });

        Self {
            api_key: var("API_KEY"),
            endpoint: var("ENDPOINT"),
            environment: var("ENVIRONMENT"),
            excluded_exceptions: var("EXCLUDED_EXCEPTIONS").map(|raw| split_list(&raw)),
            force_report_data,
            hostname: var("HOSTNAME"),
            project_root: var("PROJECT_ROOT"),
            params_filters: var("PARAMS_FILTERS").map(|raw| split_list(&raw)),
            timeout_secs,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// On-disk layout: everything lives under a `[honeybadger]` table
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    honeybadger: ConfigOverrides,
}

impl Configuration {
    /// Defaults with `HONEYBADGER_*` environment variables applied
    pub fn from_env() -> Self {
        Self::default().resolve(&ConfigOverrides::from_env())
    }

    /// Load a TOML file, then apply environment variables on top
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let file = Self::parse_file(&content)?;

        Ok(Self::default()
            .resolve(&file)
            .resolve(&ConfigOverrides::from_env()))
    }

    /// Load the default config file if it exists, otherwise use env + defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::debug!("No config file found at {:?}, using environment", config_path);
            return Ok(Self::from_env());
        }

        Self::load_from(&config_path)
    }

    fn parse_file(content: &str) -> Result<ConfigOverrides> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.honeybadger)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/honeybadger/config.toml` (~/.config/honeybadger/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("honeybadger").join("config.toml")
    }

    /// Derive a new configuration with `overrides` applied. `self` is unchanged.
    pub fn resolve(&self, overrides: &ConfigOverrides) -> Self {
        let mut next = self.clone();

        if let Some(api_key) = &overrides.api_key {
            next.api_key = Some(api_key.clone());
        }
        if let Some(endpoint) = &overrides.endpoint {
            next.endpoint = endpoint.clone();
        }
        if let Some(environment) = &overrides.environment {
            next.environment = environment.clone();
        }
        if let Some(excluded) = &overrides.excluded_exceptions {
            next.excluded_exceptions = excluded.iter().cloned().collect();
        }
        if let Some(force) = overrides.force_report_data {
            next.force_report_data = force;
        }
        if let Some(hostname) = &overrides.hostname {
            next.hostname = hostname.clone();
        }
        if let Some(project_root) = &overrides.project_root {
            next.project_root = project_root.clone();
        }
        if let Some(filters) = &overrides.params_filters {
            next.params_filters = filters.clone();
        }
        if let Some(timeout) = overrides.timeout_secs {
            next.timeout_secs = timeout;
        }

        next
    }

    /// False for the development-like environment names
    pub fn is_production(&self) -> bool {
        !DEVELOPMENT_ENVIRONMENTS.contains(&self.environment.as_str())
    }

    /// Whether errors of this class are dropped before delivery
    pub fn is_excluded(&self, class_name: &str) -> bool {
        self.excluded_exceptions.contains(class_name)
    }

    /// Structural checks. A missing API key is not an error here.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(Error::Config(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Copy safe to log: the API key is masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.api_key = copy.api_key.as_deref().map(mask_key);
        copy
    }
}

fn mask_key(key: &str) -> String {
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if key.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{tail}")
    }
}
