use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::flow::FlowKind;
use crate::locale::Locale;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub flows: FlowsConfig,
    #[serde(default)]
    pub address_validation: AddressValidationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Cookie carrying the session id
    pub cookie_name: String,
    /// Mark the cookie `Secure` (HTTPS deployments)
    pub secure_cookie: bool,
    /// Seconds a session may sit idle before it is dropped
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

fn default_session_ttl() -> u64 {
    crate::session::DEFAULT_IDLE_TTL.as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowsConfig {
    /// Where English users land when their flow is missing or finished
    pub fallback_url_en: String,
    /// Where French users land when their flow is missing or finished
    pub fallback_url_fr: String,
    /// Flow kinds served, by slug (`apply`, `renew`, `protected-renew`)
    pub enabled: Vec<String>,
}

/// External address validation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressValidationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_address_timeout")]
    pub timeout_secs: u64,
}

fn default_address_timeout() -> u64 {
    10
}

impl Default for AddressValidationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            timeout_secs: default_address_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write logs to a file in `dir` instead of stderr
    #[serde(default)]
    pub to_file: bool,

    #[serde(default = "default_log_dir")]
    pub dir: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
            dir: default_log_dir(),
        }
    }
}

impl Config {
    /// Project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("benefits-flow.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the service runs without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // User config in ~/.config/benefits-flow/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("benefits-flow").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with BENEFITS_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("BENEFITS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    pub fn fallback_url(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.flows.fallback_url_en,
            Locale::Fr => &self.flows.fallback_url_fr,
        }
    }

    /// Enabled flow kinds; unknown slugs are skipped
    pub fn enabled_flows(&self) -> Vec<FlowKind> {
        self.flows
            .enabled
            .iter()
            .filter_map(|slug| FlowKind::from_slug(slug))
            .collect()
    }

    pub fn is_enabled(&self, kind: FlowKind) -> bool {
        self.flows.enabled.iter().any(|slug| slug == kind.slug())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 7010,
            },
            session: SessionConfig {
                cookie_name: "benefits_session".to_string(),
                secure_cookie: false,
                ttl_secs: default_session_ttl(),
            },
            flows: FlowsConfig {
                fallback_url_en: "https://www.canada.ca/en/services/benefits/dental.html"
                    .to_string(),
                fallback_url_fr: "https://www.canada.ca/fr/services/prestations/dentaire.html"
                    .to_string(),
                enabled: FlowKind::all()
                    .iter()
                    .map(|kind| kind.slug().to_string())
                    .collect(),
            },
            address_validation: AddressValidationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
