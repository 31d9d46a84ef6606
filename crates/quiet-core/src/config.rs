use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8750;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Minutes before a block's start during which it becomes due.
pub const DEFAULT_LOOKAHEAD_MINUTES: i64 = 10;
/// Minutes past a missed start during which a late reminder still goes out.
pub const DEFAULT_GRACE_MINUTES: i64 = 30;
/// Cadence of the notifier engine tick.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
/// Per-provider send attempt budget; a hung provider cannot stall the run.
pub const PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Top-level config (quiet.toml + QUIET_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Reminder dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Must be > 0. A block becomes due when it starts within this window.
    #[serde(default = "default_lookahead")]
    pub lookahead_minutes: i64,
    /// How long past a missed start a late reminder is still sent.
    /// 0 disables late reminders entirely.
    #[serde(default = "default_grace")]
    pub grace_minutes: i64,
    /// Seconds between notifier engine ticks. Must be > 0.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    /// Bearer secret required by POST /api/dispatch. When unset the manual
    /// trigger route is disabled.
    pub cron_secret: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            lookahead_minutes: default_lookahead(),
            grace_minutes: default_grace(),
            interval_secs: default_interval(),
            from_name: default_from_name(),
            from_address: default_from_address(),
            cron_secret: None,
        }
    }
}

/// Which email providers are configured and in what fallback order.
///
/// A provider named in `order` but missing its credentials section is simply
/// skipped at construction time rather than treated as a startup error,
/// matching how the hosted APIs are usually provisioned one at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Strict priority order for fallback.
    #[serde(default = "default_provider_order")]
    pub order: Vec<String>,
    pub resend: Option<ResendConfig>,
    pub brevo: Option<BrevoConfig>,
    pub mailgun: Option<MailgunConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: default_provider_order(),
            resend: None,
            brevo: None,
            mailgun: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrevoConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailgunConfig {
    pub api_key: String,
    pub domain: String,
}

impl QuietConfig {
    /// Load config from a TOML file with QUIET_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.quiet-hours/quiet.toml
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: QuietConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("QUIET_").split("_"))
            .extract()
            .map_err(|e| ConfigError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the selector and engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notify.lookahead_minutes <= 0 {
            return Err(ConfigError(format!(
                "notify.lookahead_minutes must be > 0 (got {})",
                self.notify.lookahead_minutes
            )));
        }
        if self.notify.grace_minutes < 0 {
            return Err(ConfigError(format!(
                "notify.grace_minutes must be >= 0 (got {})",
                self.notify.grace_minutes
            )));
        }
        if self.notify.interval_secs == 0 {
            return Err(ConfigError(
                "notify.interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for QuietConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            notify: NotifyConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_lookahead() -> i64 {
    DEFAULT_LOOKAHEAD_MINUTES
}
fn default_grace() -> i64 {
    DEFAULT_GRACE_MINUTES
}
fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}
fn default_from_name() -> String {
    "Quiet Hours Scheduler".to_string()
}
fn default_from_address() -> String {
    "noreply@yourdomain.com".to_string()
}
fn default_provider_order() -> Vec<String> {
    vec![
        "resend".to_string(),
        "brevo".to_string(),
        "mailgun".to_string(),
    ]
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.quiet-hours/quiet.db", home)
}
fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.quiet-hours/quiet.toml", home)
}
