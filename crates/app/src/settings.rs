//! Handles settings for the application.
//!
//! Values come from an optional `settings.toml` (or the file passed with
//! `--config`), overlaid by `SPLITLEDGER__<SECTION>__<KEY>` environment
//! variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

/// Payment provider credentials. Without them the webhook rejects every
/// delivery and wallet funding is disabled.
#[derive(Debug, Deserialize)]
pub struct Payments {
    pub secret_key: String,
    #[serde(default = "default_provider_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub operation_timeout_secs: u64,
    pub notification_workers: usize,
    pub notification_queue: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            operation_timeout_secs: 5,
            notification_workers: 4,
            notification_queue: 256,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub expire_every_secs: u64,
    pub remind_every_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            expire_every_secs: 6 * 60 * 60,
            remind_every_secs: 24 * 60 * 60,
            shutdown_grace_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    pub payments: Option<Payments>,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path.unwrap_or("settings")).required(path.is_some()))
            .add_source(Environment::with_prefix("SPLITLEDGER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_provider_url() -> String {
    "https://api.paystack.co".to_string()
}
