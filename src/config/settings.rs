use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::directory::RecipientRecord;
use crate::template::AppointmentDateMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub recipients: Vec<RecipientRecord>,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum accepted request body in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

/// What to do when the transport reports an authentication failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailurePolicy {
    /// Tear the session down and schedule a reconnect
    #[default]
    Reconnect,
    /// Stop the process so an external supervisor restarts it fresh
    Terminate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Fixed client identifier the credentials are stored under
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Local directory holding persisted credentials
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// WebSocket URL of the browser-automation bridge
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
    /// Delay before a reconnect attempt, in seconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    /// Upper bound on waiting for a previous transport to tear down, in seconds
    #[serde(default = "default_teardown_timeout")]
    pub teardown_timeout_secs: u64,
    #[serde(default)]
    pub auth_failure: AuthFailurePolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub appointment_date_mode: AppointmentDateMode,
}

/// Recipient id sets driving the lead-notification precedence rules
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_volta_prequalification_ids")]
    pub volta_prequalification_ids: Vec<String>,
    #[serde(default = "default_comparacorsi_ids")]
    pub comparacorsi_ids: Vec<String>,
    #[serde(default = "default_formatemp_id")]
    pub formatemp_id: Option<String>,
    #[serde(default)]
    pub epicode_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3080
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024 // 10 MB
}

fn default_client_id() -> String {
    "main".to_string()
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./wa-session")
}

fn default_bridge_url() -> String {
    "ws://127.0.0.1:3090".to_string()
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_teardown_timeout() -> u64 {
    10
}

fn default_volta_prequalification_ids() -> Vec<String> {
    vec!["678f89da98becb24b578c3a5".to_string()]
}

fn default_comparacorsi_ids() -> Vec<String> {
    vec![
        "64c8d506f67b84dfe65a2d8f".to_string(),
        "668512a3e704f9d7c83d5c59".to_string(),
        "67b5e7addd9709f728e108a5".to_string(),
    ]
}

fn default_formatemp_id() -> Option<String> {
    Some("68f8ae7dccb51d3308fea01a".to_string())
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "lead-notification-relay".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::load(&run_mode, env::var("PORT").ok())
    }

    /// Build from the config files and environment. A bare `port` (the
    /// `PORT` variable) wins over every other source.
    pub(crate) fn load(run_mode: &str, port: Option<String>) -> Result<Self, ConfigError> {
        let port = port.and_then(|p| p.trim().parse::<i64>().ok());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3080)?
            .set_default("session.client_id", "main")?
            .set_default("session.reconnect_delay_secs", 5)?
            // Recipients and routing tables live in the config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, SESSION__BRIDGE_URL, OTEL__ENABLED, etc.
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .set_override_option("server.port", port)?;

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl SessionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_secs(self.teardown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            body_limit: default_body_limit(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            data_path: default_data_path(),
            bridge_url: default_bridge_url(),
            reconnect_delay_secs: default_reconnect_delay(),
            teardown_timeout_secs: default_teardown_timeout(),
            auth_failure: AuthFailurePolicy::default(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            volta_prequalification_ids: default_volta_prequalification_ids(),
            comparacorsi_ids: default_comparacorsi_ids(),
            formatemp_id: default_formatemp_id(),
            epicode_id: None,
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            templates: TemplateConfig::default(),
            routing: RoutingConfig::default(),
            recipients: vec![],
            otel: OtelConfig::default(),
        }
    }
}
