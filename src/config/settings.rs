use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub log_store: LogStoreConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Rendering behavior for the template composer.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// When true, unresolved {{tokens}} fail the render; otherwise they
    /// render as the empty string.
    #[serde(default = "default_strict_variables")]
    pub strict_variables: bool,
}

fn default_strict_variables() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Maximum send attempts per dispatch (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Hard timeout for a single transport attempt, in seconds
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_seconds: u64,
    /// Overall deadline for one dispatch including retries, in seconds
    #[serde(default = "default_pipeline_timeout")]
    pub pipeline_timeout_seconds: u64,
    #[serde(default)]
    pub backoff: BackoffSettings,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_attempt_timeout() -> u64 {
    30
}

fn default_pipeline_timeout() -> u64 {
    120 // 2 minutes
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackoffSettings {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    30_000 // 30 seconds
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter_factor() -> f64 {
    0.1 // 10% jitter
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Transport backend: "smtp" or "sink"
    #[serde(default = "default_transport_backend")]
    pub backend: String,
    #[serde(default)]
    pub smtp: SmtpSettings,
}

fn default_transport_backend() -> String {
    "sink".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default)]
    pub use_tls: bool,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

fn default_from_email() -> String {
    "noreply@localhost".to_string()
}

fn default_from_name() -> String {
    "Mailroom".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogStoreConfig {
    /// Log store backend: "postgres" or "memory"
    #[serde(default = "default_log_backend")]
    pub backend: String,
    /// PostgreSQL connection URL (required for the postgres backend)
    #[serde(default)]
    pub database_url: Option<String>,
}

fn default_log_backend() -> String {
    "memory".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Emit logs as JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("render.strict_variables", true)?
            .set_default("dispatch.max_attempts", 3)?
            .set_default("dispatch.attempt_timeout_seconds", 30)?
            .set_default("dispatch.pipeline_timeout_seconds", 120)?
            .set_default("transport.backend", "sink")?
            .set_default("log_store.backend", "memory")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // RENDER_STRICT_VARIABLES, DISPATCH_MAX_ATTEMPTS, TRANSPORT_BACKEND, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            strict_variables: default_strict_variables(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            attempt_timeout_seconds: default_attempt_timeout(),
            pipeline_timeout_seconds: default_pipeline_timeout(),
            backoff: BackoffSettings::default(),
        }
    }
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            backend: default_transport_backend(),
            smtp: SmtpSettings::default(),
        }
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            use_tls: false,
        }
    }
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_log_backend(),
            database_url: None,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { json: false }
    }
}
