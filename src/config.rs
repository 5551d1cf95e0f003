//! Application configuration loaded from environment variables.

use serde::Deserialize;

/// Default location of the serialized classifier.
///
/// The classifier is trained in Keras and exported to ONNX before deployment
/// (for example `python -m tf2onnx.convert --keras my_classifier_model.keras
/// --output my_classifier_model.onnx`); `.keras` files are rejected at load.
pub const DEFAULT_MODEL_PATH: &str = "models/my_classifier_model.onnx";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Model ===
    /// Filesystem path of the ONNX classifier.
    #[serde(default = "default_model_path")]
    pub model_path: String,

    // === Server Configuration ===
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body size for uploads, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Install the Prometheus recorder and expose `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,
}

fn default_model_path() -> String {
    DEFAULT_MODEL_PATH.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024 // 10 MiB
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            metrics_enabled: default_true(),
            rust_log: default_log_level(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_path.trim().is_empty() {
            return Err("MODEL_PATH must not be empty".to_string());
        }

        if self.port == 0 {
            return Err("PORT must be non-zero".to_string());
        }

        if self.max_upload_bytes == 0 {
            return Err("MAX_UPLOAD_BYTES must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Socket address string to bind, e.g. `0.0.0.0:8000`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
