//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload intake configuration.
    #[serde(default)]
    pub upload: UploadSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Raw upload settings.
///
/// Size and allow-list strings are kept verbatim; turning them into limits
/// and a type policy (with their fallbacks) is the intake layer's job.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    /// Upload root directory.
    #[serde(default = "default_upload_root")]
    pub root: String,
    /// Human size string such as `"10MB"` (`MAX_FILE_SIZE`).
    #[serde(default)]
    pub max_file_size: Option<String>,
    /// Comma-separated extension allow-list (`ALLOWED_FILE_TYPES`).
    #[serde(default)]
    pub allowed_file_types: Option<String>,
}

fn default_upload_root() -> String {
    "uploads".to_string()
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            root: default_upload_root(),
            max_file_size: None,
            allowed_file_types: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, lowest precedence first: `config/default`, `config/{RUN_MODE}`,
    /// `SITEVAULT__*` variables, then the bare `MAX_FILE_SIZE` and
    /// `ALLOWED_FILE_TYPES` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("SITEVAULT").separator("__"))
            .set_override_option("upload.max_file_size", std::env::var("MAX_FILE_SIZE").ok())?
            .set_override_option(
                "upload.allowed_file_types",
                std::env::var("ALLOWED_FILE_TYPES").ok(),
            )?
            .build()?;

        config.try_deserialize()
    }
}
