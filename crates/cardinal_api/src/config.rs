//! Client configuration.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Bundled defaults (`cardinal.toml` shipped with this crate)
//! 2. `~/.config/cardinal/cardinal.toml`
//! 3. `./cardinal.toml`
//! 4. `CARDINAL_*` environment variables

use cardinal_error::{CardinalError, CardinalResult, ConfigError};
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../cardinal.toml");

/// Connection settings for the Cardinal API.
///
/// # Example
///
/// ```
/// use cardinal_api::ApiConfig;
///
/// let config = ApiConfig::default()
///     .with_base_url("http://localhost:8080".to_string())
///     .with_max_attempts(5);
/// assert_eq!(config.base_url(), "http://localhost:8080");
/// assert_eq!(*config.max_attempts(), 5);
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct ApiConfig {
    /// Base URL every request path is appended to
    #[serde(default = "default_base_url")]
    base_url: String,

    /// Attempts made by the connect handshake
    #[serde(default = "default_max_attempts")]
    max_attempts: usize,

    /// Pause between connect attempts (milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    retry_backoff_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.cardinal.example/v1".to_string()
}

fn default_max_attempts() -> usize {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from a specific file path.
    ///
    /// Missing keys fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> CardinalResult<Self> {
        debug!("Loading configuration from file");

        let builder = Config::builder().add_source(File::from(path.as_ref()));
        Self::materialize(builder, &path.as_ref().display().to_string())
    }

    /// Load configuration with precedence:
    /// environment > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cardinal_api::ApiConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ApiConfig::load()?;
    /// println!("Talking to {}", config.base_url());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> CardinalResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/cardinal/cardinal.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("cardinal").required(false))
            .add_source(Environment::with_prefix("CARDINAL").try_parsing(true));

        Self::materialize(builder, "layered sources")
    }

    fn materialize(builder: ConfigBuilder<DefaultState>, source: &str) -> CardinalResult<Self> {
        builder
            .build()
            .map_err(|e| config_error(format!("Failed to read configuration from {source}"), e))?
            .try_deserialize()
            .map_err(|e| config_error(format!("Failed to parse configuration from {source}"), e))
    }

    /// Base URL without a trailing slash.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn config_error(context: String, err: config::ConfigError) -> CardinalError {
    ConfigError::new(format!("{context}: {err}")).into()
}
