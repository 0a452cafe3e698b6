//! Import configuration
//!
//! Built from defaults, an optional `import.yml`, environment variables and
//! CLI overrides (in that order of precedence).

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::extract::ImportTarget;
use crate::upload::UploadSettings;

pub const DEFAULT_CONFIG_FILE: &str = "import.yml";
pub const DEFAULT_INPUT: &str = "result.json";
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_DELAY_MS: u64 = 500;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_ENDPOINT: &str = "IMPORT_ENDPOINT";
pub const ENV_SECRET: &str = "ADMIN_SECRET";
pub const ENV_INPUT: &str = "IMPORT_INPUT";
pub const ENV_CHAT_ID: &str = "IMPORT_CHAT_ID";
pub const ENV_CATEGORY: &str = "IMPORT_CATEGORY";
pub const ENV_BATCH_SIZE: &str = "IMPORT_BATCH_SIZE";
pub const ENV_DELAY_MS: &str = "IMPORT_DELAY_MS";
pub const ENV_TIMEOUT_SECS: &str = "IMPORT_TIMEOUT_SECS";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    import: Option<YamlImport>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlImport {
    endpoint: Option<String>,
    admin_secret: Option<String>,
    input: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    chat_id: Option<String>,
    category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    batch_size: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    delay_ms: Option<String>,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    timeout_secs: Option<String>,
}

/// Numeric fields may be written as numbers or as `${VAR}` strings; both are
/// kept as text and parsed after env resolution.
fn deserialize_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a number or a ${{VAR}} string, got {:?}",
            other
        ))),
    }
}

/// Values given on the command line. `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub admin_secret: Option<String>,
    pub input: Option<PathBuf>,
    pub chat_id: Option<i64>,
    pub category: Option<String>,
    pub batch_size: Option<usize>,
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Everything one import run needs.
#[derive(Clone)]
pub struct ImportConfig {
    pub endpoint: String,
    pub admin_secret: String,
    pub input: PathBuf,
    pub chat_id: i64,
    pub category: String,
    pub batch_size: usize,
    pub delay_ms: u64,
    pub timeout_secs: u64,
}

impl fmt::Debug for ImportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportConfig")
            .field("endpoint", &self.endpoint)
            .field("admin_secret", &"<redacted>")
            .field("input", &self.input)
            .field("chat_id", &self.chat_id)
            .field("category", &self.category)
            .field("batch_size", &self.batch_size)
            .field("delay_ms", &self.delay_ms)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            admin_secret: String::new(),
            input: PathBuf::from(DEFAULT_INPUT),
            chat_id: 0,
            category: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            delay_ms: DEFAULT_DELAY_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ImportConfig {
    /// Load configuration from `path`, or from `import.yml` when it exists.
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// file just means "environment only".
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_dotenv();

        let content = match path {
            Some(p) => Some(fs::read_to_string(p).map_err(|e| {
                Error::ConfigError(format!("Failed to read {}: {}", p.display(), e))
            })?),
            None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
        };

        match content {
            Some(content) => Self::from_yaml_str(&content),
            None => Self::from_yaml(YamlConfig::default()),
        }
    }

    /// Parse YAML content and layer environment variables over it.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml: YamlConfig = if content.trim().is_empty() {
            YamlConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        Self::from_yaml(yaml)
    }

    fn from_yaml(yaml: YamlConfig) -> Result<Self> {
        let import = yaml.import.unwrap_or_default();
        let defaults = Self::default();

        let chat_id = Self::resolve_env_parsed(import.chat_id, "chat_id", ENV_CHAT_ID)?;
        let batch_size = Self::resolve_env_parsed(import.batch_size, "batch_size", ENV_BATCH_SIZE)?;
        let delay_ms = Self::resolve_env_parsed(import.delay_ms, "delay_ms", ENV_DELAY_MS)?;
        let timeout_secs =
            Self::resolve_env_parsed(import.timeout_secs, "timeout_secs", ENV_TIMEOUT_SECS)?;

        Ok(Self {
            endpoint: Self::resolve_env_string(import.endpoint, ENV_ENDPOINT).unwrap_or_default(),
            admin_secret: Self::resolve_env_string(import.admin_secret, ENV_SECRET)
                .unwrap_or_default(),
            input: Self::resolve_env_string(import.input, ENV_INPUT)
                .map(PathBuf::from)
                .unwrap_or(defaults.input),
            chat_id: chat_id.unwrap_or(defaults.chat_id),
            category: Self::resolve_env_string(import.category, ENV_CATEGORY).unwrap_or_default(),
            batch_size: batch_size.unwrap_or(defaults.batch_size),
            delay_ms: delay_ms.unwrap_or(defaults.delay_ms),
            timeout_secs: timeout_secs.unwrap_or(defaults.timeout_secs),
        })
    }

    /// `.env` from the working directory, or its parent as a fallback.
    fn load_dotenv() {
        let _ = dotenvy::dotenv().or_else(|_| dotenvy::from_filename("../.env"));
    }

    /// Resolve a value: the explicit env var wins, then the YAML value with
    /// `${VAR}` placeholders expanded. An unresolved placeholder counts as unset.
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Ok(env_val) = std::env::var(env_key) {
            if !env_val.is_empty() {
                return Some(env_val);
            }
        }

        let v = value?;
        if v.starts_with("${") && v.ends_with('}') {
            let var_name = &v[2..v.len() - 1];
            return std::env::var(var_name).ok().filter(|s| !s.is_empty());
        }
        Some(v)
    }

    /// Like [`Self::resolve_env_string`], then parsed. Errors name the source
    /// the bad value came from (env var or config file field).
    fn resolve_env_parsed<T: FromStr>(
        value: Option<String>,
        field: &str,
        env_key: &str,
    ) -> Result<Option<T>> {
        let from_env = std::env::var(env_key).is_ok_and(|v| !v.is_empty());
        let Some(raw) = Self::resolve_env_string(value, env_key) else {
            return Ok(None);
        };

        raw.trim().parse::<T>().map(Some).map_err(|_| {
            let source = if from_env {
                format!("environment variable {}", env_key)
            } else {
                format!("config field import.{}", field)
            };
            Error::InvalidArgument(format!("{} has an invalid value: {:?}", source, raw))
        })
    }

    /// Apply CLI overrides on top of the loaded values.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(secret) = overrides.admin_secret {
            self.admin_secret = secret;
        }
        if let Some(input) = overrides.input {
            self.input = input;
        }
        if let Some(chat_id) = overrides.chat_id {
            self.chat_id = chat_id;
        }
        if let Some(category) = overrides.category {
            self.category = category;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(delay_ms) = overrides.delay_ms {
            self.delay_ms = delay_ms;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
    }

    /// Check the values an import run depends on.
    ///
    /// Endpoint and secret are only required when something is uploaded.
    pub fn validate(&self, will_upload: bool) -> Result<()> {
        if self.chat_id == 0 {
            return Err(Error::InvalidArgument(format!(
                "chat_id is not set (use --chat-id or {})",
                ENV_CHAT_ID
            )));
        }
        if self.category.trim().is_empty() {
            return Err(Error::InvalidArgument(format!(
                "category is not set (use --category or {})",
                ENV_CATEGORY
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidArgument(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidArgument(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if will_upload {
            if self.endpoint.trim().is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "endpoint is not set (use --endpoint or {})",
                    ENV_ENDPOINT
                )));
            }
            if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
                return Err(Error::InvalidArgument(format!(
                    "endpoint must be an http(s) URL: {}",
                    self.endpoint
                )));
            }
            if self.admin_secret.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "admin secret is not set (use --secret or {})",
                    ENV_SECRET
                )));
            }
        }

        Ok(())
    }

    pub fn target(&self) -> ImportTarget {
        ImportTarget {
            chat_id: self.chat_id,
            category: self.category.clone(),
        }
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            batch_size: self.batch_size,
            delay: Duration::from_millis(self.delay_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
