use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Hosted table API the local cache synchronizes with
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL (e.g., "http://localhost:8080")
    pub base_url: Option<String>,
    /// API key sent as a bearer token
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Reconcile every bucket after each write command (default: false)
    pub auto_sync: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: 10,
            auto_sync: false,
        }
    }
}

impl RemoteConfig {
    /// Returns true if both base_url and api_key are set
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Generative-text backend used for report narratives.
///
/// Any endpoint speaking the chat-completions protocol works. Without an API
/// key, reports use the local template narrative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_output_tokens: 2048,
            timeout_secs: 60,
        }
    }
}

impl AiConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub poll_interval_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite cache
    pub database_path: ConfigValue<PathBuf>,
    /// School name printed on report headers
    pub school_name: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub remote: RemoteConfig,
    pub ai: AiConfig,
    pub dashboard: DashboardConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    school_name: Option<String>,
    remote: Option<RemoteConfig>,
    ai: Option<AiConfig>,
    dashboard: Option<DashboardConfig>,
}

pub const DEFAULT_SCHOOL_NAME: &str = "Colegio SkolAI";

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an explicit environment lookup.
    pub fn load_with_env(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let default_db_path = Self::default_data_dir().join("skolai.db");

        // Start with defaults
        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut school_name =
            ConfigValue::new(DEFAULT_SCHOOL_NAME.to_string(), ConfigSource::Default);
        let mut config_file = None;
        let mut remote = RemoteConfig::default();
        let mut ai = AiConfig::default();
        let mut dashboard = DashboardConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                database_path =
                    ConfigValue::new(resolve_relative(&path, db_path), ConfigSource::File);
            }
            if let Some(name) = file_config.school_name {
                school_name = ConfigValue::new(name, ConfigSource::File);
            }
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }
            if let Some(ai_config) = file_config.ai {
                ai = ai_config;
            }
            if let Some(dashboard_config) = file_config.dashboard {
                dashboard = dashboard_config;
            }
        }

        // Apply environment variable overrides
        if let Some(db_path) = env("SKOLAI_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Some(name) = env("SKOLAI_SCHOOL_NAME") {
            school_name = ConfigValue::new(name, ConfigSource::Environment);
        }
        if let Some(url) = env("SKOLAI_REMOTE_URL") {
            remote.base_url = Some(url);
        }
        if let Some(key) = env("SKOLAI_REMOTE_API_KEY") {
            remote.api_key = Some(key);
        }
        if let Some(endpoint) = env("SKOLAI_AI_ENDPOINT") {
            ai.endpoint = endpoint;
        }
        if let Some(key) = env("SKOLAI_AI_API_KEY") {
            ai.api_key = Some(key);
        }
        if let Some(model) = env("SKOLAI_AI_MODEL") {
            ai.model = model;
        }

        Ok(Self {
            database_path,
            school_name,
            config_file,
            remote,
            ai,
            dashboard,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/skolai/
    /// - macOS: ~/Library/Application Support/skolai/
    /// - Windows: %APPDATA%/skolai/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skolai")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/skolai/
    /// - macOS: ~/Library/Application Support/skolai/
    /// - Windows: %APPDATA%/skolai/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skolai")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }

    /// Starter config file written by `skolai config init`.
    pub fn template() -> String {
        format!(
            r#"# SkolAI configuration
# database_path: {db}
school_name: "{school}"

remote:
  # base_url: "http://localhost:8080"
  # api_key: "..."
  timeout_secs: 10
  auto_sync: false

ai:
  endpoint: "{endpoint}"
  # api_key: "..."
  model: "{model}"
  temperature: 0.7
  max_output_tokens: 2048

dashboard:
  poll_interval_secs: 30
"#,
            db = Self::default_data_dir().join("skolai.db").display(),
            school = DEFAULT_SCHOOL_NAME,
            endpoint = AiConfig::default().endpoint,
            model = AiConfig::default().model,
        )
    }
}

/// Shows the first few characters of a secret, e.g. `sk-a1b2...`.
pub fn mask_key(key: &str) -> String {
    if key.chars().count() <= 4 {
        return "***".to_string();
    }
    format!("{}...", key.chars().take(7).collect::<String>())
}

impl Config {
    /// Copy safe to print, with API keys masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.remote.api_key = config.remote.api_key.as_deref().map(mask_key);
        config.ai.api_key = config.ai.api_key.as_deref().map(mask_key);
        config
    }
}

/// Resolve relative paths against the config file's directory
fn resolve_relative(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    WriteError(PathBuf, std::io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::WriteError(path, e) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_no_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        assert!(config
            .database_path
            .value
            .to_string_lossy()
            .contains("skolai.db"));
        assert_eq!(config.database_path.source, ConfigSource::Default);
        assert_eq!(config.school_name.value, DEFAULT_SCHOOL_NAME);
        assert!(config.config_file.is_none());
        assert!(!config.remote.is_configured());
        assert!(!config.ai.is_configured());
        assert_eq!(config.dashboard.poll_interval_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /custom/path/db.sqlite").unwrap();
        writeln!(file, "school_name: Liceo Bicentenario").unwrap();
        writeln!(file, "remote:").unwrap();
        writeln!(file, "  base_url: http://localhost:9000").unwrap();
        writeln!(file, "  api_key: k").unwrap();
        writeln!(file, "ai:").unwrap();
        writeln!(file, "  model: local-model").unwrap();

        let config = Config::load_with_env(Some(config_path.clone()), no_env).unwrap();
        assert_eq!(
            config.database_path.value,
            PathBuf::from("/custom/path/db.sqlite")
        );
        assert_eq!(config.school_name.value, "Liceo Bicentenario");
        assert_eq!(config.school_name.source, ConfigSource::File);
        assert_eq!(config.config_file, Some(config_path));
        assert!(config.remote.is_configured());
        assert_eq!(config.remote.timeout_secs, 10);
        assert_eq!(config.ai.model, "local-model");
        assert_eq!(config.ai.max_output_tokens, 2048);
    }

    #[test]
    fn test_relative_database_path_resolves_against_config_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "database_path: data/skolai.db\n").unwrap();

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        assert_eq!(
            config.database_path.value,
            temp_dir.path().join("data/skolai.db")
        );
    }

    #[test]
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "school_name: fromfile\n").unwrap();

        let env: HashMap<&str, &str> = [
            ("SKOLAI_SCHOOL_NAME", "fromenv"),
            ("SKOLAI_AI_API_KEY", "secret"),
            ("SKOLAI_REMOTE_URL", "http://remote"),
        ]
        .into_iter()
        .collect();

        let config =
            Config::load_with_env(Some(config_path), |k| env.get(k).map(|v| v.to_string()))
                .unwrap();
        assert_eq!(config.school_name.value, "fromenv");
        assert_eq!(config.school_name.source, ConfigSource::Environment);
        assert!(config.ai.is_configured());
        assert_eq!(config.remote.base_url.as_deref(), Some("http://remote"));
        assert!(!config.remote.is_configured());
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load_with_env(Some(config_path), no_env);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_redacted_masks_keys() {
        assert_eq!(mask_key("abc"), "***");
        assert_eq!(mask_key("sk-1234567890"), "sk-1234...");

        let temp_dir = tempdir().unwrap();
        let env: HashMap<&str, &str> = [
            ("SKOLAI_REMOTE_URL", "http://remote"),
            ("SKOLAI_REMOTE_API_KEY", "remote-secret-key"),
            ("SKOLAI_AI_API_KEY", "ai-secret-key"),
        ]
        .into_iter()
        .collect();
        let config = Config::load_with_env(Some(temp_dir.path().join("none.yaml")), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();

        let shown = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("remote-secret-key"));
        assert!(!shown.contains("ai-secret-key"));
        assert!(shown.contains("remote-..."));
        assert_eq!(config.remote.api_key.as_deref(), Some("remote-secret-key"));
    }

    #[test]
    fn test_template_parses() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, Config::template()).unwrap();

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        assert_eq!(config.school_name.value, DEFAULT_SCHOOL_NAME);
        assert!(!config.remote.auto_sync);
    }
}
