use crate::core::poller::DEFAULT_POLL_INTERVAL;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MarketplaceError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_required_field,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_interval_seconds() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_delay_ms() -> u64 {
    500
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_seconds: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: default_delay_ms(),
        }
    }
}

impl ClientConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MarketplaceError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| MarketplaceError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OWNLY_API_KEY})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }
}

impl ConfigProvider for ClientConfig {
    fn base_url(&self) -> &str {
        &self.api.base_url
    }

    fn api_key(&self) -> Option<&str> {
        self.api.api_key.as_deref()
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.api.timeout_seconds.map(Duration::from_secs)
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds)
    }

    fn output_path(&self) -> &str {
        &self.export.output_path
    }

    fn demo_mode(&self) -> bool {
        self.demo.enabled
    }

    fn demo_delay(&self) -> Duration {
        Duration::from_millis(self.demo.delay_ms)
    }
}

impl ClientConfig {
    /// 驗證配置；`require_key = false` 時略過 API key 檢查 (例如 health)
    pub fn validate_for(&self, require_key: bool) -> Result<()> {
        validate_positive_number("polling.interval_seconds", self.polling.interval_seconds, 1)?;
        validate_path("export.output_path", &self.export.output_path)?;
        if let Some(timeout) = self.api.timeout_seconds {
            validate_positive_number("api.timeout_seconds", timeout, 1)?;
        }

        // The demo backend needs neither a server nor a key.
        if self.demo.enabled {
            return Ok(());
        }

        validate_url("api.base_url", &self.api.base_url)?;
        if !require_key && self.api.api_key.is_none() {
            return Ok(());
        }
        let key = validate_required_field("api.api_key", &self.api.api_key)?;
        validate_non_empty_string("api.api_key", key)?;
        if key.contains("${") {
            return Err(MarketplaceError::InvalidConfigValueError {
                field: "api.api_key".to_string(),
                value: key.clone(),
                reason: "Environment variable is not set".to_string(),
            });
        }
        Ok(())
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        self.validate_for(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[api]
base_url = "https://api.ownly.dev"
api_key = "demo_abc"
timeout_seconds = 10

[polling]
interval_seconds = 2

[export]
output_path = "./exports"
"#;

        let config = ClientConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.base_url(), "https://api.ownly.dev");
        assert_eq!(config.api_key(), Some("demo_abc"));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.output_path(), "./exports");
        assert!(!config.demo_mode());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.demo_delay(), Duration::from_millis(500));
        // No API key outside demo mode
        assert!(matches!(
            config.validate(),
            Err(MarketplaceError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_key_optional_when_not_required() {
        let config = ClientConfig::from_toml_str("[api]\nbase_url = \"http://localhost:9000\"\n").unwrap();
        assert!(config.validate_for(false).is_ok());
        assert!(config.validate_for(true).is_err());

        let config = ClientConfig::from_toml_str("[api]\nbase_url = \"not a url\"\n").unwrap();
        assert!(config.validate_for(false).is_err());
    }

    #[test]
    fn test_demo_mode_needs_no_key() {
        let config = ClientConfig::from_toml_str("[demo]\nenabled = true\ndelay_ms = 0\n").unwrap();
        assert!(config.demo_mode());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("OWNLY_TEST_CONFIG_KEY", "demo_from_env");

        let toml_content = r#"
[api]
api_key = "${OWNLY_TEST_CONFIG_KEY}"
"#;

        let config = ClientConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api_key(), Some("demo_from_env"));

        std::env::remove_var("OWNLY_TEST_CONFIG_KEY");
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let toml_content = r#"
[api]
api_key = "${OWNLY_TEST_UNSET_VARIABLE}"
"#;

        let config = ClientConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api_key(), Some("${OWNLY_TEST_UNSET_VARIABLE}"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_values() {
        let config = ClientConfig::from_toml_str(
            "[api]\nbase_url = \"invalid-url\"\napi_key = \"demo_x\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = ClientConfig::from_toml_str("[polling]\ninterval_seconds = 0\n").unwrap();
        assert!(config.validate().is_err());

        assert!(ClientConfig::from_toml_str("[api\n").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[api]\nbase_url = \"http://localhost:9000\"\napi_key = \"demo_file\"\n")
            .unwrap();

        let config = ClientConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.base_url(), "http://localhost:9000");
    }
}
