use crate::core::orchestrator::OrchestratorSettings;
use crate::core::prober::ProbeSettings;
use crate::domain::model::{HttpsStatusPolicy, Verbosity};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub probe: ProbeConfig,
    pub orchestrator: OrchestratorConfig,
    pub events: EventsConfig,
}

/// POST /check-domain 的回應方式，同一個部署固定一種
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// 立即回傳，結果走 /events
    #[default]
    Stream,
    /// 等全部檢查完成後一次回傳
    Sync,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<String>,
    pub response_mode: ResponseMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: Some("public".to_string()),
            response_mode: ResponseMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_ms: u64,
    pub verbosity: Verbosity,
    pub https_status_policy: HttpsStatusPolicy,
    pub http_fallback: bool,
    pub max_redirects: usize,
    pub accept_invalid_certs: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let defaults = ProbeSettings::default();
        Self {
            timeout_ms: defaults.timeout.as_millis() as u64,
            verbosity: Verbosity::default(),
            https_status_policy: defaults.https_status_policy,
            http_fallback: defaults.http_fallback,
            max_redirects: defaults.max_redirects,
            accept_invalid_certs: defaults.accept_invalid_certs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// 0 代表不限制
    pub max_concurrency: usize,
    pub max_checks_per_request: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 0,
            max_checks_per_request: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub keepalive_seconds: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            keepalive_seconds: 15,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AppError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SIMCHECK_PORT})，找不到的變數保留原文
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        validation::validate_range("server.port", self.server.port, 1, u16::MAX)?;
        if let Some(dir) = &self.server.static_dir {
            validation::validate_path("server.static_dir", dir)?;
        }

        validation::validate_range("probe.timeout_ms", self.probe.timeout_ms, 100, 120_000)?;
        validation::validate_range("probe.max_redirects", self.probe.max_redirects, 0, 50)?;

        validation::validate_positive_number(
            "orchestrator.max_checks_per_request",
            self.orchestrator.max_checks_per_request,
            1,
        )?;

        validation::validate_range("events.keepalive_seconds", self.events.keepalive_seconds, 1, 3600)?;

        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            timeout: Duration::from_millis(self.probe.timeout_ms),
            https_status_policy: self.probe.https_status_policy,
            http_fallback: self.probe.http_fallback,
            max_redirects: self.probe.max_redirects,
            accept_invalid_certs: self.probe.accept_invalid_certs,
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            verbosity: self.probe.verbosity,
            max_concurrency: Some(self.orchestrator.max_concurrency).filter(|n| *n > 0),
        }
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.events.keepalive_seconds)
    }

    /// 只有目錄存在時才提供靜態檔案
    pub fn static_dir(&self) -> Option<PathBuf> {
        self.server
            .static_dir
            .as_ref()
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config.listen_addr(), "0.0.0.0:3000");
        assert_eq!(config.server.response_mode, ResponseMode::Stream);
        assert_eq!(config.probe_settings().timeout, Duration::from_millis(5000));
        assert!(config.probe.http_fallback);
        assert_eq!(config.orchestrator_settings().max_concurrency, None);
        assert_eq!(config.keepalive_interval(), Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8080
response_mode = "sync"

[probe]
timeout_ms = 2500
verbosity = "verbose"
https_status_policy = "success_only"
http_fallback = false

[orchestrator]
max_concurrency = 8

[events]
keepalive_seconds = 30
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.server.response_mode, ResponseMode::Sync);
        assert_eq!(config.probe.verbosity, Verbosity::Verbose);

        let probe = config.probe_settings();
        assert_eq!(probe.timeout, Duration::from_millis(2500));
        assert_eq!(probe.https_status_policy, HttpsStatusPolicy::SuccessOnly);
        assert!(!probe.http_fallback);

        let orchestrator = config.orchestrator_settings();
        assert_eq!(orchestrator.max_concurrency, Some(8));
        assert_eq!(orchestrator.verbosity, Verbosity::Verbose);
        assert_eq!(config.keepalive_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SIMCHECK_TEST_HOST", "10.1.2.3");

        let toml_content = r#"
[server]
host = "${SIMCHECK_TEST_HOST}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.server.host, "10.1.2.3");

        std::env::remove_var("SIMCHECK_TEST_HOST");
    }

    #[test]
    fn test_config_validation() {
        let too_fast = AppConfig::from_toml_str("[probe]\ntimeout_ms = 10\n").unwrap();
        assert!(too_fast.validate().is_err());

        let no_port = AppConfig::from_toml_str("[server]\nport = 0\n").unwrap();
        assert!(no_port.validate().is_err());

        let blank_host = AppConfig::from_toml_str("[server]\nhost = \"  \"\n").unwrap();
        assert!(blank_host.validate().is_err());
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        let err = AppConfig::from_toml_str("[probe]\nverbosity = \"loud\"\n").unwrap_err();
        assert!(matches!(err, AppError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nport = 4000\nstatic_dir = \"/nonexistent/simcheck\"\n")
            .unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.static_dir(), None);
    }
}
