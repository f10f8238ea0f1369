use crate::domain::model::Section;
use crate::domain::ports::{ConfigProvider, FetchFailurePolicy, OutputOptions};
use crate::utils::error::{OrderError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub portfolio: PortfolioConfig,
    pub source: SourceConfig,
    pub order: Option<OrderConfig>,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
    pub error_handling: Option<ErrorHandlingConfig>,
    pub performance: Option<PerformanceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// `api` or `file`
    pub r#type: String,
    pub endpoint: Option<String>,
    pub directory: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfig {
    pub sections: Option<Vec<String>>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    /// `empty` or `abort`
    pub on_fetch_failure: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    pub concurrent_requests: Option<usize>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OrderError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| OrderError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PORTFOLIO_API})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| OrderError::config(format!("env substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("portfolio.name", &self.portfolio.name)?;

        match self.source.r#type.as_str() {
            "api" => {
                let endpoint = self.source.endpoint.as_deref().ok_or_else(|| {
                    OrderError::MissingConfigError {
                        field: "source.endpoint".to_string(),
                    }
                })?;
                validation::validate_url("source.endpoint", endpoint)?;
            }
            "file" => {
                let directory = self.source.directory.as_deref().ok_or_else(|| {
                    OrderError::MissingConfigError {
                        field: "source.directory".to_string(),
                    }
                })?;
                validation::validate_path("source.directory", directory)?;
            }
            other => validation::validate_one_of("source.type", other, &["api", "file"])?,
        }

        validation::validate_path("load.output_path", &self.load.output_path)?;
        for format in &self.load.output_formats {
            validation::validate_one_of("load.output_formats", format, &super::OUTPUT_FORMATS)?;
        }

        if let Some(sections) = self.order.as_ref().and_then(|o| o.sections.as_ref()) {
            for section in sections {
                section.parse::<Section>()?;
            }
        }

        if let Some(policy) = self
            .error_handling
            .as_ref()
            .and_then(|e| e.on_fetch_failure.as_deref())
        {
            validation::validate_one_of(
                "error_handling.on_fetch_failure",
                policy,
                &["empty", "abort"],
            )?;
        }

        validation::validate_positive_number(
            "performance.concurrent_requests",
            self.concurrent_requests(),
            1,
        )?;

        Ok(())
    }

    pub fn is_file_source(&self) -> bool {
        self.source.r#type == "file"
    }

    pub fn api_endpoint(&self) -> &str {
        self.source
            .endpoint
            .as_deref()
            .unwrap_or(super::DEFAULT_API_BASE)
    }

    pub fn is_monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().is_some_and(|m| m.enabled)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.source
            .timeout_seconds
            .unwrap_or(crate::adapters::http::DEFAULT_TIMEOUT_SECS)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

impl ConfigProvider for TomlConfig {
    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn sections(&self) -> Vec<Section> {
        let mut sections: Vec<Section> = match self.order.as_ref().and_then(|o| o.sections.as_ref()) {
            Some(names) => names.iter().filter_map(|n| n.parse().ok()).collect(),
            None => Section::ALL.to_vec(),
        };
        sections.sort();
        sections.dedup();
        sections
    }

    fn output_options(&self) -> OutputOptions {
        OutputOptions {
            csv: self.load.output_formats.iter().any(|f| f == "csv"),
            zip: self.load.compression.as_ref().is_some_and(|c| c.enabled),
        }
    }

    fn concurrent_requests(&self) -> usize {
        self.performance
            .as_ref()
            .and_then(|p| p.concurrent_requests)
            .unwrap_or(4)
    }

    fn on_fetch_failure(&self) -> FetchFailurePolicy {
        match self
            .error_handling
            .as_ref()
            .and_then(|e| e.on_fetch_failure.as_deref())
        {
            Some("abort") => FetchFailurePolicy::Abort,
            _ => FetchFailurePolicy::Empty,
        }
    }

    fn shuffle_seed(&self) -> Option<u64> {
        self.order.as_ref().and_then(|o| o.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[portfolio]
name = "personal"

[source]
type = "api"
endpoint = "http://localhost:8080"
timeout_seconds = 3

[source.headers]
Accept = "application/json"

[order]
sections = ["proyectos", "experiencias"]
seed = 11

[load]
output_path = "./out"
output_formats = ["json", "csv"]

[load.compression]
enabled = true

[error_handling]
on_fetch_failure = "abort"
"#;

    #[test]
    fn test_parse_sample() {
        let config = TomlConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.sections(),
            vec![Section::Experience, Section::Projects]
        );
        assert_eq!(config.shuffle_seed(), Some(11));
        assert_eq!(config.timeout_seconds(), 3);
        assert_eq!(config.on_fetch_failure(), FetchFailurePolicy::Abort);
        assert_eq!(
            config.output_options(),
            OutputOptions {
                csv: true,
                zip: true
            }
        );
        assert_eq!(config.concurrent_requests(), 4);
        assert!(!config.is_monitoring_enabled());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("PORTFOLIO_ORDER_TEST_BASE", "https://api.example.com");
        let content = SAMPLE.replace(
            "http://localhost:8080",
            "${PORTFOLIO_ORDER_TEST_BASE}",
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.api_endpoint(), "https://api.example.com");
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let content = SAMPLE.replace("http://localhost:8080", "${PORTFOLIO_ORDER_UNSET_VAR}");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.api_endpoint(), "${PORTFOLIO_ORDER_UNSET_VAR}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_source_requires_directory() {
        let content = SAMPLE.replace("type = \"api\"", "type = \"file\"");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(OrderError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_bad_section_and_policy() {
        let content = SAMPLE.replace("\"experiencias\"", "\"blog\"");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());

        let content = SAMPLE.replace("\"abort\"", "\"retry\"");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(TomlConfig::from_toml_str("[portfolio\nname=").is_err());
    }
}
