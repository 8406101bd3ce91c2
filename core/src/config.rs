use chrono::NaiveDate;
use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub page_limit: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Lower bound for the first incremental run, before any bookmark exists.
    pub start_date: NaiveDate,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub alert_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        // Load default configuration
        builder = builder.add_source(config::Config::try_from(&Config::default())?);

        // Layer on config file if it exists
        if Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        // Layer on environment variables (EXTRACTOR_ prefix)
        builder = builder.add_source(
            Environment::with_prefix("EXTRACTOR")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let settings: Config = config.try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.token.is_empty() {
            return Err(ConfigError::Message("api.token is required".into()));
        }

        if self.api.base_url.is_empty() {
            return Err(ConfigError::Message("api.base_url is required".into()));
        }

        if self.api.page_limit == 0 {
            return Err(ConfigError::Message(
                "api.page_limit must be greater than 0".into(),
            ));
        }

        if self.sync.alert_concurrency == 0 {
            return Err(ConfigError::Message(
                "sync.alert_concurrency must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://api.pagerduty.com/".to_string(),
                token: String::new(), // Must come from config.toml or env
                page_limit: 100,
            },
            sync: SyncConfig {
                start_date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
                max_retries: 3,
                retry_base_delay_ms: 1000,
                alert_concurrency: 4,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
                log_format: LogFormat::Pretty,
                metrics_enabled: false,
                metrics_port: 9090,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.api.token = "secret".into();
        config
    }

    #[test]
    fn default_config_fails_validation_without_token() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn token_is_enough_to_pass_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn zero_page_limit_is_rejected() {
        let mut config = valid_config();
        config.api.page_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_alert_concurrency_is_rejected() {
        let mut config = valid_config();
        config.sync.alert_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
