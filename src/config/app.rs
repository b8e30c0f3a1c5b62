use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use config::{
    builder::{ConfigBuilder as Builder, DefaultState},
    Config as ConfigBuilder, ConfigError, Environment, File, FileFormat,
};

use super::{DriverConfig, HttpConfig, LoggingConfig, ProbeConfig, StorageConfig, StressConfig};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identifier of this service instance, reported next to the outbound IP
    #[serde(default = "default_instance")]
    pub instance: String,

    /// HTTP API configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Outbound probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Bounded test run configuration
    #[serde(default)]
    pub driver: DriverConfig,

    /// Stress loop configuration
    #[serde(default)]
    pub stress: StressConfig,

    /// Result files
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_instance() -> String {
    "local".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            http: HttpConfig::default(),
            probe: ProbeConfig::default(),
            driver: DriverConfig::default(),
            stress: StressConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn duration_value(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

impl Config {
    /// Default configuration directory
    pub const CONFIG_DIR: &'static str = "config";

    /// Environment variable prefix
    const ENV_PREFIX: &'static str = "ROTATION_PROBE";

    /// Port variable set by the hosting platform
    const PORT_VAR: &'static str = "PORT";

    /// Instance identifier set by the hosting platform
    const INSTANCE_VAR: &'static str = "DYNO";

    /// Build configuration using the following priority (highest to lowest):
    /// 1. Platform variables (PORT, DYNO)
    /// 2. Environment variables (ROTATION_PROBE_*)
    /// 3. Local configuration file (config/local.yaml)
    /// 4. Environment specific file (config/{env}.yaml)
    /// 5. Default configuration (config/default.yaml)
    /// 6. Built-in defaults
    pub fn new() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Self::with_defaults(ConfigBuilder::builder())?
            // Load default config file
            .add_source(
                File::new(&format!("{}/default", Self::CONFIG_DIR), FileFormat::Yaml)
                    .required(false),
            )
            // Load environment specific config
            .add_source(
                File::new(
                    &format!("{}/{}", Self::CONFIG_DIR, environment),
                    FileFormat::Yaml,
                )
                .required(false),
            )
            // Load local overrides
            .add_source(
                File::new(&format!("{}/local", Self::CONFIG_DIR), FileFormat::Yaml).required(false),
            )
            .add_source(Self::environment());

        let config = Self::with_platform_overrides(builder)?
            .build()?
            .try_deserialize()?;
        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let builder = Self::with_defaults(ConfigBuilder::builder())?
            // Load the specified config file
            .add_source(File::from(path))
            // Add env vars as overrides
            .add_source(Self::environment());

        let config = Self::with_platform_overrides(builder)?
            .build()?
            .try_deserialize()?;
        Self::validate(&config)?;

        Ok(config)
    }

    fn environment() -> Environment {
        Environment::with_prefix(Self::ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn with_defaults(
        builder: Builder<DefaultState>,
    ) -> Result<Builder<DefaultState>, ConfigError> {
        let defaults = Config::default();

        builder
            .set_default("instance", defaults.instance)?
            // HTTP configuration
            .set_default("http.bind_addr", defaults.http.bind_addr)?
            .set_default("http.bind_port", defaults.http.bind_port)?
            // Probe configuration
            .set_default("probe.target_url", defaults.probe.target_url)?
            .set_default("probe.timeout", duration_value(defaults.probe.timeout))?
            .set_default("probe.user_agents", defaults.probe.user_agents)?
            .set_default("probe.accept", defaults.probe.accept)?
            .set_default("probe.accept_language", defaults.probe.accept_language)?
            .set_default("probe.ip_lookup_url", defaults.probe.ip_lookup_url)?
            .set_default(
                "probe.ip_lookup_timeout",
                duration_value(defaults.probe.ip_lookup_timeout),
            )?
            // Driver configuration
            .set_default("driver.query", defaults.driver.query)?
            .set_default("driver.max_requests", defaults.driver.max_requests)?
            .set_default("driver.delay", duration_value(defaults.driver.delay))?
            // Stress configuration
            .set_default("stress.label", defaults.stress.label)?
            .set_default("stress.delay", duration_value(defaults.stress.delay))?
            .set_default(
                "stress.max_duration",
                duration_value(defaults.stress.max_duration),
            )?
            // Storage configuration
            .set_default(
                "storage.log_file",
                defaults.storage.log_file.display().to_string(),
            )?
            .set_default(
                "storage.results_file",
                defaults.storage.results_file.display().to_string(),
            )?
            .set_default(
                "storage.crash_report_file",
                defaults.storage.crash_report_file.display().to_string(),
            )?
            // Logging configuration
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .set_default(
                "logging.include_location",
                defaults.logging.include_location,
            )?
            .set_default("logging.thread_ids", defaults.logging.thread_ids)?
            .set_default("logging.thread_names", defaults.logging.thread_names)
    }

    fn with_platform_overrides(
        builder: Builder<DefaultState>,
    ) -> Result<Builder<DefaultState>, ConfigError> {
        builder
            .set_override_option("http.bind_port", std::env::var(Self::PORT_VAR).ok())?
            .set_override_option("instance", std::env::var(Self::INSTANCE_VAR).ok())
    }

    /// Validate configuration
    pub fn validate(config: &Self) -> Result<(), ConfigError> {
        // Helper to convert validation errors
        fn validation_error(msg: &str) -> ConfigError {
            ConfigError::Message(msg.to_string())
        }

        // Validate HTTP configuration
        if config.http.bind_addr.is_empty() {
            return Err(validation_error("HTTP bind address must not be empty"));
        }
        if config.http.bind_port == 0 {
            return Err(validation_error("HTTP port must be non-zero"));
        }

        // Validate probe configuration
        if config.probe.target_url.is_empty() {
            return Err(validation_error("Probe target URL must not be empty"));
        }
        if config.probe.ip_lookup_url.is_empty() {
            return Err(validation_error("IP lookup URL must not be empty"));
        }
        if config.probe.user_agents.is_empty() {
            return Err(validation_error("At least one user agent is required"));
        }
        if config.probe.timeout.is_zero() {
            return Err(validation_error("Probe timeout must be non-zero"));
        }
        if config.probe.ip_lookup_timeout.is_zero() {
            return Err(validation_error("IP lookup timeout must be non-zero"));
        }

        // Validate run configuration
        if config.driver.max_requests == 0 {
            return Err(validation_error("Driver max_requests must be non-zero"));
        }
        if config.stress.delay.is_zero() {
            return Err(validation_error("Stress delay must be non-zero"));
        }
        if config.stress.max_duration.is_zero() {
            return Err(validation_error("Stress max_duration must be non-zero"));
        }

        // Validate storage configuration
        let storage = &config.storage;
        for path in [
            &storage.log_file,
            &storage.results_file,
            &storage.crash_report_file,
        ] {
            if path.as_os_str().is_empty() {
                return Err(validation_error("Storage paths must not be empty"));
            }
        }

        config
            .logging
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn test_default_config() {
        std::env::remove_var("PORT");
        std::env::remove_var("DYNO");
        let config = Config::new().unwrap();
        assert_eq!(config.http.bind_port, 3000);
        assert_eq!(config.http.bind_addr, "0.0.0.0");
        assert_eq!(config.instance, "local");
        assert_eq!(config.stress.max_duration, Duration::from_secs(600));
        assert_eq!(config.probe.timeout, Duration::from_secs(10));
        assert_eq!(config.probe.user_agents.len(), 3);
    }

    #[test]
    #[serial]
    fn test_platform_overrides() {
        std::env::set_var("PORT", "8080");
        std::env::set_var("DYNO", "web.1");
        let config = Config::new();
        std::env::remove_var("PORT");
        std::env::remove_var("DYNO");

        let config = config.unwrap();
        assert_eq!(config.http.bind_port, 8080);
        assert_eq!(config.instance, "web.1");
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("ROTATION_PROBE_STRESS__DELAY", "2s");
        std::env::set_var("ROTATION_PROBE_DRIVER__MAX_REQUESTS", "5");
        let config = Config::new();
        std::env::remove_var("ROTATION_PROBE_STRESS__DELAY");
        std::env::remove_var("ROTATION_PROBE_DRIVER__MAX_REQUESTS");

        let config = config.unwrap();
        assert_eq!(config.stress.delay, Duration::from_secs(2));
        assert_eq!(config.driver.max_requests, 5);
    }

    #[test]
    #[serial]
    fn test_file_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");

        fs::write(
            &config_path,
            r#"
            http:
              bind_port: 9000
              bind_addr: "127.0.0.1"
            stress:
              delay: 250ms
              max_duration: 1m
            "#,
        )
        .unwrap();

        let config = Config::from_file(config_path).unwrap();
        assert_eq!(config.http.bind_port, 9000);
        assert_eq!(config.http.bind_addr, "127.0.0.1");
        assert_eq!(config.stress.delay, Duration::from_millis(250));
        assert_eq!(config.stress.max_duration, Duration::from_secs(60));
        assert_eq!(config.stress.label, "stress test");
    }

    #[test]
    #[serial]
    fn test_validation() {
        std::env::set_var("ROTATION_PROBE_DRIVER__MAX_REQUESTS", "0");
        let result = Config::new();
        std::env::remove_var("ROTATION_PROBE_DRIVER__MAX_REQUESTS");
        assert!(result.is_err());

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(Config::validate(&config).is_err());

        let mut config = Config::default();
        config.probe.user_agents.clear();
        assert!(Config::validate(&config).is_err());

        assert!(Config::validate(&Config::default()).is_ok());
    }
}
