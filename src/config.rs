use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SwutrackConfig {
    /// Network port the HTTP API listens on. Must not be empty.
    #[serde(default = "default_port")]
    pub port: String,

    /// How long services get to stop gracefully before the process is
    /// terminated (e.g. "10s", "500ms")
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub shutdown_timeout: Duration,
}

impl SwutrackConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("swutrack.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("port", default_port())?
            .set_default(
                "shutdown_timeout",
                humantime::format_duration(default_shutdown_timeout()).to_string(),
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // SWUTRACK_PORT, SWUTRACK_SHUTDOWN_TIMEOUT
            .add_source(Environment::with_prefix("SWUTRACK").prefix_separator("_"))
            .build()?;

        let config: SwutrackConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::Message("Port cannot be empty".to_string()));
        }

        if self.shutdown_timeout.is_zero() {
            return Err(ConfigError::Message(
                "Shutdown timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render as TOML, as printed by `--print-config`
    pub fn to_toml_string(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for SwutrackConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

fn default_port() -> String {
    "8080".to_string()
}
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Accepts humantime strings ("10s", "1m 30s") or a bare number of seconds
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        // Environment variables always arrive as strings
        Raw::Text(text) => match text.trim().parse::<u64>() {
            Ok(secs) => Ok(Duration::from_secs(secs)),
            Err(_) => humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom),
        },
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    // Loading reads process-wide SWUTRACK_* variables
    static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = SwutrackConfig::default();
        assert_eq!(config.port, "8080");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SwutrackConfig {
            port: String::new(),
            shutdown_timeout: Duration::from_secs(5),
        };

        // Should fail validation due to empty port
        assert!(config.validate().is_err());

        config.port = "9000".to_string();
        assert!(config.validate().is_ok());

        config.shutdown_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let _guard = ENV_LOCK.lock();
        let file = write_config("port = \"9090\"\nshutdown_timeout = \"2s 500ms\"\n");

        let config = SwutrackConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.port, "9090");
        assert_eq!(config.shutdown_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_load_numeric_timeout() {
        let _guard = ENV_LOCK.lock();
        let file = write_config("shutdown_timeout = 3\n");

        let config = SwutrackConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.port, "8080");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let _guard = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let config = SwutrackConfig::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, SwutrackConfig::default());
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let _guard = ENV_LOCK.lock();
        let file = write_config("shutdown_timeout = \"soon\"\n");
        assert!(SwutrackConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_print_round_trip() {
        let rendered = SwutrackConfig::default().to_toml_string().unwrap();
        assert!(rendered.contains("shutdown_timeout = \"10s\""));

        let parsed: SwutrackConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, SwutrackConfig::default());
    }

    #[test]
    fn test_environment_variable_override() {
        let _guard = ENV_LOCK.lock();
        env::set_var("SWUTRACK_PORT", "7000");
        env::set_var("SWUTRACK_SHUTDOWN_TIMEOUT", "750ms");

        let dir = tempfile::tempdir().unwrap();
        let loaded = SwutrackConfig::load_from_file(dir.path().join("absent.toml"));

        // Clean up
        env::remove_var("SWUTRACK_PORT");
        env::remove_var("SWUTRACK_SHUTDOWN_TIMEOUT");

        let config = loaded.unwrap();
        assert_eq!(config.port, "7000");
        assert_eq!(config.shutdown_timeout, Duration::from_millis(750));
    }
}
