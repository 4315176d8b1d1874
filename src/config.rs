use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the report review service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReviewConfig {
    /// Database settings
    pub database: DatabaseConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Derived-data cache settings
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://report-review.db".to_string(),
            max_connections: 10,
            auto_migrate: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum cached aggregates
    pub max_capacity: u64,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 10_000,
            ttl_seconds: 3600, // 1 hour
        }
    }
}

impl ReviewConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (report-review.toml, .report-review-rc)
    /// 3. Environment variables (prefixed with REPORT_REVIEW_, nested with __)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&ReviewConfig::default())?);

        if Path::new("report-review.toml").exists() {
            builder = builder.add_source(File::with_name("report-review"));
        }

        if Path::new(".report-review-rc").exists() {
            builder = builder.add_source(File::with_name(".report-review-rc").format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("REPORT_REVIEW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ReviewConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = ReviewConfig::load_env_file();
        ReviewConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ReviewConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let defaults = ReviewConfig::default();
        let text = toml::to_string_pretty(&defaults).unwrap();
        let parsed: ReviewConfig = toml::from_str(&text).unwrap();

        assert_eq!(parsed.database.url, "sqlite://report-review.db");
        assert_eq!(parsed.cache.ttl_seconds, 3600);
        assert!(parsed.observability.json_logs);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config = Config::builder()
            .add_source(Config::try_from(&ReviewConfig::default()).unwrap())
            .add_source(config::File::from_str(
                "[database]\nurl = \"sqlite::memory:\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let loaded: ReviewConfig = config.try_deserialize().unwrap();

        assert_eq!(loaded.database.url, "sqlite::memory:");
        assert_eq!(loaded.database.max_connections, 10);
        assert!(loaded.cache.enabled);
    }
}
