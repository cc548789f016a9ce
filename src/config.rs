use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::sync::Arc;

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug)]
pub struct ConfigYaml {
    pub node_name: String,
    pub environment: String,
    pub port: u16,
    pub default_ticker: Option<String>,
    pub data_range: Option<String>,
    pub provider_rate_limit_per_minute: Option<u32>,
    pub random_agent: Option<bool>,
}

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub node_name: String,
    pub environment: String,
    pub port: u16,
    pub default_ticker: String,
    pub data_range: String,
    pub provider_rate_limit_per_minute: u32,
    pub random_agent: bool,
}

pub type SharedSettings = Arc<AppConfig>;

impl AppConfig {
    // Load configuration from YAML file or environment variables
    pub fn load() -> Self {
        // Check for CONFIG_FILE environment variable first
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Self::from_env()
        }
    }

    // Load configuration from YAML file
    pub fn from_yaml(file_path: &str) -> Self {
        let yaml_content = fs::read_to_string(file_path)
            .unwrap_or_else(|e| panic!("Failed to read config file {}: {}", file_path, e));

        let yaml_config: ConfigYaml = serde_yaml::from_str(&yaml_content)
            .unwrap_or_else(|e| panic!("Failed to parse YAML config: {}", e));

        Self {
            node_name: yaml_config.node_name,
            environment: yaml_config.environment,
            port: yaml_config.port,
            default_ticker: yaml_config
                .default_ticker
                .unwrap_or_else(|| "AAPL".to_string())
                .to_uppercase(),
            data_range: yaml_config.data_range.unwrap_or_else(|| "6mo".to_string()),
            provider_rate_limit_per_minute: yaml_config.provider_rate_limit_per_minute.unwrap_or(30),
            random_agent: yaml_config.random_agent.unwrap_or(true),
        }
    }

    // Load all configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        let node_name = env::var("NODE_NAME")
            .unwrap_or_else(|_| "tickerlens".to_string());

        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8888); // Default to 8888

        let default_ticker = env::var("DEFAULT_TICKER")
            .unwrap_or_else(|_| "AAPL".to_string())
            .to_uppercase();

        let data_range = env::var("DATA_RANGE")
            .unwrap_or_else(|_| "6mo".to_string());

        let provider_rate_limit_per_minute = env::var("PROVIDER_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let random_agent = env::var("RANDOM_AGENT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        Self {
            node_name,
            environment,
            port,
            default_ticker,
            data_range,
            provider_rate_limit_per_minute,
            random_agent,
        }
    }
}
