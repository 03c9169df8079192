//! Environment-driven configuration. Every required variable missing at
//! startup is fatal rather than defaulted.

use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub db: String,
    pub sslmode: String,
}

impl PostgresConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.db, self.sslmode
        )
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
    pub ttl: Duration,
}

impl RedisConfig {
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(pw) => format!("redis://:{}@{}:{}/{}", pw, self.host, self.port, self.db),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeEndpoint {
    pub name: String,
    pub address: String,
}

/// Logging knobs.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub log_file: String,
    pub log_level: String,
    pub use_json: bool,
    pub rotation: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub postgres: PostgresConfig,
    pub redis: RedisConfig,
    pub exchanges: Vec<ExchangeEndpoint>,
    pub api_addr: String,
    pub aggregator_window: Duration,
    pub logging: LoggingConfig,
    pub app_env: String,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_port(name: &'static str, raw: &str) -> Result<u16, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: format!("{e}"),
    })
}

fn parse_duration_env(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: format!("{e}"),
    })
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let postgres = PostgresConfig {
            host: required("PG_HOST")?,
            port: parse_port("PG_PORT", &required("PG_PORT")?)?,
            user: required("PG_USER")?,
            password: required("PG_PASSWORD")?,
            db: required("PG_DB")?,
            sslmode: required("PG_SSLMODE")?,
        };

        let redis_ttl_raw = required("REDIS_TTL")?;
        let redis_db_raw = required("REDIS_DB")?;
        let redis = RedisConfig {
            host: required("REDIS_HOST")?,
            port: parse_port("REDIS_PORT", &required("REDIS_PORT")?)?,
            db: redis_db_raw.parse().map_err(|e| ConfigError::Invalid {
                name: "REDIS_DB",
                value: redis_db_raw.clone(),
                reason: format!("{e}"),
            })?,
            password: std::env::var("REDIS_PASSWORD").ok(),
            ttl: parse_duration_env("REDIS_TTL", &redis_ttl_raw)?,
        };

        let exchanges = vec![
            ExchangeEndpoint {
                name: "ex1".to_string(),
                address: required("EXCHANGE1_ADDR")?,
            },
            ExchangeEndpoint {
                name: "ex2".to_string(),
                address: required("EXCHANGE2_ADDR")?,
            },
            ExchangeEndpoint {
                name: "ex3".to_string(),
                address: required("EXCHANGE3_ADDR")?,
            },
        ];

        let api_addr = required("API_ADDR")?;
        let window_raw = required("AGGREGATOR_WINDOW")?;
        let aggregator_window = parse_duration_env("AGGREGATOR_WINDOW", &window_raw)?;

        let logging = LoggingConfig {
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_file: std::env::var("LOG_FILE").unwrap_or_else(|_| "marketflow.log".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            use_json: std::env::var("LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            rotation: std::env::var("LOG_ROTATION").unwrap_or_else(|_| "daily".to_string()),
        };

        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            postgres,
            redis,
            exchanges,
            api_addr,
            aggregator_window,
            logging,
            app_env,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_string_embeds_sslmode() {
        let cfg = PostgresConfig {
            host: "localhost".into(),
            port: 5432,
            user: "u".into(),
            password: "p".into(),
            db: "marketflow".into(),
            sslmode: "disable".into(),
        };
        assert!(cfg.connection_string().ends_with("sslmode=disable"));
    }

    #[test]
    fn redis_url_includes_password_when_set() {
        let cfg = RedisConfig {
            host: "localhost".into(),
            port: 6379,
            db: 0,
            password: Some("secret".into()),
            ttl: Duration::from_secs(30),
        };
        assert!(cfg.connection_url().contains(":secret@"));
    }
}
