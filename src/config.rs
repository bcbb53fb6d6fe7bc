use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub admin_token: String,
    /// Commission withheld at prize-pool formation, in [0, 1).
    pub commission_rate: Decimal,
    /// One-time referral commission on a first qualifying deposit, in [0, 1).
    pub referral_rate: Decimal,
    pub notify_webhook_url: Option<String>,
    pub leaderboard_limit: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let admin_token = env_map
            .get("ADMIN_TOKEN")
            .cloned()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("ADMIN_TOKEN".to_string()))?;

        let commission_rate = parse_rate_from_map(&env_map, "COMMISSION_RATE", "0.10")?;
        let referral_rate = parse_rate_from_map(&env_map, "REFERRAL_RATE", "0.05")?;

        let notify_webhook_url = env_map
            .get("NOTIFY_WEBHOOK_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let leaderboard_limit = env_map
            .get("LEADERBOARD_LIMIT")
            .map(|s| s.as_str())
            .unwrap_or("20")
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "LEADERBOARD_LIMIT".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            admin_token,
            commission_rate,
            referral_rate,
            notify_webhook_url,
            leaderboard_limit,
        })
    }
}

fn parse_rate_from_map(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    let rate = Decimal::from_str(raw).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("must be a decimal, got {}", raw))
    })?;

    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be in [0, 1), got {}", raw),
        ));
    }

    Ok(rate)
}
