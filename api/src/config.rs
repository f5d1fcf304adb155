use std::{env, net::SocketAddr, ops::RangeInclusive, path::PathBuf, str::FromStr};

use thiserror::Error;

const DEV_JWT_SECRET: &str = "DEV_JWT_SECRET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    /// Reads the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            _ => return Err(ConfigError::MissingJwtSecret),
        };

        Ok(Self {
            database_url: var_or("DATABASE_URL", "sqlite://medicalvance.db?mode=rwc"),
            bind_addr: parse_var("BIND_ADDR", "0.0.0.0:3001")?,
            jwt_secret,
            token_ttl_days: parse_in_range("TOKEN_TTL_DAYS", "7", 1..=365)?,
            upload_dir: PathBuf::from(var_or("UPLOAD_DIR", "uploads")),
            max_upload_bytes: parse_in_range("MAX_UPLOAD_BYTES", "10485760", 1..=1 << 30)?,
            admin_email: var_or("ADMIN_EMAIL", "admin@medicalvance.com"),
            admin_password: var_or("ADMIN_PASSWORD", "admin123"),
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(name, default);
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_in_range<T>(
    name: &'static str,
    default: &str,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd,
{
    let parsed: T = parse_var(name, default)?;
    if range.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: var_or(name, default),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_to_default() {
        let ttl: i64 = parse_var("MEDICALVANCE_TEST_UNSET_TTL", "7").unwrap();
        assert_eq!(ttl, 7);
    }

    #[test]
    fn parse_var_rejects_garbage() {
        env::set_var("MEDICALVANCE_TEST_BAD_LIMIT", "ten megabytes");
        let result: Result<usize, _> = parse_var("MEDICALVANCE_TEST_BAD_LIMIT", "1");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "MEDICALVANCE_TEST_BAD_LIMIT", .. })
        ));
    }

    #[test]
    fn out_of_range_values_are_invalid() {
        env::set_var("MEDICALVANCE_TEST_HUGE_TTL", "100000000000000");
        let result: Result<i64, _> = parse_in_range("MEDICALVANCE_TEST_HUGE_TTL", "7", 1..=365);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "MEDICALVANCE_TEST_HUGE_TTL", .. })
        ));

        env::set_var("MEDICALVANCE_TEST_ZERO_TTL", "0");
        let result: Result<i64, _> = parse_in_range("MEDICALVANCE_TEST_ZERO_TTL", "7", 1..=365);
        assert!(result.is_err());

        let ttl: i64 = parse_in_range("MEDICALVANCE_TEST_UNSET_RANGED", "30", 1..=365).unwrap();
        assert_eq!(ttl, 30);
    }
}
