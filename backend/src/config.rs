use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    /// Age after which a pending OTP code is no longer accepted.
    pub otp_ttl_seconds: i64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost:5432/bookshelf".to_string());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());
        if jwt_secret.trim().is_empty() {
            return Err(anyhow!("JWT_SECRET must not be empty"));
        }

        let jwt_expiration_hours = env::var("JWT_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);

        let otp_ttl_seconds = parse_otp_ttl(env::var("OTP_TTL_SECONDS").ok().as_deref());

        Ok(Config {
            database_url,
            database_max_connections,
            jwt_secret,
            jwt_expiration_hours,
            otp_ttl_seconds,
        })
    }

    /// Lifetime of an access token in seconds, as reported to clients.
    pub fn jwt_expiration_seconds(&self) -> u64 {
        self.jwt_expiration_hours * 3600
    }
}

/// One day.
pub const DEFAULT_OTP_TTL_SECONDS: i64 = 86_400;
/// One week.
pub const MAX_OTP_TTL_SECONDS: i64 = 7 * 86_400;

/// Reads an OTP lifetime in seconds. Missing, malformed or out-of-range
/// values (outside `1..=MAX_OTP_TTL_SECONDS`) fall back to the default.
pub fn parse_otp_ttl(value: Option<&str>) -> i64 {
    value
        .and_then(|value| value.trim().parse().ok())
        .filter(|seconds: &i64| (1..=MAX_OTP_TTL_SECONDS).contains(seconds))
        .unwrap_or(DEFAULT_OTP_TTL_SECONDS)
}

/// Masks a secret for log output, keeping a short prefix and the length.
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}
