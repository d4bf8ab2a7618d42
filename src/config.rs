use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DietConfig {
    /// Attempts for one save before a version conflict is surfaced.
    pub merge_retries: u32,
}

impl Default for DietConfig {
    fn default() -> Self {
        Self { merge_retries: 3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub diet: DietConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 10);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "dietlog".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "dietlog-users".into()),
        };
        let diet = DietConfig {
            merge_retries: parse_or("DIET_MERGE_RETRIES", DietConfig::default().merge_retries)
                .max(1),
        };
        Ok(Self {
            database_url,
            db_max_connections,
            jwt,
            diet,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
