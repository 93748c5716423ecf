use std::net::SocketAddr;

use anyhow::Context;
use jsonwebtoken::Algorithm;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Base URL used when building links that go out in emails.
    pub public_base_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub storage: StorageConfig,
    pub cache_ttl_seconds: u64,
    pub contact_create_per_minute: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let algorithm = parse_algorithm(&env_or("ALGORITHM", "HS256"))?;
        let jwt = JwtConfig {
            secret: std::env::var("SECRET_KEY").context("SECRET_KEY is not set")?,
            algorithm,
            ttl_minutes: env_parse("ACCESS_TOKEN_EXPIRE_MINUTES", 60)?,
        };

        let smtp = SmtpConfig {
            host: env_or("SMTP_HOST", "localhost"),
            port: env_parse("SMTP_PORT", 1025)?,
            username: non_empty_env("SMTP_USER"),
            password: non_empty_env("SMTP_PASSWORD"),
            from: env_or("FROM_EMAIL", "no-reply@example.com"),
        };

        let endpoint = std::env::var("S3_ENDPOINT").context("S3_ENDPOINT is not set")?;
        let bucket = std::env::var("S3_BUCKET").context("S3_BUCKET is not set")?;
        let public_url = non_empty_env("S3_PUBLIC_URL")
            .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let storage = StorageConfig {
            access_key: std::env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY is not set")?,
            secret_key: std::env::var("S3_SECRET_KEY").context("S3_SECRET_KEY is not set")?,
            region: env_or("S3_REGION", "us-east-1"),
            endpoint,
            bucket,
            public_url,
        };

        let bind_addr =
            parse_bind_addr(&env_or("APP_HOST", "0.0.0.0"), &env_or("APP_PORT", "8080"))?;

        Ok(Self {
            bind_addr,
            database_url,
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:8080"),
            jwt,
            smtp,
            storage,
            cache_ttl_seconds: env_parse("CACHE_TTL_SECONDS", 3600)?,
            contact_create_per_minute: env_parse("RATE_LIMIT_PER_MINUTE", 5)?,
        })
    }
}

/// Tokens are signed with a shared secret, so only the HMAC family is accepted.
fn parse_algorithm(raw: &str) -> anyhow::Result<Algorithm> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => anyhow::bail!("unsupported ALGORITHM {other}; expected HS256, HS384 or HS512"),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bind_addr(host: &str, port: &str) -> anyhow::Result<SocketAddr> {
    format!("{host}:{port}")
        .parse()
        .with_context(|| format!("APP_HOST/APP_PORT do not form an address: {host}:{port}"))
}

/// Unset falls back to `default`; a set but unparsable value is an error.
fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value {v:?}")),
    }
}
