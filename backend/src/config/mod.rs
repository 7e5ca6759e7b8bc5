//! Central module for application-wide configuration settings.
//!
//! This module handles loading configuration parameters such as the database
//! URL, server port, token secrets and lifetimes, and refresh cookie
//! attributes from the environment (optionally seeded from a `.env` file).

use anyhow::{Context, Result, bail};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub server_port: u16,
    pub request_timeout_seconds: u64,
    pub bcrypt_cost: u32,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub cors_allow_origins: Vec<String>,
}

/// Token signing secrets and lifetimes.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_expire_minutes: i64,
    pub refresh_expire_days: i64,
}

/// Attributes of the refresh token cookie.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            _ => Err(format!("Invalid SameSite value: {}", s)),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5u32)?;
        let acquire_timeout_seconds = parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECONDS", 3u64)?;
        let server_port = parse_or(&lookup, "SERVER_PORT", 3000u16)?;
        let request_timeout_seconds = parse_or(&lookup, "REQUEST_TIMEOUT_SECONDS", 30u64)?;

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31");
        }

        let jwt = JwtConfig {
            access_secret: required_secret(&lookup, "JWT_ACCESS_SECRET")?,
            refresh_secret: required_secret(&lookup, "JWT_REFRESH_SECRET")?,
            access_expire_minutes: parse_or(&lookup, "JWT_ACCESS_EXPIRE_MIN", 30i64)?,
            refresh_expire_days: parse_or(&lookup, "JWT_REFRESH_EXPIRE_DAY", 14i64)?,
        };
        if jwt.access_secret == jwt.refresh_secret {
            bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }
        if jwt.access_expire_minutes <= 0 || jwt.refresh_expire_days <= 0 {
            bail!("JWT_ACCESS_EXPIRE_MIN and JWT_REFRESH_EXPIRE_DAY must be positive");
        }

        let same_site = lookup("COOKIE_SAME_SITE")
            .unwrap_or_else(|| "Lax".to_string())
            .parse::<SameSite>()
            .map_err(anyhow::Error::msg)
            .context("COOKIE_SAME_SITE must be Strict, Lax or None")?;

        let cookie = CookieConfig {
            name: lookup("COOKIE_NAME").unwrap_or_else(|| "refresh_token".to_string()),
            path: lookup("COOKIE_PATH").unwrap_or_else(|| "/".to_string()),
            http_only: parse_or(&lookup, "COOKIE_HTTP_ONLY", true)?,
            secure: parse_or(&lookup, "COOKIE_SECURE", true)?,
            same_site,
            max_age_days: parse_or(&lookup, "COOKIE_MAX_AGE_DAYS", 14i64)?,
        };

        let cors_allow_origins = lookup("CORS_ALLOW_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            server_port,
            request_timeout_seconds,
            bcrypt_cost,
            jwt,
            cookie,
            cors_allow_origins,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value", key)),
        None => Ok(default),
    }
}

fn required_secret<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ => bail!("{} not set", key),
    }
}
