use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use jsonwebtoken::Algorithm;

use bazaar_api::AuthConfig;
use bazaar_api::config::is_hmac;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "JWT_SECRET",
];

pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub auth: AuthConfig,
    pub admin: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("BAZAAR_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("BAZAAR_JWT_SECRET is unset or still a placeholder");
        }

        let algorithm = match get("BAZAAR_JWT_ALGORITHM") {
            Some(name) => Algorithm::from_str(&name)
                .ok()
                .filter(|alg| is_hmac(*alg))
                .with_context(|| format!("BAZAAR_JWT_ALGORITHM must be HS256, HS384 or HS512, got {name}"))?,
            None => Algorithm::HS256,
        };

        let ttl_minutes: i64 = match get("BAZAAR_TOKEN_TTL_MINUTES") {
            Some(v) => v.parse().context("BAZAAR_TOKEN_TTL_MINUTES must be an integer")?,
            None => AuthConfig::DEFAULT_TOKEN_TTL_MINUTES,
        };
        if ttl_minutes <= 0 {
            bail!("BAZAAR_TOKEN_TTL_MINUTES must be positive");
        }

        let host = get("BAZAAR_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("BAZAAR_PORT")
            .unwrap_or_else(|| "8000".into())
            .parse()
            .context("BAZAAR_PORT must be a port number")?;
        let db_path: PathBuf = get("BAZAAR_DB_PATH").unwrap_or_else(|| "bazaar.db".into()).into();

        let admin = match (
            get("BAZAAR_ADMIN_USERNAME"),
            get("BAZAAR_ADMIN_EMAIL"),
            get("BAZAAR_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminSeed { username, email, password }),
            (None, None, None) => None,
            _ => bail!("BAZAAR_ADMIN_USERNAME, BAZAAR_ADMIN_EMAIL and BAZAAR_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            host,
            port,
            db_path,
            auth: AuthConfig::new(jwt_secret)
                .with_algorithm(algorithm)
                .with_token_ttl(chrono::Duration::minutes(ttl_minutes)),
            admin,
        })
    }
}
