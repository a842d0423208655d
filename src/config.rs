use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cors_allow_origin: String,

    pub secret_key: String,
    pub jwt_expires_in: String,
    pub enable_signup: bool,
    pub enable_api_key: bool,

    pub enable_metadata_fetch: bool,
    pub metadata_timeout_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env_or("PORT", "8080").parse()?;
        let metadata_timeout_secs = env_or("METADATA_TIMEOUT_SECS", "3").parse()?;

        let secret_key = env::var("LINKVAULT_SECRET_KEY").unwrap_or_else(|_| {
            tracing::warn!("LINKVAULT_SECRET_KEY not set, using an insecure default");
            "linkvault-insecure-dev-key".to_string()
        });

        Ok(Config {
            host: env_or("HOST", "0.0.0.0"),
            port,
            database_url: env_or("DATABASE_URL", "sqlite://linkvault.db"),
            cors_allow_origin: env_or("CORS_ALLOW_ORIGIN", "*"),
            secret_key,
            jwt_expires_in: env_or("JWT_EXPIRES_IN", "24h"),
            enable_signup: env_bool("ENABLE_SIGNUP", true),
            enable_api_key: env_bool("ENABLE_API_KEY", true),
            enable_metadata_fetch: env_bool("ENABLE_METADATA_FETCH", true),
            metadata_timeout_secs,
        })
    }
}
