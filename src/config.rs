use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub base_url: String,
    pub host: String,
    pub port: u16,

    // PIX payment gateway
    pub pix_api_url: String,
    pub pix_access_token: Secret<String>,

    // Bearer tokens (separate secrets for user and admin scopes)
    pub user_token_secret: Secret<String>,
    pub admin_token_secret: Secret<String>,
    pub user_token_ttl_hours: i64,
    pub admin_token_ttl_hours: i64,

    // Security
    pub session_secret: Secret<String>,

    // Ad image uploads
    pub upload_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            base_url: config.get("base_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            pix_api_url: config.get("pix_api_url")?,
            pix_access_token: Secret::new(config.get("pix_access_token")?),

            user_token_secret: Secret::new(config.get("user_token_secret")?),
            admin_token_secret: Secret::new(config.get("admin_token_secret")?),
            user_token_ttl_hours: config.get("user_token_ttl_hours").unwrap_or(24),
            admin_token_ttl_hours: config.get("admin_token_ttl_hours").unwrap_or(8),

            session_secret: Secret::new(config.get("session_secret")?),

            upload_dir: config
                .get("upload_dir")
                .unwrap_or_else(|_| "uploads".to_string()),
        })
    }
}
