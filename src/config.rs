// src/config.rs

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,

    /// Root directory for uploaded images, served back under `/uploads`.
    pub upload_dir: PathBuf,

    /// OpenWeather credentials. Empty key disables the weather endpoints.
    pub weather_api_key: String,
    pub weather_base_url: String,

    /// Optional admin account seeded at startup.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let weather_api_key = env::var("OPENWEATHER_API_KEY").unwrap_or_default();

        let weather_base_url = env::var("OPENWEATHER_BASE_URL")
            .unwrap_or_else(|_| "https://api.openweathermap.org/data/2.5/".to_string());

        let admin_email = env::var("ADMIN_EMAIL").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            upload_dir,
            weather_api_key,
            weather_base_url,
            admin_email,
            admin_password,
        }
    }
}
