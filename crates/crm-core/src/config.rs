//! Configuration module
//!
//! Loads the CRM configuration from environment variables (with `.env` support).
//! Required variables are collected and reported together so a misconfigured
//! deployment fails once with the complete list.

use std::env;
use std::path::PathBuf;

const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const EMAIL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STATIC_URL_PATH: &str = "/static";
const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    /// URL prefix the static directory is served under
    pub static_url_path: String,
    pub attachments_dir: PathBuf,
    pub sendgrid_api_key: String,
    pub sendgrid_api_url: String,
    pub support_email: String,
    pub email_timeout_seconds: u64,
}

fn required(name: &str, missing: &mut Vec<String>) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            missing.push(format!("MISSING ENVIRONMENT VARIABLE {}", name));
            String::new()
        }
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let mut missing = Vec::new();
        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("SQLALCHEMY_DATABASE_URI"))
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| {
                missing.push("MISSING ENVIRONMENT VARIABLE DATABASE_URL".to_string());
                String::new()
            });
        let data_dir = required("DATA_DIR", &mut missing);
        let sendgrid_api_key = required("SENDGRID_API_KEY", &mut missing);
        let support_email = required("SUPPORT_EMAIL", &mut missing);

        if !missing.is_empty() {
            return Err(anyhow::anyhow!(missing.join("; ")));
        }

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let data_dir = PathBuf::from(data_dir);
        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("static"));
        let attachments_dir = env::var("ATTACHMENTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| static_dir.join("uploads").join("attachments"));

        let config = Config {
            server_port: parse_or("PORT", SERVER_PORT),
            environment,
            cors_origins,
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: parse_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            data_dir,
            static_dir,
            static_url_path: env::var("STATIC_URL_PATH")
                .unwrap_or_else(|_| DEFAULT_STATIC_URL_PATH.to_string()),
            attachments_dir,
            sendgrid_api_key,
            sendgrid_api_url: env::var("SENDGRID_API_URL")
                .unwrap_or_else(|_| DEFAULT_SENDGRID_API_URL.to_string()),
            support_email,
            email_timeout_seconds: parse_or("EMAIL_TIMEOUT_SECONDS", EMAIL_TIMEOUT_SECS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let mut errors = Vec::new();

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            errors.push(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
                    .to_string(),
            );
        }
        if self.db_max_connections == 0 {
            errors.push("DB_MAX_CONNECTIONS cannot be 0".to_string());
        }
        if !self.static_url_path.starts_with('/') {
            errors.push(format!(
                "STATIC_URL_PATH must start with '/', got '{}'",
                self.static_url_path
            ));
        }
        if !self.support_email.contains('@') {
            errors.push(format!(
                "SUPPORT_EMAIL is not an email address: '{}'",
                self.support_email
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "DATABASE_URL",
        "SQLALCHEMY_DATABASE_URI",
        "DATA_DIR",
        "SENDGRID_API_KEY",
        "SUPPORT_EMAIL",
        "STATIC_DIR",
        "ATTACHMENTS_DIR",
        "STATIC_URL_PATH",
        "ENVIRONMENT",
        "ENV",
        "CORS_ORIGINS",
        "PORT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn set_required() {
        env::set_var("DATABASE_URL", "postgresql://localhost/crm");
        env::set_var("DATA_DIR", "/var/lib/crm");
        env::set_var("SENDGRID_API_KEY", "SG.test");
        env::set_var("SUPPORT_EMAIL", "support@example.com");
    }

    #[test]
    fn test_missing_required_vars_are_all_reported() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("DATABASE_URL", "postgresql://localhost/crm");

        let err = Config::from_env().unwrap_err().to_string();
        assert!(err.contains("DATA_DIR"));
        assert!(err.contains("SENDGRID_API_KEY"));
        assert!(err.contains("SUPPORT_EMAIL"));
        assert!(!err.contains("DATABASE_URL"));
    }

    #[test]
    fn test_directory_defaults_derive_from_data_dir() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();

        let config = Config::from_env().unwrap();
        assert_eq!(config.static_dir, PathBuf::from("/var/lib/crm/static"));
        assert_eq!(
            config.attachments_dir,
            PathBuf::from("/var/lib/crm/static/uploads/attachments")
        );
        assert_eq!(config.static_url_path, "/static");
        assert_eq!(config.server_port, 3000);
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_rejects_wildcard_cors() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();
        env::set_var("ENVIRONMENT", "production");

        let err = Config::from_env().unwrap_err().to_string();
        assert!(err.contains("CORS_ORIGINS"));
        clear_env();
    }
}
