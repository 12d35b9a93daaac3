//! Startup checks on top of `Config::validate`

use anyhow::Result;
use crm_core::Config;

/// Reject configuration the router cannot be built from.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    // Nesting at the root would shadow every API route.
    if config.static_url_path == "/" || config.static_url_path.ends_with('/') {
        return Err(anyhow::anyhow!(
            "STATIC_URL_PATH must be a non-root path without a trailing slash, got '{}'",
            config.static_url_path
        ));
    }

    if config.db_timeout_seconds == 0 {
        return Err(anyhow::anyhow!("DB_TIMEOUT_SECONDS cannot be 0"));
    }

    if config.email_timeout_seconds == 0 {
        tracing::warn!("EMAIL_TIMEOUT_SECONDS is 0 - outbound email requests will fail immediately");
    }

    if config.is_production() && config.sendgrid_api_url.starts_with("http://") {
        tracing::warn!(
            api_url = %config.sendgrid_api_url,
            "SENDGRID_API_URL is not HTTPS in production"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> Config {
        Config {
            server_port: 3000,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            database_url: "postgresql://localhost/crm".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 5,
            data_dir: PathBuf::from("/tmp/crm"),
            static_dir: PathBuf::from("/tmp/crm/static"),
            static_url_path: "/static".to_string(),
            attachments_dir: PathBuf::from("/tmp/crm/static/uploads/attachments"),
            sendgrid_api_key: "SG.test".to_string(),
            sendgrid_api_url: "https://api.sendgrid.com/v3/mail/send".to_string(),
            support_email: "support@example.com".to_string(),
            email_timeout_seconds: 30,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&config()).is_ok());
    }

    #[test]
    fn test_root_static_path_is_rejected() {
        let mut config = config();
        config.static_url_path = "/".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let mut config = config();
        config.environment = "production".to_string();
        assert!(validate_config(&config).is_err());
    }
}
