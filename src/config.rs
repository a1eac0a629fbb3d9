// Service configuration read from environment variables (.env is loaded first by main)

use std::time::Duration;
use thiserror::Error;

use crate::accounts::RecordStoreSettings;
use crate::notify::{MailSecurity, MailSettings};

const DEFAULT_RECORD_STORE_URL: &str = "https://api.airtable.com/v0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub app_base_url: String,
    /// Remote record store; `None` keeps accounts in memory only
    pub record_store: Option<RecordStoreSettings>,
    /// SMTP server; `None` logs notifications to the console
    pub mail: Option<MailSettings>,
    pub seed_admin: Option<SeedAdmin>,
}

/// Bootstrap SuperAdmin credentials
#[derive(Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Unset and blank are treated the same
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let port = parse_or("PORT", get("PORT"), 8080u16)?;
        let jwt_expiry_hours = parse_or("JWT_EXPIRY_HOURS", get("JWT_EXPIRY_HOURS"), 24i64)?;
        if jwt_expiry_hours <= 0 || chrono::Duration::try_hours(jwt_expiry_hours).is_none() {
            return Err(ConfigError::Invalid {
                name: "JWT_EXPIRY_HOURS",
                value: jwt_expiry_hours.to_string(),
            });
        }

        let record_store = match (get("RECORD_STORE_API_KEY"), get("RECORD_STORE_BASE_ID")) {
            (Some(api_key), Some(base_id)) => {
                let timeout_ms = parse_or(
                    "RECORD_STORE_TIMEOUT_MS",
                    get("RECORD_STORE_TIMEOUT_MS"),
                    5000u64,
                )?;
                Some(RecordStoreSettings {
                    api_url: get("RECORD_STORE_URL")
                        .unwrap_or_else(|| DEFAULT_RECORD_STORE_URL.to_string()),
                    api_key,
                    base_id,
                    table: get("RECORD_STORE_USERS_TABLE").unwrap_or_else(|| "Users".to_string()),
                    timeout: Duration::from_millis(timeout_ms),
                })
            }
            _ => None,
        };

        let mail = match (get("MAIL_HOST"), get("MAIL_FROM")) {
            (Some(host), Some(from)) => {
                let port = parse_or("MAIL_PORT", get("MAIL_PORT"), 587u16)?;
                let security = match get("MAIL_SECURITY") {
                    Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                        name: "MAIL_SECURITY",
                        value,
                    })?,
                    None => MailSecurity::for_port(port),
                };
                Some(MailSettings {
                    host,
                    port,
                    username: get("MAIL_USERNAME"),
                    password: get("MAIL_PASSWORD"),
                    from,
                    from_name: get("MAIL_FROM_NAME"),
                    security,
                })
            }
            _ => None,
        };

        let seed_admin = match (get("SEED_ADMIN_EMAIL"), get("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
            _ => None,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            jwt_secret,
            jwt_expiry_hours,
            app_base_url: get("APP_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            record_store,
            mail,
            seed_admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Out-of-range hours give a zero lifetime, so issued tokens are already expired
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.jwt_expiry_hours).unwrap_or_else(chrono::Duration::zero)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name, value: v }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("JWT_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.jwt_expiry_hours, 24);
        assert_eq!(config.token_ttl(), chrono::Duration::hours(24));
        assert_eq!(config.app_base_url, "http://localhost:8080");
        assert!(config.record_store.is_none());
        assert!(config.mail.is_none());
        assert!(config.seed_admin.is_none());
    }

    #[test]
    fn test_jwt_secret_required() {
        assert_eq!(config_from(&[]).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
        assert_eq!(
            config_from(&[("JWT_SECRET", "   ")]).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = config_from(&[("JWT_SECRET", "s"), ("PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "PORT",
                value: "eighty".to_string()
            }
        );

        assert!(config_from(&[("JWT_SECRET", "s"), ("JWT_EXPIRY_HOURS", "1.5")]).is_err());
    }

    #[test]
    fn test_expiry_hours_must_be_positive_and_in_range() {
        for hours in ["0", "-3", "9223372036854775807"] {
            let err = config_from(&[("JWT_SECRET", "s"), ("JWT_EXPIRY_HOURS", hours)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { name: "JWT_EXPIRY_HOURS", .. }),
                "{} should be rejected",
                hours
            );
        }

        let config = config_from(&[("JWT_SECRET", "s"), ("JWT_EXPIRY_HOURS", "2")]).unwrap();
        assert_eq!(config.token_ttl(), chrono::Duration::hours(2));
    }

    #[test]
    fn test_token_ttl_never_panics() {
        let mut config = config_from(&[("JWT_SECRET", "s")]).unwrap();
        config.jwt_expiry_hours = i64::MAX;
        assert_eq!(config.token_ttl(), chrono::Duration::zero());
    }

    #[test]
    fn test_record_store_needs_key_and_base() {
        let only_key = config_from(&[("JWT_SECRET", "s"), ("RECORD_STORE_API_KEY", "k")]).unwrap();
        assert!(only_key.record_store.is_none());

        let config = config_from(&[
            ("JWT_SECRET", "s"),
            ("RECORD_STORE_API_KEY", "k"),
            ("RECORD_STORE_BASE_ID", "app123"),
            ("RECORD_STORE_TIMEOUT_MS", "250"),
        ])
        .unwrap();
        let store = config.record_store.unwrap();
        assert_eq!(store.api_url, "https://api.airtable.com/v0");
        assert_eq!(store.table, "Users");
        assert_eq!(store.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_mail_settings() {
        let config = config_from(&[
            ("JWT_SECRET", "s"),
            ("MAIL_HOST", "relay.local"),
            ("MAIL_PORT", "2525"),
            ("MAIL_FROM", "noreply@x.com"),
            ("MAIL_USERNAME", "user"),
        ])
        .unwrap();
        let mail = config.mail.unwrap();
        assert_eq!(mail.port, 2525);
        assert_eq!(mail.security, MailSecurity::Starttls);
        assert_eq!(mail.username.as_deref(), Some("user"));
        assert!(mail.password.is_none());

        let implicit = config_from(&[
            ("JWT_SECRET", "s"),
            ("MAIL_HOST", "smtp.x.com"),
            ("MAIL_PORT", "465"),
            ("MAIL_FROM", "noreply@x.com"),
        ])
        .unwrap();
        assert_eq!(implicit.mail.unwrap().security, MailSecurity::Tls);

        let bad = config_from(&[
            ("JWT_SECRET", "s"),
            ("MAIL_HOST", "smtp.x.com"),
            ("MAIL_FROM", "noreply@x.com"),
            ("MAIL_SECURITY", "ssl3"),
        ]);
        assert!(matches!(bad, Err(ConfigError::Invalid { name: "MAIL_SECURITY", .. })));
    }

    #[test]
    fn test_seed_admin_debug_hides_password() {
        let config = config_from(&[
            ("JWT_SECRET", "s"),
            ("SEED_ADMIN_EMAIL", "root@x.com"),
            ("SEED_ADMIN_PASSWORD", "hunter22"),
        ])
        .unwrap();
        let rendered = format!("{:?}", config.seed_admin.unwrap());
        assert!(rendered.contains("root@x.com"));
        assert!(!rendered.contains("hunter22"));
    }
}
