use std::time::Duration;

/// Deployment environment, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variables: {0:?}")]
    Missing(Vec<&'static str>),
    #[error("JWT_SECRET must be at least 32 characters long")]
    WeakJwtSecret,
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

pub const MIN_JWT_SECRET_LEN: usize = 32;
pub const DEFAULT_DECIDE_URL: &str = "https://decide.arcjet.com";

/// Settings for the external edge-security decision service.
#[derive(Clone, Debug)]
pub struct ProtectionConfig {
    pub key: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub protection: ProtectionConfig,
    pub frontend_url: Option<String>,
    pub enable_hsts: bool,
    pub log_level: String,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// `.env` is only loaded in debug builds; deployed binaries expect the
    /// variables to be set by the supervisor (systemd, Docker, ...).
    pub fn from_env() -> Result<Self, ConfigError> {
        if cfg!(debug_assertions) {
            let _ = dotenv::dotenv();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup. Used directly by tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut required = vec!["JWT_SECRET", "ARCJET_KEY"];
        if cfg!(feature = "postgres-store") {
            required.push("DATABASE_URL");
        }
        let missing: Vec<&'static str> = required
            .into_iter()
            .filter(|name| non_empty(*name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let jwt_secret = non_empty("JWT_SECRET").unwrap_or_default();
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret);
        }

        let port = match non_empty("PORT") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value: v })?,
            None => 3000,
        };
        let timeout_ms: u64 = match non_empty("ARCJET_TIMEOUT_MS") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "ARCJET_TIMEOUT_MS", value: v })?,
            None => 1000,
        };

        Ok(Self {
            environment: non_empty("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or_default(),
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: non_empty("DATABASE_URL"),
            jwt_secret,
            protection: ProtectionConfig {
                key: non_empty("ARCJET_KEY").unwrap_or_default(),
                base_url: non_empty("ARCJET_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_DECIDE_URL.to_string()),
                timeout: Duration::from_millis(timeout_ms),
            },
            frontend_url: non_empty("FRONTEND_URL"),
            enable_hsts: non_empty("ENABLE_HSTS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn defaults_applied() {
        let cfg = Config::from_lookup(lookup(&[
            ("JWT_SECRET", SECRET),
            ("ARCJET_KEY", "ajkey_test"),
            ("DATABASE_URL", "postgres://localhost/app"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.protection.base_url, DEFAULT_DECIDE_URL);
        assert_eq!(cfg.protection.timeout, Duration::from_millis(1000));
        assert!(!cfg.enable_hsts);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn missing_secret_and_key_reported_together() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        match err {
            ConfigError::Missing(names) => {
                assert!(names.contains(&"JWT_SECRET"));
                assert!(names.contains(&"ARCJET_KEY"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_secret_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "short"),
            ("ARCJET_KEY", "k"),
            ("DATABASE_URL", "postgres://x"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::WeakJwtSecret));
    }

    #[test]
    fn bad_port_is_invalid() {
        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET", SECRET),
            ("ARCJET_KEY", "k"),
            ("DATABASE_URL", "postgres://x"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn environment_parsing() {
        assert_eq!(Environment::parse("PRODUCTION"), Environment::Production);
        assert_eq!(Environment::parse("test"), Environment::Test);
        assert_eq!(Environment::parse("staging"), Environment::Development);
        assert!(Environment::Production.is_production());
    }
}
