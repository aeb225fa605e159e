/// Configuration management for Timeline Service
///
/// Everything is read from environment variables; `.env` is loaded by the
/// binary in development.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Access token verification
    pub auth: AuthConfig,
    /// Feed behaviour
    pub feed: FeedConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

impl CorsConfig {
    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Process-local store, data is lost on restart
    Memory,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    /// Database URL
    pub url: String,
    /// Apply `migrations/` on startup
    pub run_migrations: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the token issuer
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Show the viewer's own posts in the `following` feed
    pub following_includes_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("TIMELINE_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("TIMELINE_SERVICE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                backend: match std::env::var("STORAGE_BACKEND").as_deref() {
                    Ok("memory") => StorageBackend::Memory,
                    Ok("postgres") | Err(_) => StorageBackend::Postgres,
                    Ok(other) => {
                        return Err(format!(
                            "STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'",
                            other
                        ))
                    }
                },
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/chirp".to_string()),
                run_migrations: parse_bool_or_default("RUN_MIGRATIONS", !production)?,
            },
            auth: {
                let jwt_secret = match std::env::var("JWT_SECRET") {
                    Ok(secret) if !secret.trim().is_empty() => secret,
                    _ if production => {
                        return Err("JWT_SECRET must be set in production".to_string())
                    }
                    _ => DEV_JWT_SECRET.to_string(),
                };

                if production && jwt_secret == DEV_JWT_SECRET {
                    return Err("JWT_SECRET cannot use the development default".to_string());
                }

                AuthConfig { jwt_secret }
            },
            feed: FeedConfig {
                following_includes_self: parse_bool_or_default(
                    "FOLLOWING_FEED_INCLUDES_SELF",
                    false,
                )?,
            },
            logging: LoggingConfig {
                json: std::env::var("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(production),
            },
        })
    }
}

fn parse_bool_or_default(key: &str, default: bool) -> Result<bool, String> {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(format!("Failed to parse {}='{}' as a boolean", key, val)),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "CORS_ALLOWED_ORIGINS",
        "JWT_SECRET",
        "STORAGE_BACKEND",
        "FOLLOWING_FEED_INCLUDES_SELF",
        "LOG_FORMAT",
        "RUN_MIGRATIONS",
    ];

    fn clear() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn development_defaults() {
        clear();
        let config = Config::from_env().unwrap();

        assert_eq!(config.app.port, 8080);
        assert_eq!(config.database.backend, StorageBackend::Postgres);
        assert!(config.database.run_migrations);
        assert!(!config.feed.following_includes_self);
        assert!(!config.logging.json);
        assert_eq!(config.auth.jwt_secret, DEV_JWT_SECRET);
    }

    #[test]
    #[serial]
    fn production_requires_secret_and_explicit_cors() {
        clear();
        std::env::set_var("APP_ENV", "production");
        assert!(Config::from_env().is_err());

        std::env::set_var("CORS_ALLOWED_ORIGINS", "*");
        std::env::set_var("JWT_SECRET", "s3cret");
        assert!(Config::from_env().is_err());

        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://chirp.dev");
        let config = Config::from_env().unwrap();
        assert!(config.app.is_production());
        assert!(config.logging.json);
        assert!(!config.database.run_migrations);
        clear();
    }

    #[test]
    #[serial]
    fn feed_and_storage_flags() {
        clear();
        std::env::set_var("FOLLOWING_FEED_INCLUDES_SELF", "true");
        std::env::set_var("STORAGE_BACKEND", "memory");
        let config = Config::from_env().unwrap();
        assert!(config.feed.following_includes_self);
        assert_eq!(config.database.backend, StorageBackend::Memory);

        std::env::set_var("FOLLOWING_FEED_INCLUDES_SELF", "maybe");
        assert!(Config::from_env().is_err());
        clear();
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let cors = CorsConfig {
            allowed_origins: "http://a.dev, http://b.dev,,".to_string(),
        };
        assert_eq!(cors.origins().collect::<Vec<_>>(), vec!["http://a.dev", "http://b.dev"]);
    }
}
