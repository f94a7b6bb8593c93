use std::env;
use std::str::FromStr;

const DEV_JWT_SECRET: &str = "dev-secret-key-change-in-production";

// Top-level configuration, one section per concern
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub features: FeatureFlags,
}

// HTTP server and logging
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    /// How long a seat selection waits for payment before it is dropped.
    pub pending_booking_ttl_seconds: u64,
    pub match_list_ttl_seconds: u64,
    /// Upper bound on how long a cached seat map may lag behind Postgres.
    pub seat_map_ttl_seconds: u64,
}

// Session tokens
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
    pub admin_email: String,
    pub admin_password: String,
}

// Feature flags
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    pub seed_sample_data: bool,
    /// Reject seats outside the stadium's rows x seats_per_row grid.
    /// Off by default: the booking flow has never checked bounds.
    pub enforce_seat_bounds: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == "development" => DEV_JWT_SECRET.to_string(),
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Config {
            app: AppConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 8000)?,
                environment,
                rust_log: lookup("RUST_LOG")
                    .unwrap_or_else(|| "cricket_tickets=debug,tower_http=debug".to_string()),
                log_format,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                pool_size: parse_or(&lookup, "DB_POOL_SIZE", 10)?,
            },
            redis: RedisConfig {
                url: lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
                pending_booking_ttl_seconds: parse_or(&lookup, "PENDING_BOOKING_TTL_SECONDS", 900)?,
                match_list_ttl_seconds: parse_or(&lookup, "MATCH_LIST_TTL_SECONDS", 60)?,
                seat_map_ttl_seconds: parse_or(&lookup, "SEAT_MAP_TTL_SECONDS", 30)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expires_in_hours: parse_or(&lookup, "JWT_EXPIRES_IN_HOURS", 24)?,
            },
            auth: AuthConfig {
                bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
                admin_email: lookup("ADMIN_EMAIL").unwrap_or_else(|| "admin@cricket.com".to_string()),
                admin_password: lookup("ADMIN_PASSWORD").unwrap_or_else(|| "admin123".to_string()),
            },
            features: FeatureFlags {
                seed_sample_data: parse_or(&lookup, "SEED_SAMPLE_DATA", true)?,
                enforce_seat_bounds: parse_or(&lookup, "ENFORCE_SEAT_BOUNDS", false)?,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_in_development() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/tix")]))
            .unwrap();

        assert_eq!(config.app.port, 8000);
        assert_eq!(config.app.log_format, LogFormat::Pretty);
        assert_eq!(config.jwt.secret, DEV_JWT_SECRET);
        assert_eq!(config.redis.pending_booking_ttl_seconds, 900);
        assert_eq!(config.redis.seat_map_ttl_seconds, 30);
        assert!(config.features.seed_sample_data);
        assert!(!config.features.enforce_seat_bounds);
    }

    #[test]
    fn database_url_is_required() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn production_requires_jwt_secret() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/tix"),
            ("ENVIRONMENT", "production"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/tix"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "PORT has an invalid value: \"eighty\"");
    }

    #[test]
    fn cache_lifetimes_can_be_tuned() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/tix"),
            ("SEAT_MAP_TTL_SECONDS", "5"),
            ("MATCH_LIST_TTL_SECONDS", "120"),
        ]))
        .unwrap();

        assert_eq!(config.redis.seat_map_ttl_seconds, 5);
        assert_eq!(config.redis.match_list_ttl_seconds, 120);

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/tix"),
            ("SEAT_MAP_TTL_SECONDS", "-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SEAT_MAP_TTL_SECONDS", .. }));
    }

    #[test]
    fn flags_and_formats_parse() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/tix"),
            ("ENFORCE_SEAT_BOUNDS", "true"),
            ("SEED_SAMPLE_DATA", "false"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert!(config.features.enforce_seat_bounds);
        assert!(!config.features.seed_sample_data);
        assert_eq!(config.app.log_format, LogFormat::Json);
    }
}
