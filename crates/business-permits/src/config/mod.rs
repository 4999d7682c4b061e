use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::permits::policy::{DuplicateScope, MAX_VALIDITY_DAYS};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the permit service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub policy: PolicyConfig,
    pub authorization: AuthorizationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            policy: PolicyConfig::from_env()?,
            authorization: AuthorizationConfig::from_env(),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

const DEFAULT_FEE_TABLE: &str = "restaurant=1000,retail=500,manufacturing=2500";

/// Fee, validity, and inspection policy as read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    pub default_minimum_fee: u64,
    pub fee_table: BTreeMap<String, u64>,
    pub validity_days: i64,
    pub required_inspections: Vec<String>,
    pub duplicate_scope: DuplicateScope,
}

impl PolicyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_fee = var_or("PERMIT_DEFAULT_MIN_FEE", "500");
        let default_minimum_fee = raw_fee
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidFee { value: raw_fee })?;

        let fee_table = parse_fee_table(&var_or("PERMIT_FEE_TABLE", DEFAULT_FEE_TABLE))?;

        let raw_days = var_or("PERMIT_VALIDITY_DAYS", "365");
        let validity_days = match raw_days.trim().parse::<i64>() {
            Ok(days) if (1..=MAX_VALIDITY_DAYS).contains(&days) => days,
            _ => return Err(ConfigError::InvalidValidityPeriod { value: raw_days }),
        };

        let required_inspections =
            parse_list(&var_or("PERMIT_REQUIRED_INSPECTIONS", "fire-safety"));

        let raw_scope = var_or("PERMIT_DUPLICATE_SCOPE", "applicant");
        let duplicate_scope = DuplicateScope::parse(&raw_scope)
            .ok_or(ConfigError::InvalidDuplicateScope { value: raw_scope })?;

        Ok(Self {
            default_minimum_fee,
            fee_table,
            validity_days,
            required_inspections,
            duplicate_scope,
        })
    }
}

/// Reviewer and inspector rosters for the static authorization provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationConfig {
    pub reviewers: Vec<String>,
    pub inspectors: Vec<String>,
}

impl AuthorizationConfig {
    fn from_env() -> Self {
        Self {
            reviewers: parse_list(&var_or("PERMIT_REVIEWERS", "")),
            inspectors: parse_list(&var_or("PERMIT_INSPECTORS", "")),
        }
    }
}

/// Parse `type=amount` pairs separated by commas.
pub fn parse_fee_table(raw: &str) -> Result<BTreeMap<String, u64>, ConfigError> {
    let mut table = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let invalid = || ConfigError::InvalidFeeTable {
            entry: entry.to_string(),
        };
        let (business_type, amount) = entry.split_once('=').ok_or_else(invalid)?;
        let business_type = business_type.trim().to_ascii_lowercase();
        if business_type.is_empty() {
            return Err(invalid());
        }
        let amount = amount.trim().parse::<u64>().map_err(|_| invalid())?;
        table.insert(business_type, amount);
    }
    Ok(table)
}

pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFee { value: String },
    InvalidFeeTable { entry: String },
    InvalidValidityPeriod { value: String },
    InvalidDuplicateScope { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFee { value } => {
                write!(f, "PERMIT_DEFAULT_MIN_FEE must be a whole amount, got '{value}'")
            }
            ConfigError::InvalidFeeTable { entry } => {
                write!(f, "PERMIT_FEE_TABLE entry '{entry}' must look like type=amount")
            }
            ConfigError::InvalidValidityPeriod { value } => {
                write!(
                    f,
                    "PERMIT_VALIDITY_DAYS must be between 1 and {MAX_VALIDITY_DAYS} days, got '{value}'"
                )
            }
            ConfigError::InvalidDuplicateScope { value } => {
                write!(f, "PERMIT_DUPLICATE_SCOPE must be 'applicant' or 'global', got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "PERMIT_DEFAULT_MIN_FEE",
            "PERMIT_FEE_TABLE",
            "PERMIT_VALIDITY_DAYS",
            "PERMIT_REQUIRED_INSPECTIONS",
            "PERMIT_DUPLICATE_SCOPE",
            "PERMIT_REVIEWERS",
            "PERMIT_INSPECTORS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.policy.default_minimum_fee, 500);
        assert_eq!(config.policy.fee_table.get("restaurant"), Some(&1000));
        assert_eq!(config.policy.validity_days, 365);
        assert_eq!(config.policy.required_inspections, vec!["fire-safety"]);
        assert_eq!(config.policy.duplicate_scope, DuplicateScope::PerApplicant);
        assert!(config.authorization.reviewers.is_empty());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn reads_policy_and_rosters_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PERMIT_FEE_TABLE", "Food-Truck=750, salon=300");
        env::set_var("PERMIT_VALIDITY_DAYS", "180");
        env::set_var("PERMIT_REQUIRED_INSPECTIONS", "fire-safety, health");
        env::set_var("PERMIT_DUPLICATE_SCOPE", "global");
        env::set_var("PERMIT_REVIEWERS", "clerk-1,clerk-2");
        env::set_var("PERMIT_INSPECTORS", "inspector-9");

        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.policy.fee_table.get("food-truck"), Some(&750));
        assert_eq!(config.policy.fee_table.get("salon"), Some(&300));
        assert_eq!(config.policy.validity_days, 180);
        assert_eq!(
            config.policy.required_inspections,
            vec!["fire-safety".to_string(), "health".to_string()]
        );
        assert_eq!(config.policy.duplicate_scope, DuplicateScope::Global);
        assert_eq!(config.authorization.reviewers, vec!["clerk-1", "clerk-2"]);
        assert_eq!(config.authorization.inspectors, vec!["inspector-9"]);
    }

    #[test]
    fn rejects_malformed_policy_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();

        env::set_var("PERMIT_VALIDITY_DAYS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidValidityPeriod { .. })
        ));
        reset_env();

        env::set_var("PERMIT_VALIDITY_DAYS", "40000");
        match AppConfig::load() {
            Err(err @ ConfigError::InvalidValidityPeriod { .. }) => {
                assert!(err.to_string().contains("40000"));
            }
            other => panic!("expected out-of-range validity period, got {other:?}"),
        }
        reset_env();

        env::set_var("PERMIT_VALIDITY_DAYS", "36500");
        let config = AppConfig::load().expect("upper bound accepted");
        assert_eq!(config.policy.validity_days, 36_500);
        reset_env();

        env::set_var("PERMIT_DUPLICATE_SCOPE", "city");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidDuplicateScope { .. })
        ));
        reset_env();
    }

    #[test]
    fn fee_table_requires_type_and_amount() {
        assert!(matches!(
            parse_fee_table("restaurant"),
            Err(ConfigError::InvalidFeeTable { .. })
        ));
        assert!(matches!(
            parse_fee_table("=100"),
            Err(ConfigError::InvalidFeeTable { .. })
        ));
        assert!(matches!(
            parse_fee_table("retail=lots"),
            Err(ConfigError::InvalidFeeTable { .. })
        ));
        assert!(parse_fee_table("").expect("empty table").is_empty());
    }
}
