use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::utils::{CircuitBreakerConfig, RetryConfig};

// ============================================================================
// Configuration - environment variables, optionally seeded from `.env`
// ============================================================================
//
// Every key has a default so the service starts with no configuration
// against local dependencies. A key that is set but does not parse is a
// startup error, never silently replaced by its default.
//
// ============================================================================

/// Where orders are persisted
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Memory,
    Scylla { nodes: Vec<String>, keyspace: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_host: String,
    pub http_port: u16,

    // Remote services
    pub product_service_url: String,
    pub payment_service_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,

    // Fault tolerance
    pub breaker: CircuitBreakerConfig,
    /// One breaker for both remote services instead of one each
    pub shared_breaker: bool,
    pub retry: RetryConfig,

    pub store: StoreBackend,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::info!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env { lookup };

        let breaker = CircuitBreakerConfig {
            failure_rate_threshold: env.parse("BREAKER_FAILURE_RATE", 0.5)?,
            window_size: env.parse("BREAKER_WINDOW_SIZE", 10)?,
            minimum_calls: env.parse("BREAKER_MINIMUM_CALLS", 5)?,
            timeout: Duration::from_secs(env.parse("BREAKER_OPEN_SECS", 30)?),
            success_threshold: env.parse("BREAKER_HALF_OPEN_SUCCESSES", 1)?,
        };
        if !(breaker.failure_rate_threshold > 0.0 && breaker.failure_rate_threshold <= 1.0) {
            bail!(
                "BREAKER_FAILURE_RATE must be in (0, 1], got {}",
                breaker.failure_rate_threshold
            );
        }
        if breaker.window_size == 0 || breaker.success_threshold == 0 {
            bail!("BREAKER_WINDOW_SIZE and BREAKER_HALF_OPEN_SUCCESSES must be positive");
        }

        let retry = RetryConfig {
            max_attempts: env.parse::<u32>("RETRY_MAX_ATTEMPTS", 2)?.max(1),
            initial_delay: Duration::from_millis(env.parse("RETRY_INITIAL_DELAY_MS", 200)?),
            ..RetryConfig::default()
        };

        let store = match env.string("ORDER_STORE", "memory").to_ascii_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            "scylla" => StoreBackend::Scylla {
                nodes: env
                    .string("SCYLLA_NODES", "127.0.0.1:9042")
                    .split(',')
                    .map(|node| node.trim().to_string())
                    .filter(|node| !node.is_empty())
                    .collect(),
                keyspace: env.string("SCYLLA_KEYSPACE", "order_service_ks"),
            },
            other => bail!("Unknown ORDER_STORE '{}', expected 'memory' or 'scylla'", other),
        };

        Ok(Self {
            http_host: env.string("HTTP_HOST", "0.0.0.0"),
            http_port: env.parse("HTTP_PORT", 8082)?,
            product_service_url: env.string("PRODUCT_SERVICE_URL", "http://127.0.0.1:8080"),
            payment_service_url: env.string("PAYMENT_SERVICE_URL", "http://127.0.0.1:8081"),
            request_timeout: Duration::from_millis(env.parse("REQUEST_TIMEOUT_MS", 5000)?),
            connect_timeout: Duration::from_millis(env.parse("CONNECT_TIMEOUT_MS", 2000)?),
            breaker,
            shared_breaker: env.parse("BREAKER_SHARED", false)?,
            retry,
            store,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn string(&self, key: &str, default: &str) -> String {
        (self.lookup)(key)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match (self.lookup)(key).filter(|value| !value.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
            None => Ok(default),
        }
    }
}
