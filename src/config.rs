// ⚙️ Configuration - environment driven, `.env` aware

use anyhow::{Context, Result};
use rand::Rng;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "finance.db";

/// Bounded retry for units of work that hit a transient storage conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration, max_backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_backoff,
            max_backoff: max_backoff.max(base_backoff),
        }
    }

    /// Delay before the attempt following `attempt` (1-based).
    ///
    /// Exponential, capped at `max_backoff`, with up to 50% random jitter so
    /// colliding writers spread out.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let capped = self
            .base_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff);

        let half_ms = (capped.as_millis() / 2) as u64;
        if half_ms == 0 {
            return capped;
        }
        let jitter = rand::thread_rng().gen_range(0..=half_ms);
        capped - Duration::from_millis(half_ms) + Duration::from_millis(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(5, Duration::from_millis(20), Duration::from_millis(500))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub database_path: PathBuf,
    pub retry: RetryPolicy,
    /// How long SQLite waits on a locked database before reporting busy
    pub busy_timeout: Duration,
    /// Default deadline for one transfer, `None` = retry budget only
    pub transfer_timeout: Option<Duration>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            retry: RetryPolicy::default(),
            busy_timeout: Duration::from_millis(250),
            transfer_timeout: None,
        }
    }
}

impl LedgerConfig {
    /// Load `.env` (if any) and read `LEDGER_*` variables over the defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LedgerConfig::from_env`] with an explicit variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LedgerConfig::default();

        let database_path = lookup("LEDGER_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let max_attempts =
            parse_var(&lookup, "LEDGER_MAX_ATTEMPTS")?.unwrap_or(defaults.retry.max_attempts);
        let base_backoff = parse_millis(&lookup, "LEDGER_RETRY_BACKOFF_MS")?
            .unwrap_or(defaults.retry.base_backoff);
        let max_backoff = parse_millis(&lookup, "LEDGER_MAX_BACKOFF_MS")?
            .unwrap_or(defaults.retry.max_backoff);
        let busy_timeout =
            parse_millis(&lookup, "LEDGER_BUSY_TIMEOUT_MS")?.unwrap_or(defaults.busy_timeout);
        let transfer_timeout = parse_millis(&lookup, "LEDGER_TRANSFER_TIMEOUT_MS")?;

        if max_attempts == 0 {
            anyhow::bail!("LEDGER_MAX_ATTEMPTS must be at least 1");
        }

        Ok(LedgerConfig {
            database_path,
            retry: RetryPolicy::new(max_attempts, base_backoff, max_backoff),
            busy_timeout,
            transfer_timeout,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            let value = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_var::<u64, F>(lookup, key)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = LedgerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.database_path, PathBuf::from("finance.db"));
        assert_eq!(config.retry.max_attempts, 5);
        assert!(config.transfer_timeout.is_none());
    }

    #[test]
    fn test_reads_every_variable() {
        let config = LedgerConfig::from_lookup(lookup_from(&[
            ("LEDGER_DB_PATH", "/tmp/ledger.db"),
            ("LEDGER_MAX_ATTEMPTS", "9"),
            ("LEDGER_RETRY_BACKOFF_MS", "5"),
            ("LEDGER_MAX_BACKOFF_MS", "80"),
            ("LEDGER_BUSY_TIMEOUT_MS", "1000"),
            ("LEDGER_TRANSFER_TIMEOUT_MS", "3000"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.retry.max_attempts, 9);
        assert_eq!(config.retry.base_backoff, Duration::from_millis(5));
        assert_eq!(config.retry.max_backoff, Duration::from_millis(80));
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert_eq!(config.transfer_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = LedgerConfig::from_lookup(lookup_from(&[("LEDGER_MAX_ATTEMPTS", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("LEDGER_MAX_ATTEMPTS"), "got: {}", err);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = LedgerConfig::from_lookup(lookup_from(&[("LEDGER_MAX_ATTEMPTS", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_millis(10), Duration::from_millis(100));

        for attempt in 1..=10 {
            let delay = policy.backoff(attempt);
            let nominal = Duration::from_millis(10 * (1u64 << (attempt - 1))).min(policy.max_backoff);
            assert!(delay <= nominal, "attempt {}: {:?} > {:?}", attempt, delay, nominal);
            assert!(delay >= nominal / 2, "attempt {}: {:?} < half of {:?}", attempt, delay, nominal);
        }
    }

    #[test]
    fn test_zero_backoff_never_sleeps() {
        let policy = RetryPolicy::new(1, Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff(1), Duration::ZERO);
    }

    #[test]
    fn test_policy_clamps_nonsense() {
        let policy = RetryPolicy::new(0, Duration::from_millis(50), Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.max_backoff, Duration::from_millis(50));
    }
}
