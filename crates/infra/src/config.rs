//! Reservation engine configuration.
//!
//! Read once at startup. Every committed reservation gets the same TTL; there is
//! no per-request override.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_TTL: Duration = Duration::from_secs(900);
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound accepted for the TTL (one year). Keeps `expires_at` arithmetic in range.
const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Longest sweep interval accepted (one day).
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub const ENV_TTL_SECS: &str = "RESERVATION_TTL_SECS";
pub const ENV_STORE_TIMEOUT_MS: &str = "STORE_TIMEOUT_MS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "SWEEP_INTERVAL_SECS";
pub const ENV_ADMISSION_MODE: &str = "ADMISSION_MODE";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// How the check-and-commit sequence is made atomic per (supplier, product).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AdmissionMode {
    /// In-process mutex per pair held across scan, check and put.
    #[default]
    ProcessLock,
    /// Single conditional-commit call on the store (for stores shared across processes).
    StoreAtomic,
}

impl FromStr for AdmissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "process_lock" | "lock" => Ok(Self::ProcessLock),
            "store_atomic" | "atomic" => Ok(Self::StoreAtomic),
            other => Err(format!("expected process_lock or store_atomic, got {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationConfig {
    /// Lifetime of every committed reservation.
    pub ttl: Duration,
    /// Budget for a single store operation; exceeding it is `StoreUnavailable`.
    pub store_timeout: Duration,
    /// How often expired entries are physically evicted.
    pub sweep_interval: Duration,
    pub mode: AdmissionMode,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            mode: AdmissionMode::default(),
        }
    }
}

impl ReservationConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: AdmissionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Load from process environment, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source (tests pass a map lookup).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TTL_SECS) {
            let secs = parse_positive(ENV_TTL_SECS, &raw)?;
            if secs > MAX_TTL_SECS {
                return Err(invalid(ENV_TTL_SECS, &raw, "exceeds one year"));
            }
            config.ttl = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(ENV_STORE_TIMEOUT_MS) {
            config.store_timeout = Duration::from_millis(parse_positive(ENV_STORE_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_SWEEP_INTERVAL_SECS) {
            let secs = parse_positive(ENV_SWEEP_INTERVAL_SECS, &raw)?;
            if secs > MAX_SWEEP_INTERVAL.as_secs() {
                return Err(invalid(ENV_SWEEP_INTERVAL_SECS, &raw, "exceeds one day"));
            }
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(ENV_ADMISSION_MODE) {
            config.mode = raw
                .parse()
                .map_err(|reason: String| invalid(ENV_ADMISSION_MODE, &raw, reason))?;
        }

        Ok(config)
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(invalid(var, raw, "must be greater than zero")),
        Ok(v) => Ok(v),
        Err(e) => Err(invalid(var, raw, e.to_string())),
    }
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn unset_variables_use_defaults() {
        let config = ReservationConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ReservationConfig::default());
        assert_eq!(config.ttl, Duration::from_secs(900));
    }

    #[test]
    fn variables_override_defaults() {
        let config = ReservationConfig::from_lookup(lookup(&[
            (ENV_TTL_SECS, "60"),
            (ENV_STORE_TIMEOUT_MS, "250"),
            (ENV_SWEEP_INTERVAL_SECS, "5"),
            (ENV_ADMISSION_MODE, "store_atomic"),
        ]))
        .unwrap();

        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.mode, AdmissionMode::StoreAtomic);
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        let err = ReservationConfig::from_lookup(lookup(&[(ENV_TTL_SECS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_TTL_SECS, .. }));

        let err = ReservationConfig::from_lookup(lookup(&[(ENV_STORE_TIMEOUT_MS, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_STORE_TIMEOUT_MS, .. }));

        let err = ReservationConfig::from_lookup(lookup(&[(ENV_ADMISSION_MODE, "yolo")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_ADMISSION_MODE, .. }));
    }

    #[test]
    fn ttl_longer_than_a_year_is_rejected() {
        let err = ReservationConfig::from_lookup(lookup(&[(ENV_TTL_SECS, "999999999")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_TTL_SECS, .. }));
    }

    #[test]
    fn sweep_interval_longer_than_a_day_is_rejected() {
        let err = ReservationConfig::from_lookup(lookup(&[(ENV_SWEEP_INTERVAL_SECS, "86401")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_SWEEP_INTERVAL_SECS, .. }));

        let err = ReservationConfig::from_lookup(lookup(&[(ENV_SWEEP_INTERVAL_SECS, u64::MAX.to_string().as_str())]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_SWEEP_INTERVAL_SECS, .. }));

        let config = ReservationConfig::from_lookup(lookup(&[(ENV_SWEEP_INTERVAL_SECS, "86400")])).unwrap();
        assert_eq!(config.sweep_interval, MAX_SWEEP_INTERVAL);
    }
}
