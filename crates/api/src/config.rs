//! Process configuration for the API binary.
//!
//! Everything is read from environment variables once at startup.

use std::net::SocketAddr;

use anyhow::{Context, anyhow};

use stockhold_core::ProductId;
use stockhold_infra::config::ReservationConfig;

pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_USE_PERSISTENT_STORES: &str = "USE_PERSISTENT_STORES";
pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_SEED_PRODUCTS: &str = "SEED_PRODUCTS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub reservation: ReservationConfig,
    /// Redis reservation store + Postgres stock ledger instead of in-memory ones.
    pub use_persistent_stores: bool,
    pub redis_url: String,
    pub database_url: Option<String>,
    /// Initial stock for the in-memory ledger (`SEED_PRODUCTS=1:10,2:5`).
    pub seed_products: Vec<(ProductId, u64)>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            reservation: ReservationConfig::default(),
            use_persistent_stores: false,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            database_url: None,
            seed_products: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reservation = ReservationConfig::from_lookup(&lookup)?;

        let bind_addr = lookup(ENV_BIND_ADDR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .with_context(|| format!("invalid {ENV_BIND_ADDR}"))?;

        let use_persistent_stores = lookup(ENV_USE_PERSISTENT_STORES)
            .map(|v| v.trim().parse::<bool>().unwrap_or(false))
            .unwrap_or(false);

        let seed_products = match lookup(ENV_SEED_PRODUCTS) {
            Some(raw) => parse_seed_products(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            bind_addr,
            reservation,
            use_persistent_stores,
            redis_url: lookup(ENV_REDIS_URL).unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            database_url: lookup(ENV_DATABASE_URL),
            seed_products,
        })
    }
}

/// Parse `id:quantity` pairs separated by commas.
fn parse_seed_products(raw: &str) -> anyhow::Result<Vec<(ProductId, u64)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (id, qty) = entry
                .split_once(':')
                .ok_or_else(|| anyhow!("invalid {ENV_SEED_PRODUCTS} entry {entry:?}: expected id:quantity"))?;
            let id: ProductId = id.parse()?;
            let qty: u64 = qty
                .trim()
                .parse()
                .with_context(|| format!("invalid quantity in {ENV_SEED_PRODUCTS} entry {entry:?}"))?;
            Ok((id, qty))
        })
        .collect()
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
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(!config.use_persistent_stores);
        assert!(config.seed_products.is_empty());
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_BIND_ADDR, "127.0.0.1:9000"),
            (ENV_USE_PERSISTENT_STORES, "true"),
            (ENV_SEED_PRODUCTS, "1:10, 2:5"),
            ("RESERVATION_TTL_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert!(config.use_persistent_stores);
        assert_eq!(
            config.seed_products,
            vec![(ProductId::new(1), 10), (ProductId::new(2), 5)]
        );
        assert_eq!(config.reservation.ttl.as_secs(), 60);
    }

    #[test]
    fn malformed_seed_is_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[(ENV_SEED_PRODUCTS, "1=10")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[(ENV_SEED_PRODUCTS, "x:10")])).is_err());
    }
}
