//! Redis-backed reservation store (shared across processes).
//!
//! Values are the camelCase JSON of [`Reservation`], written with `SET .. PX`
//! so Redis expires them natively. Pattern scans use `SCAN MATCH` with the
//! glob `key_*_<supplierId>_<productId>` and re-check every returned key
//! against [`ScanPattern::matches`].
//!
//! The conditional commit is a Lua script, so the aggregate and the write run
//! as one atomic step on the server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use tracing::instrument;

use stockhold_core::{Clock, SystemClock};
use stockhold_inventory::{
    Capacity, KEY_PREFIX, Reservation, ReservationKey, ScanPattern,
};

use super::r#trait::{CommitOutcome, ReservationScan, ReservationStore, StoreError};

const SCAN_PAGE: usize = 200;

/// KEYS[1] = key to write, ARGV = glob, requested, capacity, value, ttl_ms.
/// Returns `{committed, reserved}`.
const COMMIT_WITHIN_CAPACITY: &str = r#"
local reserved = 0
local cursor = "0"
repeat
  local page = redis.call('SCAN', cursor, 'MATCH', ARGV[1], 'COUNT', 200)
  cursor = page[1]
  for _, k in ipairs(page[2]) do
    local v = redis.call('GET', k)
    if v then
      reserved = reserved + tonumber(cjson.decode(v).quantity)
    end
  end
until cursor == "0"
if reserved + tonumber(ARGV[2]) > tonumber(ARGV[3]) then
  return {0, reserved}
end
redis.call('SET', KEYS[1], ARGV[4], 'PX', ARGV[5])
return {1, reserved}
"#;

#[derive(Clone)]
pub struct RedisReservationStore {
    conn: ConnectionManager,
    clock: Arc<dyn Clock>,
    commit_script: Script,
}

impl std::fmt::Debug for RedisReservationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisReservationStore").finish_non_exhaustive()
    }
}

impl RedisReservationStore {
    /// Connect to `redis_url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::unavailable(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::unavailable(format!("redis connection failed: {e}")))?;

        Ok(Self {
            conn,
            clock: Arc::new(SystemClock),
            commit_script: Script::new(COMMIT_WITHIN_CAPACITY),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn encode(reservation: &Reservation) -> Result<String, StoreError> {
        serde_json::to_string(reservation).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode(raw: &str) -> Result<Reservation, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn scan_keys(&self, glob: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(glob)
                .arg("COUNT")
                .arg(SCAN_PAGE)
                .query_async(&mut conn)
                .await
                .map_err(command_failed)?;
            keys.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once across pages.
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}

/// Store-side glob equivalent of a [`ScanPattern`].
pub(crate) fn scan_glob(pattern: &ScanPattern) -> String {
    match pattern {
        ScanPattern::All => format!("{KEY_PREFIX}*"),
        ScanPattern::SupplierProduct(pair) => format!("{KEY_PREFIX}*{}", pair.key_suffix()),
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn command_failed(e: redis::RedisError) -> StoreError {
    StoreError::unavailable(format!("redis command failed: {e}"))
}

#[async_trait]
impl ReservationStore for RedisReservationStore {
    #[instrument(skip(self, reservation), fields(key = %key), err)]
    async fn put(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let payload = Self::encode(reservation)?;
        let mut conn = self.conn.clone();

        let _: () = redis::cmd("SET")
            .arg(key.render())
            .arg(payload)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(command_failed)?;
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key), err)]
    async fn get(&self, key: &ReservationKey) -> Result<Option<Reservation>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(key.render())
            .query_async(&mut conn)
            .await
            .map_err(command_failed)?;

        let now = self.clock.now();
        match raw {
            Some(raw) => Ok(Some(Self::decode(&raw)?).filter(|r| !r.is_expired_at(now))),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), err)]
    async fn scan(&self, pattern: &ScanPattern) -> Result<ReservationScan, StoreError> {
        let keys: Vec<String> = self
            .scan_keys(&scan_glob(pattern))
            .await?
            .into_iter()
            .filter(|k| pattern.matches(k))
            .collect();
        if keys.is_empty() {
            return Ok(ReservationScan::default());
        }

        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(command_failed)?;

        let now = self.clock.now();
        let mut items = Vec::with_capacity(values.len());
        // Keys that expired between SCAN and MGET come back as nil.
        for raw in values.into_iter().flatten() {
            let reservation = Self::decode(&raw)?;
            if !reservation.is_expired_at(now) {
                items.push(reservation);
            }
        }
        Ok(ReservationScan::new(items))
    }

    #[instrument(skip(self, reservation, capacity), fields(key = %key, capacity = capacity.quantity), err)]
    async fn put_within_capacity(
        &self,
        key: &ReservationKey,
        reservation: &Reservation,
        ttl: Duration,
        capacity: &Capacity,
    ) -> Result<CommitOutcome, StoreError> {
        let payload = Self::encode(reservation)?;
        let mut conn = self.conn.clone();

        let (committed, reserved): (i64, i64) = self
            .commit_script
            .key(key.render())
            .arg(scan_glob(&ScanPattern::SupplierProduct(key.pair())))
            .arg(reservation.quantity.get())
            .arg(capacity.quantity)
            .arg(payload)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(command_failed)?;

        let reserved = u64::try_from(reserved).unwrap_or(0);
        if committed == 1 {
            Ok(CommitOutcome::Committed)
        } else {
            Ok(CommitOutcome::Rejected { reserved })
        }
    }

    /// Redis expires keys natively; nothing to do.
    async fn evict_expired(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockhold_core::{ProductId, SupplierId};

    #[test]
    fn globs_follow_key_layout() {
        assert_eq!(scan_glob(&ScanPattern::All), "key_*");
        assert_eq!(
            scan_glob(&ScanPattern::for_pair(SupplierId::new(2), ProductId::new(3))),
            "key_*_2_3"
        );
    }

    #[test]
    fn ttl_is_at_least_one_millisecond() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2_000);
    }
}
