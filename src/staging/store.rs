//! Pending-booking staging store
//!
//! A pending booking bridges the redirect round-trip to the gateway: the
//! full booking payload is keyed by transaction ID so the server-to-server
//! callback can recover it without any browser state. Logical expiry is
//! judged against the record's own `expires_at`; the Redis TTL runs longer
//! by a grace window so an expired record still answers "expired" rather
//! than "not found" until it is garbage-collected.

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;

use crate::staging::error::{StagingError, StagingResult};
use crate::staging::keys::PendingBookingKey;
use crate::staging::RedisPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Staged,
    Promoted,
    Failed,
}

impl fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingStatus::Staged => write!(f, "staged"),
            PendingStatus::Promoted => write!(f, "promoted"),
            PendingStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingBooking {
    pub transaction_id: String,
    pub booking_data: JsonValue,
    /// Epoch seconds
    pub created_at: i64,
    /// Epoch seconds; reads at or after this instant are expired
    pub expires_at: i64,
    pub status: PendingStatus,
}

impl PendingBooking {
    pub fn new(transaction_id: impl Into<String>, booking_data: JsonValue, ttl_secs: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            transaction_id: transaction_id.into(),
            booking_data,
            created_at: now,
            expires_at: now + ttl_secs as i64,
            status: PendingStatus::Staged,
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Result of looking up a staged booking
#[derive(Debug)]
pub enum StagedLookup {
    Found(PendingBooking),
    /// The record outlived its logical TTL; callers must treat this as gone
    /// even though the payload is still physically present
    Expired(PendingBooking),
    NotFound,
    /// The stored payload is unparseable and needs manual cleanup
    Corrupted {
        transaction_id: String,
        reason: String,
    },
}

#[async_trait]
pub trait PendingBookingStore: Send + Sync {
    async fn stage(&self, record: &PendingBooking) -> StagingResult<()>;

    async fn get(&self, transaction_id: &str) -> StagingResult<StagedLookup>;

    /// Transition a live record's status. Returns false when the record is
    /// missing, unreadable, or the transition is not allowed (promotion is
    /// one-way: a promoted record never goes back).
    async fn update_status(
        &self,
        transaction_id: &str,
        status: PendingStatus,
    ) -> StagingResult<bool>;

    async fn remove(&self, transaction_id: &str) -> StagingResult<()>;
}

/// Interpret a raw stored payload. The literal strings `undefined` and
/// `null` show up when a buggy writer stringifies a missing value; both are
/// corruption, not valid JSON.
fn parse_lookup(raw: &str, transaction_id: &str, now: i64) -> StagedLookup {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "undefined" || trimmed == "null" {
        return StagedLookup::Corrupted {
            transaction_id: transaction_id.to_string(),
            reason: format!("stored payload is the literal {:?}", trimmed),
        };
    }

    let record: PendingBooking = match serde_json::from_str(trimmed) {
        Ok(record) => record,
        Err(e) => {
            return StagedLookup::Corrupted {
                transaction_id: transaction_id.to_string(),
                reason: format!("stored payload is not a pending booking: {}", e),
            }
        }
    };

    match &record.booking_data {
        JsonValue::Null => {
            return StagedLookup::Corrupted {
                transaction_id: transaction_id.to_string(),
                reason: "booking data is null".to_string(),
            }
        }
        JsonValue::String(s) if s == "undefined" || s == "null" => {
            return StagedLookup::Corrupted {
                transaction_id: transaction_id.to_string(),
                reason: format!("booking data is the literal {:?}", s),
            }
        }
        _ => {}
    }

    if record.is_expired_at(now) {
        StagedLookup::Expired(record)
    } else {
        StagedLookup::Found(record)
    }
}

pub struct RedisPendingBookingStore {
    pool: RedisPool,
    gc_grace_secs: u64,
}

impl RedisPendingBookingStore {
    pub fn new(pool: RedisPool, gc_grace_secs: u64) -> Self {
        Self {
            pool,
            gc_grace_secs,
        }
    }

    fn physical_ttl(&self, record: &PendingBooking) -> u64 {
        let remaining = (record.expires_at - Utc::now().timestamp()).max(0) as u64;
        (remaining + self.gc_grace_secs).max(1)
    }
}

#[async_trait]
impl PendingBookingStore for RedisPendingBookingStore {
    async fn stage(&self, record: &PendingBooking) -> StagingResult<()> {
        let key = PendingBookingKey::new(&record.transaction_id).to_string();
        let payload = serde_json::to_string(record)?;
        let ttl = self.physical_ttl(record);

        let mut conn = self.pool.get().await?;
        let _: () = conn.set_ex(&key, payload, ttl).await?;
        Ok(())
    }

    async fn get(&self, transaction_id: &str) -> StagingResult<StagedLookup> {
        let key = PendingBookingKey::new(transaction_id).to_string();
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(&key).await?;

        Ok(match raw {
            Some(raw) => parse_lookup(&raw, transaction_id, Utc::now().timestamp()),
            None => StagedLookup::NotFound,
        })
    }

    async fn update_status(
        &self,
        transaction_id: &str,
        status: PendingStatus,
    ) -> StagingResult<bool> {
        let key = PendingBookingKey::new(transaction_id).to_string();
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(&key).await?;

        let Some(raw) = raw else { return Ok(false) };
        let Ok(mut record) = serde_json::from_str::<PendingBooking>(&raw) else {
            return Ok(false);
        };
        if record.status == PendingStatus::Promoted {
            return Ok(false);
        }

        record.status = status;
        let payload = serde_json::to_string(&record)?;
        let ttl = self.physical_ttl(&record);
        let _: () = conn.set_ex(&key, payload, ttl).await?;
        Ok(true)
    }

    async fn remove(&self, transaction_id: &str) -> StagingResult<()> {
        let key = PendingBookingKey::new(transaction_id).to_string();
        let mut conn = self.pool.get().await?;
        let _: () = conn.del(&key).await?;
        Ok(())
    }
}

/// In-memory store with the same contract as the Redis implementation.
/// Used by tests and by `SKIP_EXTERNALS=true` runs.
#[derive(Default)]
pub struct InMemoryPendingBookingStore {
    records: RwLock<HashMap<String, String>>,
}

impl InMemoryPendingBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a raw payload, bypassing serialization. Lets tests exercise
    /// the corruption paths.
    pub async fn stage_raw(&self, transaction_id: &str, raw: &str) {
        self.records
            .write()
            .await
            .insert(transaction_id.to_string(), raw.to_string());
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl PendingBookingStore for InMemoryPendingBookingStore {
    async fn stage(&self, record: &PendingBooking) -> StagingResult<()> {
        let payload = serde_json::to_string(record)?;
        self.records
            .write()
            .await
            .insert(record.transaction_id.clone(), payload);
        Ok(())
    }

    async fn get(&self, transaction_id: &str) -> StagingResult<StagedLookup> {
        let records = self.records.read().await;
        Ok(match records.get(transaction_id) {
            Some(raw) => parse_lookup(raw, transaction_id, Utc::now().timestamp()),
            None => StagedLookup::NotFound,
        })
    }

    async fn update_status(
        &self,
        transaction_id: &str,
        status: PendingStatus,
    ) -> StagingResult<bool> {
        let mut records = self.records.write().await;
        let Some(raw) = records.get(transaction_id) else {
            return Ok(false);
        };
        let Ok(mut record) = serde_json::from_str::<PendingBooking>(raw) else {
            return Ok(false);
        };
        if record.status == PendingStatus::Promoted {
            return Ok(false);
        }

        record.status = status;
        let payload = serde_json::to_string(&record)?;
        records.insert(transaction_id.to_string(), payload);
        Ok(true)
    }

    async fn remove(&self, transaction_id: &str) -> StagingResult<()> {
        self.records.write().await.remove(transaction_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn booking_payload() -> JsonValue {
        json!({
            "parent": {"name": "Priya", "email": "priya@example.com"},
            "child": {"name": "Aarav", "dob": "2022-04-01"},
            "games": [{"id": 7, "slot": "10:00"}],
            "promo_code": null
        })
    }

    #[tokio::test]
    async fn round_trip_returns_identical_data() {
        let store = InMemoryPendingBookingStore::new();
        let record = PendingBooking::new("NIBOG_42_1700000000000", booking_payload(), 900);
        store.stage(&record).await.unwrap();

        match store.get("NIBOG_42_1700000000000").await.unwrap() {
            StagedLookup::Found(found) => {
                assert_eq!(found.booking_data, booking_payload());
                assert_eq!(found.status, PendingStatus::Staged);
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn expired_records_answer_expired_not_the_data() {
        let store = InMemoryPendingBookingStore::new();
        let mut record = PendingBooking::new("NIBOG_42_1700000000000", booking_payload(), 900);
        record.expires_at = Utc::now().timestamp() - 10;
        store.stage(&record).await.unwrap();

        assert!(matches!(
            store.get("NIBOG_42_1700000000000").await.unwrap(),
            StagedLookup::Expired(_)
        ));
    }

    #[tokio::test]
    async fn unknown_transaction_ids_are_not_found() {
        let store = InMemoryPendingBookingStore::new();
        assert!(matches!(
            store.get("NIBOG_999_1700000000000").await.unwrap(),
            StagedLookup::NotFound
        ));
    }

    #[tokio::test]
    async fn literal_undefined_and_null_are_corruption() {
        let store = InMemoryPendingBookingStore::new();
        store.stage_raw("txn_a", "undefined").await;
        store.stage_raw("txn_b", "null").await;
        store.stage_raw("txn_c", "{not json").await;

        for txn in ["txn_a", "txn_b", "txn_c"] {
            assert!(
                matches!(
                    store.get(txn).await.unwrap(),
                    StagedLookup::Corrupted { .. }
                ),
                "{} should be corrupted",
                txn
            );
        }
    }

    #[tokio::test]
    async fn null_booking_data_is_corruption() {
        let store = InMemoryPendingBookingStore::new();
        let record = PendingBooking::new("NIBOG_7_1700000000000", JsonValue::Null, 900);
        store.stage(&record).await.unwrap();

        assert!(matches!(
            store.get("NIBOG_7_1700000000000").await.unwrap(),
            StagedLookup::Corrupted { .. }
        ));
    }

    #[tokio::test]
    async fn promotion_is_one_way() {
        let store = InMemoryPendingBookingStore::new();
        let record = PendingBooking::new("NIBOG_42_1700000000000", booking_payload(), 900);
        store.stage(&record).await.unwrap();

        assert!(store
            .update_status("NIBOG_42_1700000000000", PendingStatus::Promoted)
            .await
            .unwrap());
        // A second claim must lose
        assert!(!store
            .update_status("NIBOG_42_1700000000000", PendingStatus::Promoted)
            .await
            .unwrap());
        assert!(!store
            .update_status("NIBOG_42_1700000000000", PendingStatus::Failed)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn update_status_on_missing_record_returns_false() {
        let store = InMemoryPendingBookingStore::new();
        assert!(!store
            .update_status("NIBOG_404_1700000000000", PendingStatus::Failed)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn remove_deletes_the_record() {
        let store = InMemoryPendingBookingStore::new();
        let record = PendingBooking::new("NIBOG_42_1700000000000", booking_payload(), 900);
        store.stage(&record).await.unwrap();
        store.remove("NIBOG_42_1700000000000").await.unwrap();

        assert!(matches!(
            store.get("NIBOG_42_1700000000000").await.unwrap(),
            StagedLookup::NotFound
        ));
        assert_eq!(store.len().await, 0);
    }
}
