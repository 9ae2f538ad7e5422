//! Transaction identifier generation
//!
//! Format `NIBOG_{bookingId}_{epochMillis}`, hard-capped at the gateway's
//! 38-character limit. Not a cryptographic nonce: uniqueness rests on the
//! millisecond timestamp plus booking-id entropy, and a fresh payment
//! attempt always gets a fresh ID.

use std::time::{SystemTime, UNIX_EPOCH};

pub const TXN_PREFIX: &str = "NIBOG_";

/// Gateway-imposed maximum length for merchant transaction ids
pub const MAX_TXN_ID_LEN: usize = 38;

/// Number of booking-id characters kept when the full id would not fit
const TRUNCATED_BOOKING_ID_LEN: usize = 6;

pub fn generate_transaction_id(booking_id: &str) -> String {
    let now_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    generate_transaction_id_at(booking_id, now_millis)
}

/// Deterministic variant with the clock passed in. Truncation preserves the
/// prefix and the timestamp over the booking-id fragment.
pub fn generate_transaction_id_at(booking_id: &str, epoch_millis: u64) -> String {
    let candidate = format!("{}{}_{}", TXN_PREFIX, booking_id, epoch_millis);
    if candidate.len() <= MAX_TXN_ID_LEN {
        return candidate;
    }

    let tail: String = booking_id
        .chars()
        .rev()
        .take(TRUNCATED_BOOKING_ID_LEN)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}{}_{}", TXN_PREFIX, tail, epoch_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MILLIS: u64 = 1_700_000_000_000;

    #[test]
    fn short_booking_ids_embed_in_full() {
        let id = generate_transaction_id_at("42", MILLIS);
        assert_eq!(id, "NIBOG_42_1700000000000");
        assert!(id.len() <= MAX_TXN_ID_LEN);
    }

    #[test]
    fn long_booking_ids_truncate_to_last_six() {
        let id = generate_transaction_id_at("9876543210987654321098765432109", MILLIS);
        assert_eq!(id, "NIBOG_432109_1700000000000");
        assert!(id.len() <= MAX_TXN_ID_LEN);
    }

    #[test]
    fn never_exceeds_gateway_limit() {
        let long_id = "1".repeat(500);
        for len in 1..=500 {
            let id = generate_transaction_id_at(&long_id[..len], MILLIS);
            assert!(
                id.len() <= MAX_TXN_ID_LEN,
                "len {} produced {} chars",
                len,
                id.len()
            );
            assert!(id.starts_with(TXN_PREFIX));
            assert!(id.ends_with("_1700000000000"));
        }
    }

    #[test]
    fn system_clock_variant_respects_limit() {
        let id = generate_transaction_id("12345678901234567890");
        assert!(id.len() <= MAX_TXN_ID_LEN);
        assert!(id.starts_with(TXN_PREFIX));
    }
}
