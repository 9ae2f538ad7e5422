//! PhonePe gateway integration: wire types, integrity headers, transaction
//! identifiers, and the outbound HTTP client.

pub mod client;
pub mod signer;
pub mod txn_id;
pub mod types;

/// Pay endpoint path, also the path component of the pay checksum
pub const PAY_PATH: &str = "/pg/v1/pay";

/// Status endpoint path prefix; full path is `{prefix}/{merchantId}/{txnId}`
pub const STATUS_PATH_PREFIX: &str = "/pg/v1/status";
