//! Type-safe staging key builders

use std::fmt;

pub const VERSION: &str = "v1";
pub const NAMESPACE: &str = "booking";

#[derive(Debug, Clone)]
pub struct PendingBookingKey {
    pub transaction_id: String,
}

impl PendingBookingKey {
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
        }
    }
}

impl fmt::Display for PendingBookingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:pending:{}",
            VERSION, NAMESPACE, self.transaction_id
        )
    }
}
