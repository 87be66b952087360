use std::error::Error;

use derive_more::Display;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum LiquidityError {
    #[display("ErrorInvalidAmount")]
    InvalidAmount,

    #[display("ErrorOverflow")]
    Overflow,

    #[display("Ledger error: {_0}")]
    Ledger(String),

    #[display("Timed out: {_0}")]
    Timeout(String),

    #[display("Malformed deposit record: {_0}")]
    MalformedRecord(String),

    #[display("Storage error: {_0}")]
    Storage(String),

    #[display("Config error: {_0}")]
    Config(String),
}

impl From<rocksdb::Error> for LiquidityError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for LiquidityError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(format!("Failed to (de)serialize: {e}"))
    }
}

impl Error for LiquidityError {}
