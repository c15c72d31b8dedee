//! Relational table provider trait and implementations
//!
//! Rows are passed as `serde_json::Value` so the trait stays object-safe;
//! callers serialize their typed records with [`to_row`].

mod postgrest;

pub use postgrest::SupabaseTables;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::api::error::ApiError;

/// Trait for table-oriented backends
#[async_trait]
pub trait TableProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Insert a row, discarding the result
    async fn insert(&self, table: &str, record: Value) -> Result<(), ApiError>;

    /// Insert a single row and return it as stored (including generated ids)
    async fn insert_returning(&self, table: &str, record: Value) -> Result<Value, ApiError>;

    /// Select every row whose `column` equals `value`
    async fn select_eq(&self, table: &str, column: &str, value: &str)
        -> Result<Vec<Value>, ApiError>;
}

/// Serialize a typed record into a row
pub fn to_row<T: Serialize>(service: &str, record: &T) -> Result<Value, ApiError> {
    serde_json::to_value(record).map_err(|e| ApiError::parse(service, e.to_string()))
}
