//! Error types shared by the ingestion pipeline

use thiserror::Error;

/// A message that could not be turned into a batch. The message is dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to inflate payload: {0}")]
    Inflate(#[from] std::io::Error),
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("Bad value for column '{column}': {value}")]
    BadValue { column: &'static str, value: String },
}

/// A failed read or write against the persistent store.
/// Aborts only the unit of work that issued it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Conversion error: {0}")]
    Conversion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError::MissingColumn("price");
        assert!(err.to_string().contains("price"));

        let err = StoreError::Conversion("test".to_string());
        assert!(err.to_string().contains("Conversion error"));
    }
}
