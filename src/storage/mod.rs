//! Persistence for trained model artifacts.
//!
//! Models are stored in a Sled embedded database keyed by scenario name.
//! File checkpoints for single models live in `nn::checkpoint`.

mod model_store;

pub use model_store::ModelStore;

/// Storage error types
#[derive(Debug)]
pub enum StorageError {
    /// Sled database error
    Database(sled::Error),
    /// Serialization error
    Serialization(serde_json::Error),
    /// Stored artifact failed its consistency check
    Corrupt { key: String, reason: String },
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Database error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Corrupt { key, reason } => write!(f, "Corrupt artifact at '{}': {}", key, reason),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err)
    }
}
