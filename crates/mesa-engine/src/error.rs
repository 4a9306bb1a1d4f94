//! # Engine Error Types
//!
//! What service callers see. Collapses the core and database taxonomies
//! into four buckets a surface can map directly onto responses:
//! validation (client error), not-found, state conflict, internal.

use thiserror::Error;

use mesa_core::{StateConflict, ValidationError};
use mesa_db::DbError;

/// Service-level errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any mutation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation is legal but not from the entity's current state.
    #[error(transparent)]
    Conflict(#[from] StateConflict),

    /// Persistence failure not attributable to the caller.
    #[error("storage error: {0}")]
    Storage(DbError),
}

impl EngineError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Storage(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
