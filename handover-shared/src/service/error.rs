//! Handover service errors

use uuid::Uuid;

use crate::store::StoreError;

/// Errors returned by the aggregate and query services
#[derive(Debug, thiserror::Error)]
pub enum HandoverError {
    /// A note or user id did not resolve
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A write inside an aggregate transaction failed; nothing was applied
    #[error("Handover write rolled back: {0}")]
    Consistency(#[source] StoreError),

    /// A read failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HandoverError {
    pub fn note_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Handover note",
            id: id.to_string(),
        }
    }

    pub fn user_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "User",
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for handover service operations
pub type HandoverResult<T> = Result<T, HandoverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        assert_eq!(
            HandoverError::note_not_found(42).to_string(),
            "Handover note not found: 42"
        );

        let id = Uuid::new_v4();
        let err = HandoverError::user_not_found(id);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), format!("User not found: {}", id));
    }

    #[test]
    fn test_store_error_conversion() {
        let err: HandoverError = StoreError::Unavailable("down".to_string()).into();
        assert!(matches!(err, HandoverError::Store(_)));
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Store unavailable: down");
    }

    #[test]
    fn test_consistency_display() {
        let err = HandoverError::Consistency(StoreError::Unavailable("disk".to_string()));
        assert_eq!(
            err.to_string(),
            "Handover write rolled back: Store unavailable: disk"
        );
    }
}
