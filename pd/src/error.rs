//! Document error types

use thiserror::Error;

/// Errors raised while loading or editing a prompt document
///
/// Composition itself never fails; these only come from the document layer.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("JSON is missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Card not found: {id}")]
    CardNotFound { id: String },

    #[error("Card {id} is locked and cannot be {action}")]
    LockedCard { id: String, action: &'static str },

    #[error("Card id {id} is already in use")]
    DuplicateId { id: String },

    #[error("Content is {len} characters, limit is {max}")]
    ContentTooLong { len: usize, max: usize },
}

impl DocumentError {
    /// Check if this error was caused by user input rather than I/O or parsing
    pub fn is_edit_rejection(&self) -> bool {
        matches!(
            self,
            DocumentError::LockedCard { .. } | DocumentError::DuplicateId { .. } | DocumentError::ContentTooLong { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = DocumentError::MissingField { field: "prompt_cards" };
        assert!(err.to_string().contains("prompt_cards"));
    }

    #[test]
    fn test_locked_card_message() {
        let err = DocumentError::LockedCard {
            id: "persona".to_string(),
            action: "deleted",
        };
        let msg = err.to_string();
        assert!(msg.contains("persona"));
        assert!(msg.contains("deleted"));
    }

    #[test]
    fn test_is_edit_rejection() {
        assert!(DocumentError::ContentTooLong { len: 4001, max: 4000 }.is_edit_rejection());
        assert!(
            !DocumentError::CardNotFound {
                id: "x".to_string()
            }
            .is_edit_rejection()
        );
    }
}
