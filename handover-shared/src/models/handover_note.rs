//! Handover note model
//!
//! A handover note is a work-transition memo with one author, a title and a
//! body. Recipients are not stored on the note itself; they live in
//! [`super::handover_recipient`] as first-class link rows.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE handover_notes (
//!     id BIGSERIAL PRIMARY KEY,
//!     author_id UUID NOT NULL REFERENCES users(id),
//!     title TEXT,
//!     content TEXT,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! # Lifecycle
//!
//! - Built with [`HandoverNote::create`], which returns an unsaved
//!   [`NewHandoverNote`] (no id, no timestamps)
//! - Persisted by a [`crate::store::NoteStore`], which assigns id and timestamps
//! - Changed only through [`HandoverNote::update`]; the author never changes
//!
//! # Example
//!
//! ```
//! use handover_shared::models::handover_note::HandoverNote;
//! use uuid::Uuid;
//!
//! let author_id = Uuid::new_v4();
//! let draft = HandoverNote::create(
//!     author_id,
//!     Some("Vacation handover".to_string()),
//!     Some("Pending tickets are listed below.".to_string()),
//! );
//!
//! assert_eq!(draft.author_id, author_id);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserProfile;

/// Persisted handover note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HandoverNote {
    /// Store-assigned note ID
    pub id: i64,

    /// Author's user ID
    ///
    /// Fixed at creation. `update` leaves it untouched.
    pub author_id: Uuid,

    /// Title; empty and absent are both accepted
    pub title: Option<String>,

    /// Body text; empty and absent are both accepted
    pub content: Option<String>,

    /// Set by the store on insert
    pub created_at: DateTime<Utc>,

    /// Set by the store on insert and on every update
    pub updated_at: DateTime<Utc>,
}

/// Handover note that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHandoverNote {
    pub author_id: Uuid,
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Handover note with its author's directory record resolved eagerly
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoverNoteWithAuthor {
    pub note: HandoverNote,
    pub author: UserProfile,
}

impl HandoverNote {
    /// Builds a new, unsaved handover note
    ///
    /// No business validation happens here; empty or missing title and
    /// content are legal at this level.
    pub fn create(
        author_id: Uuid,
        title: Option<String>,
        content: Option<String>,
    ) -> NewHandoverNote {
        NewHandoverNote {
            author_id,
            title,
            content,
        }
    }

    /// Replaces title and content in place
    ///
    /// Both fields are overwritten, so pass the current value to keep one of
    /// them. Timestamps are left for the store to bump.
    pub fn update(&mut self, title: Option<String>, content: Option<String>) {
        self.title = title;
        self.content = content;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted(author_id: Uuid) -> HandoverNote {
        let now = Utc::now();
        HandoverNote {
            id: 1,
            author_id,
            title: Some("Vacation handover".to_string()),
            content: Some("Tasks to handle while I am away.".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_keeps_fields() {
        let author_id = Uuid::new_v4();
        let draft = HandoverNote::create(
            author_id,
            Some("Project handover".to_string()),
            Some("Status and open issues.".to_string()),
        );

        assert_eq!(draft.author_id, author_id);
        assert_eq!(draft.title.as_deref(), Some("Project handover"));
        assert_eq!(draft.content.as_deref(), Some("Status and open issues."));
    }

    #[test]
    fn test_create_accepts_empty_and_missing_text() {
        let draft = HandoverNote::create(Uuid::new_v4(), Some(String::new()), None);
        assert_eq!(draft.title.as_deref(), Some(""));
        assert!(draft.content.is_none());
    }

    #[test]
    fn test_update_replaces_title_and_content() {
        let mut note = persisted(Uuid::new_v4());
        note.update(Some("Edited title".to_string()), Some("Edited body".to_string()));

        assert_eq!(note.title.as_deref(), Some("Edited title"));
        assert_eq!(note.content.as_deref(), Some("Edited body"));
    }

    #[test]
    fn test_update_to_none() {
        let mut note = persisted(Uuid::new_v4());
        note.update(None, None);

        assert!(note.title.is_none());
        assert!(note.content.is_none());
    }

    #[test]
    fn test_update_never_changes_author_or_identity() {
        let author_id = Uuid::new_v4();
        let mut note = persisted(author_id);
        let created_at = note.created_at;

        note.update(Some("Another".to_string()), None);

        assert_eq!(note.id, 1);
        assert_eq!(note.author_id, author_id);
        assert_eq!(note.created_at, created_at);
    }
}
