//! Handover recipient link model
//!
//! One row per (note, recipient) pair, with its own ID and timestamps. The
//! link is what recipient-side queries page over, so its `created_at` is the
//! "received at" ordering key and must survive recipient reconciliation.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE handover_recipients (
//!     id BIGSERIAL PRIMARY KEY,
//!     handover_note_id BIGINT NOT NULL REFERENCES handover_notes(id),
//!     recipient_id UUID NOT NULL REFERENCES users(id),
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     UNIQUE (handover_note_id, recipient_id)
//! );
//! ```
//!
//! The note foreign key deliberately has no `ON DELETE CASCADE`: links are
//! removed by the aggregate service before the note.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted recipient link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HandoverRecipient {
    /// Store-assigned link ID
    pub id: i64,

    /// Note this link belongs to
    pub handover_note_id: i64,

    /// User the note was addressed to
    pub recipient_id: Uuid,

    /// When the recipient was added to the note
    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Recipient link that has not been persisted yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHandoverRecipient {
    pub handover_note_id: i64,
    pub recipient_id: Uuid,
}

/// Recipient display name tagged with the note it belongs to
///
/// Row shape of the batched name lookup used by author-side listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NoteRecipientName {
    pub handover_note_id: i64,
    pub username: String,
}

impl HandoverRecipient {
    /// Builds a new, unsaved link between a note and a recipient
    pub fn create(handover_note_id: i64, recipient_id: Uuid) -> NewHandoverRecipient {
        NewHandoverRecipient {
            handover_note_id,
            recipient_id,
        }
    }

    /// Builds one unsaved link per recipient, keeping the given order
    pub fn create_all(handover_note_id: i64, recipient_ids: &[Uuid]) -> Vec<NewHandoverRecipient> {
        recipient_ids
            .iter()
            .map(|recipient_id| Self::create(handover_note_id, *recipient_id))
            .collect()
    }
}

/// Removes repeated recipient ids, keeping the first occurrence of each
pub fn distinct_recipient_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Minimal set of link changes that turns one recipient set into another
///
/// Recipients present on both sides are untouched, which keeps their link
/// ID and `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientDiff {
    /// Recipients whose links must be deleted, in stored link order
    pub to_remove: Vec<Uuid>,

    /// Recipients that need a new link, in requested order
    pub to_add: Vec<Uuid>,
}

impl RecipientDiff {
    /// Computes the diff from the currently linked recipients to the desired ones
    ///
    /// Duplicates in `desired` collapse to a single link.
    pub fn between(existing: &[Uuid], desired: &[Uuid]) -> Self {
        let existing_set: HashSet<Uuid> = existing.iter().copied().collect();
        let desired = distinct_recipient_ids(desired);
        let desired_set: HashSet<Uuid> = desired.iter().copied().collect();

        let to_remove = distinct_recipient_ids(existing)
            .into_iter()
            .filter(|id| !desired_set.contains(id))
            .collect();
        let to_add = desired
            .into_iter()
            .filter(|id| !existing_set.contains(id))
            .collect();

        Self { to_remove, to_add }
    }

    /// True when the recipient set already matches
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}
