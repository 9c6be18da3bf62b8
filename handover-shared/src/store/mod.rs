//! Persistence contracts for handover notes and their recipient links
//!
//! The aggregate and query services are written against these traits, not
//! against a concrete database:
//!
//! - [`NoteStore`]: the note aggregate root
//! - [`RecipientStore`]: note-to-recipient links and batched name lookups
//! - [`UserDirectory`]: read-only user lookups
//! - [`HandoverDatabase`]: hands out read sessions and write transactions
//!
//! Every operation takes `&mut self` because a session wraps a single
//! connection (or a single transaction). A write transaction is only made
//! durable by [`Commit::commit`]; dropping it rolls everything back.
//!
//! # Implementations
//!
//! - [`postgres::PgHandoverDatabase`]: PostgreSQL via sqlx
//! - [`memory::MemoryHandoverDatabase`]: in-memory, for tests and local runs
//!
//! # Name collisions
//!
//! `save` and `count` exist on both store traits. Session types implement
//! both, so call them with the trait path, e.g. `NoteStore::count(&mut tx)`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    models::{
        handover_note::{HandoverNote, HandoverNoteWithAuthor, NewHandoverNote},
        handover_recipient::{HandoverRecipient, NewHandoverRecipient, NoteRecipientName},
        user::UserProfile,
    },
    pagination::{Page, PageRequest},
};

pub mod memory;
pub mod postgres;

/// Errors raised by store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database driver or query error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backing store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Write rejected by a key, uniqueness or reference constraint
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Note aggregate persistence
#[async_trait]
pub trait NoteStore: Send {
    /// Inserts a new note; the store assigns id, `created_at` and `updated_at`
    async fn save(&mut self, note: NewHandoverNote) -> StoreResult<HandoverNote>;

    /// Persists title and content of an existing note and bumps `updated_at`
    ///
    /// The author column is never written. Returns None if the note is gone.
    async fn update(&mut self, note: &HandoverNote) -> StoreResult<Option<HandoverNote>>;

    async fn find_by_id(&mut self, id: i64) -> StoreResult<Option<HandoverNote>>;

    /// Like `find_by_id`, but locks the row until the transaction ends
    async fn find_by_id_for_update(&mut self, id: i64) -> StoreResult<Option<HandoverNote>>;

    /// Loads a note with its author's directory record
    async fn find_by_id_with_author(&mut self, id: i64)
        -> StoreResult<Option<HandoverNoteWithAuthor>>;

    /// Loads many notes with their authors in one round trip
    ///
    /// Unknown ids are skipped; result order is unspecified.
    async fn find_all_by_ids_with_author(
        &mut self,
        ids: &[i64],
    ) -> StoreResult<Vec<HandoverNoteWithAuthor>>;

    /// Notes written by `author_id`, newest first
    async fn find_by_author_id(
        &mut self,
        author_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<HandoverNote>>;

    /// Deletes a note row; returns false if it did not exist
    ///
    /// Links must already be gone; the store does not cascade.
    async fn delete_by_id(&mut self, id: i64) -> StoreResult<bool>;

    /// Deletes the given note
    async fn delete(&mut self, note: &HandoverNote) -> StoreResult<bool> {
        self.delete_by_id(note.id).await
    }

    async fn exists_by_id(&mut self, id: i64) -> StoreResult<bool>;

    async fn count(&mut self) -> StoreResult<i64>;
}

/// Recipient link persistence
#[async_trait]
pub trait RecipientStore: Send {
    async fn save(&mut self, link: NewHandoverRecipient) -> StoreResult<HandoverRecipient>;

    /// Inserts many links in one batch, returning them in input order
    async fn save_all(
        &mut self,
        links: Vec<NewHandoverRecipient>,
    ) -> StoreResult<Vec<HandoverRecipient>>;

    /// Links addressed to `recipient_id`, newest link first
    async fn find_by_recipient_id(
        &mut self,
        recipient_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<HandoverRecipient>>;

    /// All links of a note in insertion order
    async fn find_all_by_handover_note_id(
        &mut self,
        note_id: i64,
    ) -> StoreResult<Vec<HandoverRecipient>>;

    /// Recipient display names of a note in link insertion order
    async fn find_recipient_names_by_handover_note_id(
        &mut self,
        note_id: i64,
    ) -> StoreResult<Vec<String>>;

    /// Recipient display names for many notes in a single query
    ///
    /// Every row is tagged with the note it belongs to. Rows are grouped by
    /// note and ordered by link insertion within a note.
    async fn find_recipient_usernames_by_note_ids(
        &mut self,
        note_ids: &[i64],
    ) -> StoreResult<Vec<NoteRecipientName>>;

    /// Deletes the links of `note_id` addressed to any of `recipient_ids`
    ///
    /// An empty id list or no matching rows is a no-op.
    async fn delete_by_note_id_and_recipient_ids(
        &mut self,
        note_id: i64,
        recipient_ids: &[Uuid],
    ) -> StoreResult<u64>;

    /// Deletes every link of a note
    async fn delete_by_handover_note_id(&mut self, note_id: i64) -> StoreResult<u64>;

    async fn count(&mut self) -> StoreResult<i64>;
}

/// Read-only view of the user directory
#[async_trait]
pub trait UserDirectory: Send {
    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<UserProfile>>;

    /// Looks up many users at once; unknown ids are simply absent
    async fn find_users(&mut self, ids: &[Uuid]) -> StoreResult<Vec<UserProfile>>;
}

/// Makes a write transaction durable
#[async_trait]
pub trait Commit: Send {
    async fn commit(self) -> StoreResult<()>;
}

/// Entry point to a handover persistence backend
#[async_trait]
pub trait HandoverDatabase: Clone + Send + Sync + 'static {
    /// Non-transactional session for reads
    type Session: NoteStore + RecipientStore + UserDirectory + Send;

    /// Transaction for aggregate writes
    type Transaction: NoteStore + RecipientStore + UserDirectory + Commit + Send;

    async fn session(&self) -> StoreResult<Self::Session>;

    async fn begin(&self) -> StoreResult<Self::Transaction>;

    /// Liveness check used by `/health`
    async fn ping(&self) -> StoreResult<()>;
}
