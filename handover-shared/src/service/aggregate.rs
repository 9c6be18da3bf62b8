//! Write side of the handover domain
//!
//! Every operation runs in one store transaction. An error on any step drops
//! the transaction, so a note is never left without its links and links never
//! outlive their note.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::error::{HandoverError, HandoverResult};
use crate::{
    models::{
        handover_note::HandoverNote,
        handover_recipient::{distinct_recipient_ids, HandoverRecipient, RecipientDiff},
    },
    store::{Commit, HandoverDatabase, NoteStore, RecipientStore, UserDirectory},
};

/// Input for creating a handover note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateHandover {
    pub author_id: Uuid,
    pub recipient_ids: Vec<Uuid>,
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Input for updating a handover note
///
/// `recipient_ids` is the complete desired recipient set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateHandover {
    /// Caller identity; recorded on the span, not checked against the note
    pub author_id: Uuid,
    pub recipient_ids: Vec<Uuid>,
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Creates, updates and deletes handover notes
#[derive(Debug, Clone)]
pub struct HandoverService<D> {
    db: D,
}

impl<D: HandoverDatabase> HandoverService<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    /// Creates a note and links it to every distinct recipient
    ///
    /// # Errors
    ///
    /// - `NotFound` if the author or any recipient is not in the directory
    /// - `Consistency` if a write fails; the note is rolled back with its links
    #[instrument(
        skip(self, command),
        fields(author_id = %command.author_id, recipients = command.recipient_ids.len())
    )]
    pub async fn create(&self, command: CreateHandover) -> HandoverResult<HandoverNote> {
        let recipient_ids = distinct_recipient_ids(&command.recipient_ids);

        let mut tx = self.db.begin().await?;

        let mut wanted = Vec::with_capacity(recipient_ids.len() + 1);
        wanted.push(command.author_id);
        wanted.extend_from_slice(&recipient_ids);
        ensure_users_exist(&mut tx, &wanted).await?;

        let draft = HandoverNote::create(command.author_id, command.title, command.content);
        let note = NoteStore::save(&mut tx, draft)
            .await
            .map_err(HandoverError::Consistency)?;

        let links = tx
            .save_all(HandoverRecipient::create_all(note.id, &recipient_ids))
            .await
            .map_err(HandoverError::Consistency)?;

        tx.commit().await.map_err(HandoverError::Consistency)?;

        info!(note_id = note.id, added = links.len(), "Handover note created");

        Ok(note)
    }

    /// Replaces title and content, then reconciles the recipient set
    ///
    /// Recipients that stay keep their existing link row (id and creation
    /// time). Only links for dropped recipients are deleted and only links for
    /// new recipients are inserted.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the note or any requested recipient does not exist
    /// - `Consistency` if a write fails; nothing is applied
    #[instrument(
        skip(self, command),
        fields(author_id = %command.author_id, recipients = command.recipient_ids.len())
    )]
    pub async fn update(
        &self,
        note_id: i64,
        command: UpdateHandover,
    ) -> HandoverResult<HandoverNote> {
        let mut tx = self.db.begin().await?;

        let mut note = tx
            .find_by_id_for_update(note_id)
            .await?
            .ok_or_else(|| HandoverError::note_not_found(note_id))?;

        let desired = distinct_recipient_ids(&command.recipient_ids);
        ensure_users_exist(&mut tx, &desired).await?;

        note.update(command.title, command.content);
        let note = NoteStore::update(&mut tx, &note)
            .await
            .map_err(HandoverError::Consistency)?
            .ok_or_else(|| HandoverError::note_not_found(note_id))?;

        let existing: Vec<Uuid> = tx
            .find_all_by_handover_note_id(note_id)
            .await
            .map_err(HandoverError::Consistency)?
            .into_iter()
            .map(|link| link.recipient_id)
            .collect();
        let diff = RecipientDiff::between(&existing, &desired);

        let (removed, added) = if diff.is_empty() {
            debug!(note_id, "Recipients unchanged");
            (0, 0)
        } else {
            let removed = tx
                .delete_by_note_id_and_recipient_ids(note_id, &diff.to_remove)
                .await
                .map_err(HandoverError::Consistency)?;
            let added = tx
                .save_all(HandoverRecipient::create_all(note_id, &diff.to_add))
                .await
                .map_err(HandoverError::Consistency)?;
            (removed, added.len())
        };

        tx.commit().await.map_err(HandoverError::Consistency)?;

        info!(
            note_id,
            added,
            removed,
            "Handover note updated"
        );

        Ok(note)
    }

    /// Deletes a note with all of its links
    ///
    /// Deleting an unknown id is not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, note_id: i64) -> HandoverResult<()> {
        let mut tx = self.db.begin().await?;

        let removed = tx
            .delete_by_handover_note_id(note_id)
            .await
            .map_err(HandoverError::Consistency)?;
        let existed = tx
            .delete_by_id(note_id)
            .await
            .map_err(HandoverError::Consistency)?;

        tx.commit().await.map_err(HandoverError::Consistency)?;

        info!(note_id, existed, removed, "Handover note deleted");

        Ok(())
    }
}

/// Fails with `NotFound` for the first id the directory does not know
async fn ensure_users_exist<S>(session: &mut S, ids: &[Uuid]) -> HandoverResult<()>
where
    S: UserDirectory,
{
    if ids.is_empty() {
        return Ok(());
    }

    let found: HashSet<Uuid> = session
        .find_users(ids)
        .await?
        .into_iter()
        .map(|user| user.id)
        .collect();

    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(HandoverError::user_not_found(*missing)),
        None => Ok(()),
    }
}
