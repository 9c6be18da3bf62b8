//! Read side of the handover domain
//!
//! Views are shaped for clients: author and recipient names are resolved,
//! timestamps are reported as `occurred_at` (note creation time), and list
//! views carry pagination metadata.
//!
//! Recipient names for a whole page and the notes behind a page of links
//! are each resolved with one batched store call.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::error::{HandoverError, HandoverResult};
use crate::{
    models::handover_note::HandoverNoteWithAuthor,
    pagination::{Page, PageRequest},
    store::{HandoverDatabase, NoteStore, RecipientStore, UserDirectory},
};

/// Pagination metadata attached to list views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub size: u32,
    pub total_page: i64,
    pub total_element: i64,
    pub first_page: bool,
    pub last_page: bool,
}

impl<T> From<&Page<T>> for PageMeta {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            size: page.size,
            total_page: page.total_pages,
            total_element: page.total_elements,
            first_page: page.first,
            last_page: page.last,
        }
    }
}

/// A note as listed for its author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorHandoverItem {
    pub handover_note_id: i64,
    pub author_name: String,
    /// In the order recipients were added
    pub recipient_names: Vec<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Notes written by one author, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorHandoverList {
    pub handover_notes: Vec<AuthorHandoverItem>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

/// A note as listed for one of its recipients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientHandoverItem {
    pub handover_id: i64,
    pub author_name: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Notes received by one user, most recently received first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientHandoverList {
    pub recipients: Vec<RecipientHandoverItem>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

/// Single note with author and recipient names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverDetail {
    pub handover_id: i64,
    pub author_name: String,
    pub recipient_names: Vec<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Builds list and detail views of handover notes
#[derive(Debug, Clone)]
pub struct HandoverQueryService<D> {
    db: D,
}

impl<D: HandoverDatabase> HandoverQueryService<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    /// Notes written by `author_id`, newest first, with recipient names
    #[instrument(skip(self))]
    pub async fn author_list(
        &self,
        author_id: Uuid,
        page: PageRequest,
    ) -> HandoverResult<AuthorHandoverList> {
        let mut session = self.db.session().await?;

        let notes = session.find_by_author_id(author_id, page).await?;
        let meta = PageMeta::from(&notes);

        if notes.is_empty() {
            debug!(total = meta.total_element, "No handover notes on page");
            return Ok(AuthorHandoverList {
                handover_notes: Vec::new(),
                meta,
            });
        }

        let author_name = session
            .find_user(author_id)
            .await?
            .ok_or_else(|| HandoverError::user_not_found(author_id))?
            .name;

        let note_ids: Vec<i64> = notes.items.iter().map(|note| note.id).collect();
        let mut names_by_note: HashMap<i64, Vec<String>> = HashMap::new();
        for row in session.find_recipient_usernames_by_note_ids(&note_ids).await? {
            names_by_note
                .entry(row.handover_note_id)
                .or_default()
                .push(row.username);
        }

        let handover_notes = notes
            .items
            .into_iter()
            .map(|note| AuthorHandoverItem {
                handover_note_id: note.id,
                author_name: author_name.clone(),
                recipient_names: names_by_note.remove(&note.id).unwrap_or_default(),
                title: note.title,
                content: note.content,
                occurred_at: note.created_at,
            })
            .collect::<Vec<_>>();

        debug!(
            count = handover_notes.len(),
            total = meta.total_element,
            "Listed sent handover notes"
        );

        Ok(AuthorHandoverList {
            handover_notes,
            meta,
        })
    }

    /// Notes addressed to `recipient_id`, most recently received first
    #[instrument(skip(self))]
    pub async fn recipient_list(
        &self,
        recipient_id: Uuid,
        page: PageRequest,
    ) -> HandoverResult<RecipientHandoverList> {
        let mut session = self.db.session().await?;

        let links = session.find_by_recipient_id(recipient_id, page).await?;
        let meta = PageMeta::from(&links);

        let note_ids: Vec<i64> = links
            .items
            .iter()
            .map(|link| link.handover_note_id)
            .collect();
        let notes: HashMap<i64, HandoverNoteWithAuthor> = session
            .find_all_by_ids_with_author(&note_ids)
            .await?
            .into_iter()
            .map(|found| (found.note.id, found))
            .collect();

        let recipients = links
            .items
            .iter()
            .filter_map(|link| notes.get(&link.handover_note_id))
            .map(|found| RecipientHandoverItem {
                handover_id: found.note.id,
                author_name: found.author.name.clone(),
                title: found.note.title.clone(),
                content: found.note.content.clone(),
                occurred_at: found.note.created_at,
            })
            .collect::<Vec<_>>();

        debug!(
            count = recipients.len(),
            total = meta.total_element,
            "Listed received handover notes"
        );

        Ok(RecipientHandoverList { recipients, meta })
    }

    /// One note with its author and recipient names
    ///
    /// # Errors
    ///
    /// `NotFound` if the note does not exist
    #[instrument(skip(self))]
    pub async fn detail(&self, note_id: i64) -> HandoverResult<HandoverDetail> {
        let mut session = self.db.session().await?;

        let found = session
            .find_by_id_with_author(note_id)
            .await?
            .ok_or_else(|| HandoverError::note_not_found(note_id))?;
        let recipient_names = session
            .find_recipient_names_by_handover_note_id(note_id)
            .await?;

        Ok(HandoverDetail {
            handover_id: found.note.id,
            author_name: found.author.name,
            recipient_names,
            title: found.note.title,
            content: found.note.content,
            occurred_at: found.note.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_view_flattens_page_meta() {
        let list = RecipientHandoverList {
            recipients: Vec::new(),
            meta: PageMeta::from(&Page::<i64>::empty(PageRequest::new(0, 10))),
        };

        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["recipients"], serde_json::json!([]));
        assert_eq!(json["page"], 0);
        assert_eq!(json["size"], 10);
        assert_eq!(json["total_page"], 0);
        assert_eq!(json["total_element"], 0);
        assert_eq!(json["first_page"], true);
        assert_eq!(json["last_page"], true);
    }
}
