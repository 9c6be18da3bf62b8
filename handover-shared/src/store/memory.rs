//! In-memory handover store for tests and local runs.
//!
//! The whole dataset sits behind one async mutex. A session holds the lock
//! for its lifetime, so sessions are serialized. Transactions work on a
//! private copy of the state that only replaces the shared one on commit.
//!
//! The store enforces the same constraints as the PostgreSQL schema: notes
//! need an existing author, links need an existing note and user, a note
//! cannot hold the same recipient twice, and a note with links cannot be
//! deleted.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    Commit, HandoverDatabase, NoteStore, RecipientStore, StoreError, StoreResult, UserDirectory,
};
use crate::{
    models::{
        handover_note::{HandoverNote, HandoverNoteWithAuthor, NewHandoverNote},
        handover_recipient::{HandoverRecipient, NewHandoverRecipient, NoteRecipientName},
        user::UserProfile,
    },
    pagination::{Page, PageRequest},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, UserProfile>,
    notes: BTreeMap<i64, HandoverNote>,
    links: BTreeMap<i64, HandoverRecipient>,
    last_note_id: i64,
    last_link_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Wall clock, forced strictly increasing
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next
    }

    fn with_author(&self, note: &HandoverNote) -> Option<HandoverNoteWithAuthor> {
        self.users
            .get(&note.author_id)
            .map(|author| HandoverNoteWithAuthor {
                note: note.clone(),
                author: author.clone(),
            })
    }

    fn insert_link(&mut self, link: NewHandoverRecipient) -> StoreResult<HandoverRecipient> {
        if !self.notes.contains_key(&link.handover_note_id) {
            return Err(StoreError::Constraint(format!(
                "handover note {} does not exist",
                link.handover_note_id
            )));
        }
        if !self.users.contains_key(&link.recipient_id) {
            return Err(StoreError::Constraint(format!(
                "user {} does not exist",
                link.recipient_id
            )));
        }
        let duplicate = self.links.values().any(|existing| {
            existing.handover_note_id == link.handover_note_id
                && existing.recipient_id == link.recipient_id
        });
        if duplicate {
            return Err(StoreError::Constraint(format!(
                "user {} is already a recipient of handover note {}",
                link.recipient_id, link.handover_note_id
            )));
        }

        self.last_link_id += 1;
        let now = self.tick();
        let saved = HandoverRecipient {
            id: self.last_link_id,
            handover_note_id: link.handover_note_id,
            recipient_id: link.recipient_id,
            created_at: now,
            updated_at: now,
        };
        self.links.insert(saved.id, saved.clone());
        Ok(saved)
    }
}

/// In-memory handover backend
#[derive(Debug, Clone, Default)]
pub struct MemoryHandoverDatabase {
    state: Arc<Mutex<MemoryState>>,
    fail_recipient_writes: Arc<AtomicBool>,
    fail_link_lookups: Arc<AtomicBool>,
}

impl MemoryHandoverDatabase {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a directory user and returns its profile
    pub async fn add_user(&self, name: impl Into<String>) -> UserProfile {
        let id = Uuid::new_v4();
        let name = name.into();
        let mut state = self.state.lock().await;
        let profile = UserProfile {
            id,
            email: format!("{}@example.com", id.simple()),
            employee_no: format!("EMP{:05}", state.users.len() + 1),
            name,
        };
        state.users.insert(id, profile.clone());
        profile
    }

    /// Makes every recipient link insert fail with [`StoreError::Unavailable`]
    pub fn fail_recipient_writes(&self, fail: bool) {
        self.fail_recipient_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `find_all_by_handover_note_id` fail with [`StoreError::Unavailable`]
    pub fn fail_link_lookups(&self, fail: bool) {
        self.fail_link_lookups.store(fail, Ordering::SeqCst);
    }

    async fn open(&self, transactional: bool) -> MemorySession {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = transactional.then(|| MemoryState::clone(&guard));
        MemorySession {
            guard,
            working,
            fail_recipient_writes: Arc::clone(&self.fail_recipient_writes),
            fail_link_lookups: Arc::clone(&self.fail_link_lookups),
        }
    }
}

/// Session over the in-memory dataset
///
/// Read sessions write straight through. Transactional sessions keep a
/// working copy; dropping one without [`Commit::commit`] discards it.
pub struct MemorySession {
    guard: OwnedMutexGuard<MemoryState>,
    working: Option<MemoryState>,
    fail_recipient_writes: Arc<AtomicBool>,
    fail_link_lookups: Arc<AtomicBool>,
}

impl MemorySession {
    fn state(&mut self) -> &mut MemoryState {
        match self.working.as_mut() {
            Some(working) => working,
            None => &mut *self.guard,
        }
    }

    fn check_recipient_writes(&self) -> StoreResult<()> {
        if self.fail_recipient_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "recipient writes are disabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl HandoverDatabase for MemoryHandoverDatabase {
    type Session = MemorySession;
    type Transaction = MemorySession;

    async fn session(&self) -> StoreResult<Self::Session> {
        Ok(self.open(false).await)
    }

    async fn begin(&self) -> StoreResult<Self::Transaction> {
        Ok(self.open(true).await)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl Commit for MemorySession {
    async fn commit(mut self) -> StoreResult<()> {
        if let Some(working) = self.working.take() {
            *self.guard = working;
        }
        Ok(())
    }
}

#[async_trait]
impl NoteStore for MemorySession {
    async fn save(&mut self, note: NewHandoverNote) -> StoreResult<HandoverNote> {
        let state = self.state();
        if !state.users.contains_key(&note.author_id) {
            return Err(StoreError::Constraint(format!(
                "user {} does not exist",
                note.author_id
            )));
        }

        state.last_note_id += 1;
        let now = state.tick();
        let saved = HandoverNote {
            id: state.last_note_id,
            author_id: note.author_id,
            title: note.title,
            content: note.content,
            created_at: now,
            updated_at: now,
        };
        state.notes.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn update(&mut self, note: &HandoverNote) -> StoreResult<Option<HandoverNote>> {
        let state = self.state();
        let now = state.tick();
        let Some(stored) = state.notes.get_mut(&note.id) else {
            return Ok(None);
        };

        stored.title = note.title.clone();
        stored.content = note.content.clone();
        stored.updated_at = now;
        Ok(Some(stored.clone()))
    }

    async fn find_by_id(&mut self, id: i64) -> StoreResult<Option<HandoverNote>> {
        Ok(self.state().notes.get(&id).cloned())
    }

    async fn find_by_id_for_update(&mut self, id: i64) -> StoreResult<Option<HandoverNote>> {
        // the session already holds the only lock
        self.find_by_id(id).await
    }

    async fn find_by_id_with_author(
        &mut self,
        id: i64,
    ) -> StoreResult<Option<HandoverNoteWithAuthor>> {
        let state = self.state();
        Ok(state.notes.get(&id).and_then(|note| state.with_author(note)))
    }

    async fn find_all_by_ids_with_author(
        &mut self,
        ids: &[i64],
    ) -> StoreResult<Vec<HandoverNoteWithAuthor>> {
        let state = self.state();
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| state.notes.get(&id))
            .filter_map(|note| state.with_author(note))
            .collect())
    }

    async fn find_by_author_id(
        &mut self,
        author_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<HandoverNote>> {
        let mut notes: Vec<HandoverNote> = self
            .state()
            .notes
            .values()
            .filter(|note| note.author_id == author_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = notes.len() as i64;
        Ok(Page::new(page.slice(&notes), page, total))
    }

    async fn delete_by_id(&mut self, id: i64) -> StoreResult<bool> {
        let state = self.state();
        if state.links.values().any(|link| link.handover_note_id == id) {
            return Err(StoreError::Constraint(format!(
                "handover note {} still has recipient links",
                id
            )));
        }
        Ok(state.notes.remove(&id).is_some())
    }

    async fn exists_by_id(&mut self, id: i64) -> StoreResult<bool> {
        Ok(self.state().notes.contains_key(&id))
    }

    async fn count(&mut self) -> StoreResult<i64> {
        Ok(self.state().notes.len() as i64)
    }
}

#[async_trait]
impl RecipientStore for MemorySession {
    async fn save(&mut self, link: NewHandoverRecipient) -> StoreResult<HandoverRecipient> {
        self.check_recipient_writes()?;
        self.state().insert_link(link)
    }

    async fn save_all(
        &mut self,
        links: Vec<NewHandoverRecipient>,
    ) -> StoreResult<Vec<HandoverRecipient>> {
        if links.is_empty() {
            return Ok(Vec::new());
        }
        self.check_recipient_writes()?;

        let state = self.state();
        links
            .into_iter()
            .map(|link| state.insert_link(link))
            .collect()
    }

    async fn find_by_recipient_id(
        &mut self,
        recipient_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<HandoverRecipient>> {
        let mut links: Vec<HandoverRecipient> = self
            .state()
            .links
            .values()
            .filter(|link| link.recipient_id == recipient_id)
            .cloned()
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = links.len() as i64;
        Ok(Page::new(page.slice(&links), page, total))
    }

    async fn find_all_by_handover_note_id(
        &mut self,
        note_id: i64,
    ) -> StoreResult<Vec<HandoverRecipient>> {
        if self.fail_link_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("link lookups are disabled".to_string()));
        }
        Ok(self
            .state()
            .links
            .values()
            .filter(|link| link.handover_note_id == note_id)
            .cloned()
            .collect())
    }

    async fn find_recipient_names_by_handover_note_id(
        &mut self,
        note_id: i64,
    ) -> StoreResult<Vec<String>> {
        let state = self.state();
        Ok(state
            .links
            .values()
            .filter(|link| link.handover_note_id == note_id)
            .filter_map(|link| state.users.get(&link.recipient_id))
            .map(|user| user.name.clone())
            .collect())
    }

    async fn find_recipient_usernames_by_note_ids(
        &mut self,
        note_ids: &[i64],
    ) -> StoreResult<Vec<NoteRecipientName>> {
        let state = self.state();
        let wanted: HashSet<i64> = note_ids.iter().copied().collect();

        let mut links: Vec<&HandoverRecipient> = state
            .links
            .values()
            .filter(|link| wanted.contains(&link.handover_note_id))
            .collect();
        links.sort_by_key(|link| (link.handover_note_id, link.id));

        Ok(links
            .into_iter()
            .filter_map(|link| {
                state.users.get(&link.recipient_id).map(|user| NoteRecipientName {
                    handover_note_id: link.handover_note_id,
                    username: user.name.clone(),
                })
            })
            .collect())
    }

    async fn delete_by_note_id_and_recipient_ids(
        &mut self,
        note_id: i64,
        recipient_ids: &[Uuid],
    ) -> StoreResult<u64> {
        let state = self.state();
        let before = state.links.len();
        state.links.retain(|_, link| {
            !(link.handover_note_id == note_id && recipient_ids.contains(&link.recipient_id))
        });
        Ok((before - state.links.len()) as u64)
    }

    async fn delete_by_handover_note_id(&mut self, note_id: i64) -> StoreResult<u64> {
        let state = self.state();
        let before = state.links.len();
        state.links.retain(|_, link| link.handover_note_id != note_id);
        Ok((before - state.links.len()) as u64)
    }

    async fn count(&mut self) -> StoreResult<i64> {
        Ok(self.state().links.len() as i64)
    }
}

#[async_trait]
impl UserDirectory for MemorySession {
    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn find_users(&mut self, ids: &[Uuid]) -> StoreResult<Vec<UserProfile>> {
        let state = self.state();
        let wanted: HashSet<Uuid> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| state.users.get(&id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_assigns_ids_and_timestamps() {
        let db = MemoryHandoverDatabase::new();
        let author = db.add_user("Hong").await;

        let mut session = db.session().await.unwrap();
        let first = NoteStore::save(&mut session, HandoverNote::create(author.id, None, None))
            .await
            .unwrap();
        let second = NoteStore::save(&mut session, HandoverNote::create(author.id, None, None))
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(second.created_at > first.created_at);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test]
    async fn test_save_rejects_unknown_author() {
        let db = MemoryHandoverDatabase::new();
        let mut session = db.session().await.unwrap();

        let result =
            NoteStore::save(&mut session, HandoverNote::create(Uuid::new_v4(), None, None)).await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_duplicate_link_is_rejected() {
        let db = MemoryHandoverDatabase::new();
        let author = db.add_user("Hong").await;
        let recipient = db.add_user("Kim").await;

        let mut session = db.session().await.unwrap();
        let note = NoteStore::save(&mut session, HandoverNote::create(author.id, None, None))
            .await
            .unwrap();
        RecipientStore::save(&mut session, HandoverRecipient::create(note.id, recipient.id))
            .await
            .unwrap();

        let result =
            RecipientStore::save(&mut session, HandoverRecipient::create(note.id, recipient.id))
                .await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_note_with_links_cannot_be_deleted() {
        let db = MemoryHandoverDatabase::new();
        let author = db.add_user("Hong").await;
        let recipient = db.add_user("Kim").await;

        let mut session = db.session().await.unwrap();
        let note = NoteStore::save(&mut session, HandoverNote::create(author.id, None, None))
            .await
            .unwrap();
        RecipientStore::save(&mut session, HandoverRecipient::create(note.id, recipient.id))
            .await
            .unwrap();

        assert!(session.delete_by_id(note.id).await.is_err());
        assert_eq!(session.delete_by_handover_note_id(note.id).await.unwrap(), 1);
        assert!(session.delete(&note).await.unwrap());
        assert!(!session.exists_by_id(note.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let db = MemoryHandoverDatabase::new();
        let author = db.add_user("Hong").await;

        {
            let mut tx = db.begin().await.unwrap();
            NoteStore::save(&mut tx, HandoverNote::create(author.id, None, None))
                .await
                .unwrap();
            assert_eq!(NoteStore::count(&mut tx).await.unwrap(), 1);
        }

        let mut session = db.session().await.unwrap();
        assert_eq!(NoteStore::count(&mut session).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_committed_transaction_is_visible() {
        let db = MemoryHandoverDatabase::new();
        let author = db.add_user("Hong").await;

        let mut tx = db.begin().await.unwrap();
        let note = NoteStore::save(&mut tx, HandoverNote::create(author.id, None, None))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut session = db.session().await.unwrap();
        assert_eq!(session.find_by_id(note.id).await.unwrap(), Some(note));
    }

    #[tokio::test]
    async fn test_recipient_page_is_newest_first() {
        let db = MemoryHandoverDatabase::new();
        let author = db.add_user("Hong").await;
        let recipient = db.add_user("Kim").await;

        let mut session = db.session().await.unwrap();
        let mut note_ids = Vec::new();
        for _ in 0..3 {
            let note = NoteStore::save(&mut session, HandoverNote::create(author.id, None, None))
                .await
                .unwrap();
            RecipientStore::save(&mut session, HandoverRecipient::create(note.id, recipient.id))
                .await
                .unwrap();
            note_ids.push(note.id);
        }

        let page = session
            .find_by_recipient_id(recipient.id, PageRequest::new(0, 2))
            .await
            .unwrap();
        let order: Vec<i64> = page.items.iter().map(|l| l.handover_note_id).collect();

        assert_eq!(order, vec![note_ids[2], note_ids[1]]);
        assert_eq!(page.total_elements, 3);
        assert!(!page.last);
    }

    #[tokio::test]
    async fn test_failed_recipient_writes() {
        let db = MemoryHandoverDatabase::new();
        let author = db.add_user("Hong").await;
        let recipient = db.add_user("Kim").await;
        db.fail_recipient_writes(true);

        let mut session = db.session().await.unwrap();
        let note = NoteStore::save(&mut session, HandoverNote::create(author.id, None, None))
            .await
            .unwrap();
        let result = session
            .save_all(HandoverRecipient::create_all(note.id, &[recipient.id]))
            .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(RecipientStore::count(&mut session).await.unwrap(), 0);
    }
}
