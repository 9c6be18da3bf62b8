//! PostgreSQL store backed by sqlx
//!
//! [`PgSession`] wraps either a pooled connection (reads, autocommit) or an
//! open transaction (aggregate writes). Both deref to `PgConnection`, so a
//! single set of queries serves both.
//!
//! # Example
//!
//! ```no_run
//! use handover_shared::db::pool::{create_pool, DatabaseConfig};
//! use handover_shared::store::{postgres::PgHandoverDatabase, HandoverDatabase, NoteStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//! let db = PgHandoverDatabase::new(pool);
//!
//! let mut session = db.session().await?;
//! let total = NoteStore::count(&mut session).await?;
//! println!("{} handover notes", total);
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, ops::DerefMut};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{pool::PoolConnection, PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{
    Commit, HandoverDatabase, NoteStore, RecipientStore, StoreResult, UserDirectory,
};
use crate::{
    db::pool::health_check,
    models::{
        handover_note::{HandoverNote, HandoverNoteWithAuthor, NewHandoverNote},
        handover_recipient::{HandoverRecipient, NewHandoverRecipient, NoteRecipientName},
        user::UserProfile,
    },
    pagination::{Page, PageRequest},
};

const NOTE_COLUMNS: &str = "id, author_id, title, content, created_at, updated_at";

const RECIPIENT_COLUMNS: &str = "id, handover_note_id, recipient_id, created_at, updated_at";

const NOTE_WITH_AUTHOR_SELECT: &str = r#"
    SELECT n.id, n.author_id, n.title, n.content, n.created_at, n.updated_at,
           u.name AS author_name, u.email AS author_email,
           u.employee_no AS author_employee_no
    FROM handover_notes n
    JOIN users u ON u.id = n.author_id
"#;

/// PostgreSQL handover backend
#[derive(Debug, Clone)]
pub struct PgHandoverDatabase {
    pool: PgPool,
}

impl PgHandoverDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Store session over a single PostgreSQL connection
pub struct PgSession<C> {
    conn: C,
}

/// Autocommit session on a pooled connection
pub type PgReadSession = PgSession<PoolConnection<Postgres>>;

/// Session inside an open transaction
pub type PgWriteTransaction = PgSession<Transaction<'static, Postgres>>;

impl<C> PgSession<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

/// Flat row for note + author joins
#[derive(sqlx::FromRow)]
struct NoteWithAuthorRow {
    id: i64,
    author_id: Uuid,
    title: Option<String>,
    content: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_name: String,
    author_email: String,
    author_employee_no: String,
}

impl From<NoteWithAuthorRow> for HandoverNoteWithAuthor {
    fn from(row: NoteWithAuthorRow) -> Self {
        Self {
            author: UserProfile {
                id: row.author_id,
                name: row.author_name,
                email: row.author_email,
                employee_no: row.author_employee_no,
            },
            note: HandoverNote {
                id: row.id,
                author_id: row.author_id,
                title: row.title,
                content: row.content,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[async_trait]
impl HandoverDatabase for PgHandoverDatabase {
    type Session = PgReadSession;
    type Transaction = PgWriteTransaction;

    async fn session(&self) -> StoreResult<Self::Session> {
        Ok(PgSession::new(self.pool.acquire().await?))
    }

    async fn begin(&self) -> StoreResult<Self::Transaction> {
        debug!("Beginning handover transaction");
        Ok(PgSession::new(self.pool.begin().await?))
    }

    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Commit for PgWriteTransaction {
    async fn commit(self) -> StoreResult<()> {
        self.conn.commit().await?;
        debug!("Committed handover transaction");
        Ok(())
    }
}

#[async_trait]
impl<C> NoteStore for PgSession<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn save(&mut self, note: NewHandoverNote) -> StoreResult<HandoverNote> {
        let saved = sqlx::query_as::<_, HandoverNote>(&format!(
            r#"
            INSERT INTO handover_notes (author_id, title, content)
            VALUES ($1, $2, $3)
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(note.author_id)
        .bind(note.title)
        .bind(note.content)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(saved)
    }

    async fn update(&mut self, note: &HandoverNote) -> StoreResult<Option<HandoverNote>> {
        let updated = sqlx::query_as::<_, HandoverNote>(&format!(
            r#"
            UPDATE handover_notes
            SET title = $2, content = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(note.id)
        .bind(note.title.as_deref())
        .bind(note.content.as_deref())
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(updated)
    }

    async fn find_by_id(&mut self, id: i64) -> StoreResult<Option<HandoverNote>> {
        let note = sqlx::query_as::<_, HandoverNote>(&format!(
            "SELECT {NOTE_COLUMNS} FROM handover_notes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(note)
    }

    async fn find_by_id_for_update(&mut self, id: i64) -> StoreResult<Option<HandoverNote>> {
        let note = sqlx::query_as::<_, HandoverNote>(&format!(
            "SELECT {NOTE_COLUMNS} FROM handover_notes WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(note)
    }

    async fn find_by_id_with_author(
        &mut self,
        id: i64,
    ) -> StoreResult<Option<HandoverNoteWithAuthor>> {
        let row = sqlx::query_as::<_, NoteWithAuthorRow>(&format!(
            "{NOTE_WITH_AUTHOR_SELECT} WHERE n.id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_all_by_ids_with_author(
        &mut self,
        ids: &[i64],
    ) -> StoreResult<Vec<HandoverNoteWithAuthor>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, NoteWithAuthorRow>(&format!(
            "{NOTE_WITH_AUTHOR_SELECT} WHERE n.id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_author_id(
        &mut self,
        author_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<HandoverNote>> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM handover_notes WHERE author_id = $1")
                .bind(author_id)
                .fetch_one(&mut *self.conn)
                .await?;

        if total == 0 {
            return Ok(Page::empty(page));
        }

        let notes = sqlx::query_as::<_, HandoverNote>(&format!(
            r#"
            SELECT {NOTE_COLUMNS}
            FROM handover_notes
            WHERE author_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(author_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(Page::new(notes, page, total))
    }

    async fn delete_by_id(&mut self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM handover_notes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_id(&mut self, id: i64) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM handover_notes WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *self.conn)
                .await?;

        Ok(exists)
    }

    async fn count(&mut self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM handover_notes")
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl<C> RecipientStore for PgSession<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn save(&mut self, link: NewHandoverRecipient) -> StoreResult<HandoverRecipient> {
        let saved = sqlx::query_as::<_, HandoverRecipient>(&format!(
            r#"
            INSERT INTO handover_recipients (handover_note_id, recipient_id)
            VALUES ($1, $2)
            RETURNING {RECIPIENT_COLUMNS}
            "#
        ))
        .bind(link.handover_note_id)
        .bind(link.recipient_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(saved)
    }

    async fn save_all(
        &mut self,
        links: Vec<NewHandoverRecipient>,
    ) -> StoreResult<Vec<HandoverRecipient>> {
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let (note_ids, recipient_ids): (Vec<i64>, Vec<Uuid>) = links
            .iter()
            .map(|link| (link.handover_note_id, link.recipient_id))
            .unzip();

        // Rows are inserted in input order, so link ids ascend with it
        let mut saved = sqlx::query_as::<_, HandoverRecipient>(&format!(
            r#"
            INSERT INTO handover_recipients (handover_note_id, recipient_id)
            SELECT batch.handover_note_id, batch.recipient_id
            FROM UNNEST($1::BIGINT[], $2::UUID[])
                WITH ORDINALITY AS batch(handover_note_id, recipient_id, ordinal)
            ORDER BY batch.ordinal
            RETURNING {RECIPIENT_COLUMNS}
            "#
        ))
        .bind(&note_ids)
        .bind(&recipient_ids)
        .fetch_all(&mut *self.conn)
        .await?;

        let position: HashMap<(i64, Uuid), usize> = note_ids
            .into_iter()
            .zip(recipient_ids)
            .enumerate()
            .map(|(index, key)| (key, index))
            .collect();
        saved.sort_by_key(|link| {
            position
                .get(&(link.handover_note_id, link.recipient_id))
                .copied()
                .unwrap_or(usize::MAX)
        });

        Ok(saved)
    }

    async fn find_by_recipient_id(
        &mut self,
        recipient_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<HandoverRecipient>> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM handover_recipients WHERE recipient_id = $1")
                .bind(recipient_id)
                .fetch_one(&mut *self.conn)
                .await?;

        if total == 0 {
            return Ok(Page::empty(page));
        }

        let links = sqlx::query_as::<_, HandoverRecipient>(&format!(
            r#"
            SELECT {RECIPIENT_COLUMNS}
            FROM handover_recipients
            WHERE recipient_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(recipient_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(Page::new(links, page, total))
    }

    async fn find_all_by_handover_note_id(
        &mut self,
        note_id: i64,
    ) -> StoreResult<Vec<HandoverRecipient>> {
        let links = sqlx::query_as::<_, HandoverRecipient>(&format!(
            "SELECT {RECIPIENT_COLUMNS} FROM handover_recipients WHERE handover_note_id = $1 ORDER BY id"
        ))
        .bind(note_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(links)
    }

    async fn find_recipient_names_by_handover_note_id(
        &mut self,
        note_id: i64,
    ) -> StoreResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT u.name
            FROM handover_recipients hr
            JOIN users u ON u.id = hr.recipient_id
            WHERE hr.handover_note_id = $1
            ORDER BY hr.id
            "#,
        )
        .bind(note_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(names)
    }

    async fn find_recipient_usernames_by_note_ids(
        &mut self,
        note_ids: &[i64],
    ) -> StoreResult<Vec<NoteRecipientName>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, NoteRecipientName>(
            r#"
            SELECT hr.handover_note_id, u.name AS username
            FROM handover_recipients hr
            JOIN users u ON u.id = hr.recipient_id
            WHERE hr.handover_note_id = ANY($1)
            ORDER BY hr.handover_note_id, hr.id
            "#,
        )
        .bind(note_ids)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }

    async fn delete_by_note_id_and_recipient_ids(
        &mut self,
        note_id: i64,
        recipient_ids: &[Uuid],
    ) -> StoreResult<u64> {
        if recipient_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "DELETE FROM handover_recipients WHERE handover_note_id = $1 AND recipient_id = ANY($2)",
        )
        .bind(note_id)
        .bind(recipient_ids)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_handover_note_id(&mut self, note_id: i64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM handover_recipients WHERE handover_note_id = $1")
            .bind(note_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count(&mut self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM handover_recipients")
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl<C> UserDirectory for PgSession<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<UserProfile>> {
        let user = sqlx::query_as::<_, UserProfile>(
            "SELECT id, name, email, employee_no FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(user)
    }

    async fn find_users(&mut self, ids: &[Uuid]) -> StoreResult<Vec<UserProfile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, UserProfile>(
            "SELECT id, name, email, employee_no FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(users)
    }
}
