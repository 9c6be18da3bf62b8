//! User directory model
//!
//! Users are owned by the company directory. The handover core only reads
//! them (to validate ids and to resolve display names); `User::create` exists
//! for seeding and operator tooling.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     email VARCHAR(255) NOT NULL UNIQUE,
//!     name VARCHAR(100) NOT NULL,
//!     employee_no VARCHAR(32) NOT NULL UNIQUE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use handover_shared::models::user::{User, CreateUser};
//! use handover_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let user = User::create(&pool, CreateUser {
//!     email: "hong@example.com".to_string(),
//!     name: "Hong Gildong".to_string(),
//!     employee_no: "EMP001".to_string(),
//! }).await?;
//!
//! let found = User::find_by_id(&pool, user.id).await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Directory user row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Work email address, unique across the directory
    pub email: String,

    /// Display name shown on handover notes
    pub name: String,

    /// Company employee number
    pub employee_no: String,

    /// When the directory entry was created
    pub created_at: DateTime<Utc>,

    /// When the directory entry was last updated
    pub updated_at: DateTime<Utc>,
}

/// Directory record as seen by the handover core
///
/// This is the projection returned by [`crate::store::UserDirectory`]: enough
/// to validate an id and to render a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub employee_no: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            employee_no: user.employee_no,
        }
    }
}

/// Input for creating a directory user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Work email address
    pub email: String,

    /// Display name
    pub name: String,

    /// Company employee number
    pub employee_no: String,
}

impl User {
    /// Creates a new directory user
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email or employee number already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, employee_no)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, employee_no, created_at, updated_at
            "#,
        )
        .bind(data.email)
        .bind(data.name)
        .bind(data.employee_no)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, employee_no, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Deletes a user
    ///
    /// Fails with a foreign key violation while the user still authors or
    /// receives handover notes.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
