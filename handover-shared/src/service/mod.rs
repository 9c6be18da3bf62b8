//! Handover domain services
//!
//! - [`HandoverService`]: transactional create, update and delete
//! - [`HandoverQueryService`]: author list, recipient list and detail views
//!
//! Both are generic over a [`crate::store::HandoverDatabase`], so the same
//! code runs against PostgreSQL and the in-memory store.
//!
//! # Example
//!
//! ```
//! use handover_shared::pagination::PageRequest;
//! use handover_shared::service::{CreateHandover, HandoverQueryService, HandoverService};
//! use handover_shared::store::memory::MemoryHandoverDatabase;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = MemoryHandoverDatabase::new();
//! let author = db.add_user("Hong Gildong").await;
//! let recipient = db.add_user("Kim Cheolsu").await;
//!
//! let note = HandoverService::new(db.clone())
//!     .create(CreateHandover {
//!         author_id: author.id,
//!         recipient_ids: vec![recipient.id],
//!         title: Some("Vacation handover".to_string()),
//!         content: Some("Ticket queue is yours this week.".to_string()),
//!     })
//!     .await?;
//!
//! let inbox = HandoverQueryService::new(db)
//!     .recipient_list(recipient.id, PageRequest::default())
//!     .await?;
//! assert_eq!(inbox.recipients[0].handover_id, note.id);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod error;
pub mod query;

pub use aggregate::{CreateHandover, HandoverService, UpdateHandover};
pub use error::{HandoverError, HandoverResult};
pub use query::{
    AuthorHandoverItem, AuthorHandoverList, HandoverDetail, HandoverQueryService, PageMeta,
    RecipientHandoverItem, RecipientHandoverList,
};
