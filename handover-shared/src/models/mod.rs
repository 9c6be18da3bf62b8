//! Database models for the handover service
//!
//! # Models
//!
//! - `user`: Directory users (read-only from the handover core's view)
//! - `handover_note`: The note aggregate root
//! - `handover_recipient`: Note-to-recipient links and reconciliation diff
//!
//! # Example
//!
//! ```
//! use handover_shared::models::handover_note::HandoverNote;
//! use handover_shared::models::handover_recipient::HandoverRecipient;
//! use uuid::Uuid;
//!
//! let draft = HandoverNote::create(Uuid::new_v4(), Some("Title".into()), None);
//! let links = HandoverRecipient::create_all(1, &[Uuid::new_v4(), Uuid::new_v4()]);
//! assert_eq!(links.len(), 2);
//! # let _ = draft;
//! ```

pub mod handover_note;
pub mod handover_recipient;
pub mod user;
