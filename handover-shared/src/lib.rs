//! # Handover Shared Library
//!
//! Domain core of the handover notes service: models, persistence contracts
//! and the services that keep a note and its recipient links consistent.
//!
//! ## Module Organization
//!
//! - `models`: Notes, recipient links and directory users
//! - `pagination`: Zero-based page requests and pages
//! - `store`: Store traits with PostgreSQL and in-memory backends
//! - `service`: Transactional writes and batched read views
//! - `db`: Connection pool and embedded migrations

pub mod db;
pub mod models;
pub mod pagination;
pub mod service;
pub mod store;

/// Current version of the handover shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
