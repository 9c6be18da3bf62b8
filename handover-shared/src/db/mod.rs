//! Database plumbing for the handover service
//!
//! - `pool`: PostgreSQL connection pool with health checks
//! - `migrations`: embedded schema migrations
//!
//! Queries themselves live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
