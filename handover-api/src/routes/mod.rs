//! API route handlers
//!
//! - `health`: Health check endpoint
//! - `handovers`: Handover note writes and list/detail views

pub mod handovers;
pub mod health;
