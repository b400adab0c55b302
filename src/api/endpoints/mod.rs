//! API endpoint handlers, one module per route group.

pub mod cache;
pub mod drug_interactions;
pub mod drugs;
pub mod health;
