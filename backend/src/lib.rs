//! Persistence core for the bookshelf backend: soft-delete record stores,
//! transactional units of work, paginated resource services and the
//! one-time passcode sign-in flow.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;
pub mod types;
pub mod utils;
pub mod validation;
