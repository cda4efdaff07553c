//! Unified validation framework for request payloads.
//!
//! This module provides reusable validation rules shared by the payloads
//! accepted by the services.

pub mod rules;

pub use validator::Validate;
