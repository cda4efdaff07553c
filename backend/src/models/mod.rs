//! Data models shared across database access and services.

pub mod book;
pub mod entity;
pub mod otp_request;
pub mod pagination;
pub mod user;

pub use entity::{Changeset, Entity, Lifecycle, RecordMeta};
pub use pagination::{Page, PageMeta, PageOptions};
