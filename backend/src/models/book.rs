//! Book records and the payloads used to manage them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::entity::{Changeset, Entity, RecordMeta};
use crate::models::user::User;
use crate::repositories::criteria::Value;
use crate::types::{BookId, UserId};
use crate::validation::rules;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Book {
    pub id: BookId,
    pub name: String,
    pub author_id: UserId,
    pub created_by: Option<UserId>,
    pub modified_by: Option<UserId>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl Entity for Book {
    const TABLE: &'static str = "books";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name"];

    type Id = BookId;
    type Draft = NewBook;
    type Changes = BookChanges;

    fn id(&self) -> BookId {
        self.id
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub name: String,
    pub author_id: UserId,
    pub created_by: Option<UserId>,
}

impl Changeset for NewBook {
    fn into_assignments(self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", self.name.into()),
            ("author_id", self.author_id.into()),
            ("created_by", self.created_by.into()),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub name: Option<String>,
    pub author_id: Option<UserId>,
    pub modified_by: Option<UserId>,
}

impl Changeset for BookChanges {
    fn into_assignments(self) -> Vec<(&'static str, Value)> {
        let mut assignments = Vec::new();
        if let Some(name) = self.name {
            assignments.push(("name", name.into()));
        }
        if let Some(author_id) = self.author_id {
            assignments.push(("author_id", author_id.into()));
        }
        if let Some(modified_by) = self.modified_by {
            assignments.push(("modified_by", modified_by.into()));
        }
        assignments
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
/// Payload for adding a book to the catalogue.
pub struct CreateBook {
    #[validate(custom(function = "rules::validate_not_blank"))]
    pub name: String,
    pub author_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
/// Payload for editing a book.
pub struct UpdateBook {
    #[validate(custom(function = "rules::validate_not_blank"))]
    pub name: Option<String>,
    pub author_id: Option<UserId>,
}

/// A book together with its author, when the author is still live.
#[derive(Debug, Clone, Serialize)]
pub struct BookWithAuthor {
    #[serde(flatten)]
    pub book: Book,
    pub author: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_changes_only_assign_present_fields() {
        let editor = UserId::new();
        let changes = BookChanges {
            name: Some("Dune Messiah".into()),
            modified_by: Some(editor),
            ..BookChanges::default()
        };
        assert_eq!(
            changes.into_assignments(),
            vec![
                ("name", Value::Text(Some("Dune Messiah".into()))),
                ("modified_by", Value::Uuid(Some(*editor.as_uuid()))),
            ]
        );
    }

    #[test]
    fn create_book_rejects_blank_name() {
        let payload = CreateBook {
            name: "   ".into(),
            author_id: UserId::new(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn create_book_accepts_uuid_author() {
        let payload: CreateBook = serde_json::from_str(
            r#"{"name":"Dune","author_id":"7f1f2a44-3c1e-4c55-9a43-2f3b7a1f0c11"}"#,
        )
        .expect("deserialize payload");
        assert!(payload.validate().is_ok());
        assert_eq!(
            payload.author_id.to_string(),
            "7f1f2a44-3c1e-4c55-9a43-2f3b7a1f0c11"
        );
    }
}
