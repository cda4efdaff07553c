//! Query criteria shared by every record store.
//!
//! Column names are `&'static str` constants supplied by entity code; every
//! value is sent as a bound parameter.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::types::{BookId, OtpRequestId, UserId};

/// A bindable column value. Each variant carries its own SQL type so that
/// `NULL` is bound with the right parameter type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(Option<String>),
    Bool(Option<bool>),
    Uuid(Option<Uuid>),
    Timestamp(Option<DateTime<Utc>>),
    Int(Option<i64>),
}

impl Value {
    pub(crate) fn push_bind(self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Value::Text(v) => builder.push_bind(v),
            Value::Bool(v) => builder.push_bind(v),
            Value::Uuid(v) => builder.push_bind(v),
            Value::Timestamp(v) => builder.push_bind(v),
            Value::Int(v) => builder.push_bind(v),
        };
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(Some(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(Some(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(Some(v))
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(Some(v))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(Some(v))
    }
}

impl From<Option<DateTime<Utc>>> for Value {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        Value::Timestamp(v)
    }
}

macro_rules! id_value {
    ($($id:ty),*) => {
        $(
            impl From<$id> for Value {
                fn from(id: $id) -> Self {
                    Value::Uuid(Some(id.into()))
                }
            }

            impl From<Option<$id>> for Value {
                fn from(id: Option<$id>) -> Self {
                    Value::Uuid(id.map(Into::into))
                }
            }
        )*
    };
}

id_value!(UserId, BookId, OtpRequestId);

/// Which side of the soft-delete marker a query sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Only rows with `deleted_at IS NULL`.
    #[default]
    Live,
    /// Live and soft-deleted rows.
    WithDeleted,
    /// Only soft-deleted rows.
    DeletedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(&'static str, Value),
    Gte(&'static str, Value),
    Lt(&'static str, Value),
    IsNull(&'static str),
    NotNull(&'static str),
    /// Case-insensitive substring match against any of the columns.
    Search(&'static [&'static str], String),
}

/// Filter, soft-delete scope and ordering for a store query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Criteria {
    conditions: Vec<Condition>,
    scope: Scope,
    order: Vec<(&'static str, Direction)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<Value>) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(column, value.into()));
        self
    }

    pub fn gte(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Gte(column, value.into()));
        self
    }

    pub fn lt(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Lt(column, value.into()));
        self
    }

    pub fn is_null(mut self, column: &'static str) -> Self {
        self.conditions.push(Condition::IsNull(column));
        self
    }

    pub fn not_null(mut self, column: &'static str) -> Self {
        self.conditions.push(Condition::NotNull(column));
        self
    }

    /// Adds a free-text filter over `columns`; a no-op when there are none.
    pub fn search(mut self, columns: &'static [&'static str], term: impl Into<String>) -> Self {
        if !columns.is_empty() {
            self.conditions.push(Condition::Search(columns, term.into()));
        }
        self
    }

    pub fn with_deleted(self) -> Self {
        self.with_scope(Scope::WithDeleted)
    }

    pub fn only_deleted(self) -> Self {
        self.with_scope(Scope::DeletedOnly)
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn order_by(mut self, column: &'static str, direction: Direction) -> Self {
        self.order.push((column, direction));
        self
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Appends the WHERE clause, including the soft-delete scope.
    pub(crate) fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut has_clause = false;

        for condition in &self.conditions {
            push_clause(builder, &mut has_clause);
            match condition {
                Condition::Eq(column, value) => {
                    builder.push(*column).push(" = ");
                    value.clone().push_bind(builder);
                }
                Condition::Gte(column, value) => {
                    builder.push(*column).push(" >= ");
                    value.clone().push_bind(builder);
                }
                Condition::Lt(column, value) => {
                    builder.push(*column).push(" < ");
                    value.clone().push_bind(builder);
                }
                Condition::IsNull(column) => {
                    builder.push(*column).push(" IS NULL");
                }
                Condition::NotNull(column) => {
                    builder.push(*column).push(" IS NOT NULL");
                }
                Condition::Search(columns, term) => {
                    let pattern = like_pattern(term);
                    builder.push("(");
                    for (index, column) in columns.iter().enumerate() {
                        if index > 0 {
                            builder.push(" OR ");
                        }
                        builder.push(*column).push(" ILIKE ");
                        builder.push_bind(pattern.clone());
                    }
                    builder.push(")");
                }
            }
        }

        match self.scope {
            Scope::Live => {
                push_clause(builder, &mut has_clause);
                builder.push("deleted_at IS NULL");
            }
            Scope::DeletedOnly => {
                push_clause(builder, &mut has_clause);
                builder.push("deleted_at IS NOT NULL");
            }
            Scope::WithDeleted => {}
        }
    }

    /// Appends ORDER BY; defaults to creation order with the id as tiebreaker.
    pub(crate) fn push_order(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        if self.order.is_empty() {
            builder.push(" ORDER BY created_at ASC, id ASC");
            return;
        }
        builder.push(" ORDER BY ");
        for (index, (column, direction)) in self.order.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.push(*column).push(" ").push(direction.as_sql());
        }
    }
}

/// Appends WHERE or AND to the query builder depending on whether a clause has already been added.
pub fn push_clause(builder: &mut QueryBuilder<'_, Postgres>, has_clause: &mut bool) {
    if *has_clause {
        builder.push(" AND ");
    } else {
        builder.push(" WHERE ");
        *has_clause = true;
    }
}

/// Wraps a search term for ILIKE, escaping the pattern metacharacters.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
