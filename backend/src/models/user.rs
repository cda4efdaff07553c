//! Models that represent users, authentication payloads, and role metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgTypeInfo, PgValueRef};
use sqlx::{FromRow, Postgres};
use std::str::FromStr;
use validator::Validate;

use crate::models::entity::{Changeset, Entity, RecordMeta};
use crate::repositories::criteria::Value;
use crate::types::UserId;
use crate::validation::rules;

#[derive(Debug, Clone, Serialize, FromRow)]
/// Database representation of a user account.
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    /// Unique login email.
    pub email: String,
    /// Argon2 hash; absent for accounts that sign in by one-time passcode.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub contact_no: Option<String>,
    pub role: UserRole,
    pub provider: LoginProvider,
    pub profile_url: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,
    pub modified_by: Option<UserId>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const SEARCH_COLUMNS: &'static [&'static str] = &["email", "first_name", "last_name"];

    type Id = UserId;
    type Draft = NewUser;
    type Changes = UserChanges;

    fn id(&self) -> UserId {
        self.id
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

/// Returned when a stored enum column holds an unknown value.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// Implements text-column storage for a string-backed enum.
macro_rules! text_enum {
    ($name:ident) => {
        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <&str as sqlx::Decode<Postgres>>::decode(value)?;
                Ok(raw.parse::<$name>()?)
            }
        }

        impl From<$name> for Value {
            fn from(value: $name) -> Self {
                Value::from(value.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Supported user roles stored in the database.
pub enum UserRole {
    /// Standard account.
    #[default]
    User,
    /// Administrator with elevated permissions.
    Admin,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

text_enum!(UserRole);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How a user proves their identity.
pub enum LoginProvider {
    /// Email and password.
    #[default]
    Normal,
    /// One-time passcode sent to the email address.
    Otp,
}

impl LoginProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginProvider::Normal => "normal",
            LoginProvider::Otp => "otp",
        }
    }
}

impl FromStr for LoginProvider {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(LoginProvider::Normal),
            "otp" => Ok(LoginProvider::Otp),
            other => Err(UnknownVariant {
                kind: "login provider",
                value: other.to_string(),
            }),
        }
    }
}

text_enum!(LoginProvider);

/// Column values for a new user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: Option<String>,
    pub contact_no: Option<String>,
    pub role: UserRole,
    pub provider: LoginProvider,
    pub created_by: Option<UserId>,
}

impl Changeset for NewUser {
    fn into_assignments(self) -> Vec<(&'static str, Value)> {
        vec![
            ("first_name", self.first_name.into()),
            ("last_name", self.last_name.into()),
            ("email", self.email.into()),
            ("password", self.password.into()),
            ("contact_no", self.contact_no.into()),
            ("role", self.role.into()),
            ("provider", self.provider.into()),
            ("created_by", self.created_by.into()),
        ]
    }
}

/// Partial update of a user row; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub contact_no: Option<String>,
    pub role: Option<UserRole>,
    pub profile_url: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub modified_by: Option<UserId>,
}

impl Changeset for UserChanges {
    fn into_assignments(self) -> Vec<(&'static str, Value)> {
        let mut assignments = Vec::new();
        if let Some(first_name) = self.first_name {
            assignments.push(("first_name", first_name.into()));
        }
        if let Some(last_name) = self.last_name {
            assignments.push(("last_name", last_name.into()));
        }
        if let Some(password) = self.password {
            assignments.push(("password", password.into()));
        }
        if let Some(contact_no) = self.contact_no {
            assignments.push(("contact_no", contact_no.into()));
        }
        if let Some(role) = self.role {
            assignments.push(("role", role.into()));
        }
        if let Some(profile_url) = self.profile_url {
            assignments.push(("profile_url", profile_url.into()));
        }
        if let Some(last_login) = self.last_login {
            assignments.push(("last_login", last_login.into()));
        }
        if let Some(modified_by) = self.modified_by {
            assignments.push(("modified_by", modified_by.into()));
        }
        assignments
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
/// Payload for creating a user on behalf of an administrator.
pub struct CreateUser {
    #[validate(custom(function = "rules::validate_not_blank"))]
    pub first_name: String,
    #[validate(custom(function = "rules::validate_not_blank"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    pub contact_no: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub provider: Option<LoginProvider>,
    /// Plain-text password; hashed before it is stored.
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
/// Payload for self-service registration.
pub struct RegisterUser {
    #[validate(custom(function = "rules::validate_not_blank"))]
    pub first_name: String,
    #[validate(custom(function = "rules::validate_not_blank"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
/// Payload for updating portions of an existing user.
pub struct UpdateUser {
    #[validate(custom(function = "rules::validate_not_blank"))]
    pub first_name: Option<String>,
    #[validate(custom(function = "rules::validate_not_blank"))]
    pub last_name: Option<String>,
    pub contact_no: Option<String>,
    pub profile_url: Option<String>,
    pub role: Option<UserRole>,
}

impl From<UpdateUser> for UserChanges {
    fn from(payload: UpdateUser) -> Self {
        Self {
            first_name: payload.first_name,
            last_name: payload.last_name,
            contact_no: payload.contact_no,
            profile_url: payload.profile_url,
            role: payload.role,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Signed access token and its lifetime in seconds.
pub struct TokenPayload {
    pub expires_in: u64,
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
/// Returned after a successful sign-in.
pub struct LoginPayload {
    pub user: User,
    pub token: TokenPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// How a registered email is expected to sign in.
pub struct EmailStatus {
    pub provider: LoginProvider,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: Some("$argon2id$hash".into()),
            contact_no: None,
            role: UserRole::Admin,
            provider: LoginProvider::Normal,
            profile_url: None,
            last_login: None,
            created_by: None,
            modified_by: None,
            meta: RecordMeta {
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
        }
    }

    #[test]
    fn enums_parse_their_canonical_names() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("otp".parse::<LoginProvider>().unwrap(), LoginProvider::Otp);
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn serialized_user_omits_password_and_flattens_meta() {
        let json = serde_json::to_value(sample_user()).expect("serialize user");
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "admin");
        assert_eq!(json["provider"], "normal");
        assert!(json.get("created_at").is_some());
        assert!(json["deleted_at"].is_null());
    }

    #[test]
    fn empty_changes_assign_nothing() {
        assert!(UserChanges::default().into_assignments().is_empty());

        let changes = UserChanges {
            last_login: Some(Utc::now()),
            ..UserChanges::default()
        };
        let columns: Vec<_> = changes
            .into_assignments()
            .into_iter()
            .map(|(column, _)| column)
            .collect();
        assert_eq!(columns, vec!["last_login"]);
    }

    #[test]
    fn new_user_always_emits_the_same_columns() {
        let draft = NewUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: None,
            contact_no: None,
            role: UserRole::User,
            provider: LoginProvider::Otp,
            created_by: None,
        };
        let assignments = draft.into_assignments();
        assert_eq!(assignments.len(), 8);
        assert_eq!(assignments[5], ("role", Value::Text(Some("user".into()))));
        assert_eq!(assignments[3], ("password", Value::Text(None)));
    }

    #[test]
    fn register_payload_requires_six_character_password() {
        let payload = RegisterUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: "short".into(),
        };
        assert!(payload.validate().is_err());

        let payload = RegisterUser {
            password: "longer-secret".into(),
            ..payload
        };
        assert!(payload.validate().is_ok());
    }
}
