//! User accounts on top of the generic resource operations.

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::error::AppError;
use crate::models::pagination::{Page, PageOptions};
use crate::models::user::{CreateUser, LoginProvider, NewUser, User, UserChanges};
use crate::repositories::criteria::Criteria;
use crate::repositories::repository::{RecordStore, UpdateResult};
use crate::services::resource::ResourceService;
use crate::types::UserId;
use crate::utils::password::hash_password;

pub struct UserService<S> {
    users: ResourceService<User, S>,
}

impl<S: Clone> Clone for UserService<S> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
        }
    }
}

impl<S: RecordStore<User>> UserService<S> {
    pub fn new(store: S) -> Self {
        Self {
            users: ResourceService::new(store),
        }
    }

    pub fn resource(&self) -> &ResourceService<User, S> {
        &self.users
    }

    pub async fn find_by_email(
        &self,
        conn: &mut S::Conn,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        self.users
            .find_one(conn, Criteria::new().eq("email", email))
            .await
    }

    pub async fn find_user_by_id(
        &self,
        conn: &mut S::Conn,
        id: UserId,
    ) -> Result<Option<User>, AppError> {
        self.users.find_by_id(conn, id).await
    }

    /// Creates an account. A supplied password is hashed before storage;
    /// without one the account signs in by passcode unless a provider is
    /// given explicitly.
    pub async fn create_user(
        &self,
        conn: &mut S::Conn,
        payload: CreateUser,
        created_by: Option<UserId>,
    ) -> Result<User, AppError> {
        payload.validate()?;

        let password = payload.password.as_deref().map(hash_password).transpose()?;
        let provider = payload.provider.unwrap_or(if password.is_some() {
            LoginProvider::Normal
        } else {
            LoginProvider::Otp
        });

        let user = self
            .users
            .create_record(
                conn,
                NewUser {
                    first_name: payload.first_name.trim().to_string(),
                    last_name: payload.last_name.trim().to_string(),
                    email: payload.email,
                    password,
                    contact_no: payload.contact_no,
                    role: payload.role.unwrap_or_default(),
                    provider,
                    created_by,
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "Created user");
        Ok(user)
    }

    pub async fn get_users(
        &self,
        conn: &mut S::Conn,
        options: &PageOptions,
    ) -> Result<Page<User>, AppError> {
        self.users.paginate(conn, Criteria::new(), options).await
    }

    pub async fn update_user_by_id(
        &self,
        conn: &mut S::Conn,
        id: UserId,
        changes: UserChanges,
    ) -> Result<UpdateResult, AppError> {
        self.users.update_by_id(conn, id, changes).await
    }

    pub async fn touch_last_login(
        &self,
        conn: &mut S::Conn,
        id: UserId,
        at: DateTime<Utc>,
    ) -> Result<UpdateResult, AppError> {
        let changes = UserChanges {
            last_login: Some(at),
            ..UserChanges::default()
        };
        self.users.update_by_id(conn, id, changes).await
    }

    pub async fn delete_user(
        &self,
        conn: &mut S::Conn,
        id: UserId,
    ) -> Result<UpdateResult, AppError> {
        self.users.delete_by_id(conn, id).await
    }

    pub async fn restore_user(
        &self,
        conn: &mut S::Conn,
        id: UserId,
    ) -> Result<UpdateResult, AppError> {
        self.users.restore_by_id(conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::RecordMeta;
    use crate::models::user::UserRole;
    use crate::repositories::repository::MockRecordStore;
    use crate::utils::password::verify_password;

    fn stored(draft: NewUser) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            password: draft.password,
            contact_no: draft.contact_no,
            role: draft.role,
            provider: draft.provider,
            profile_url: None,
            last_login: None,
            created_by: draft.created_by,
            modified_by: None,
            meta: RecordMeta {
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
        }
    }

    fn payload(password: Option<&str>) -> CreateUser {
        CreateUser {
            first_name: " Ada ".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            contact_no: None,
            role: None,
            provider: None,
            password: password.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn create_user_hashes_the_password() {
        let mut store = MockRecordStore::<User>::new();
        store
            .expect_create()
            .times(1)
            .returning(|_, draft| Ok(stored(draft)));

        let service = UserService::new(store);
        let admin = UserId::new();
        let user = service
            .create_user(&mut (), payload(Some("secret-pw")), Some(admin))
            .await
            .expect("create user");

        let hash = user.password.as_deref().expect("hash stored");
        assert_ne!(hash, "secret-pw");
        assert!(verify_password("secret-pw", hash).unwrap());
        assert_eq!(user.provider, LoginProvider::Normal);
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.created_by, Some(admin));
    }

    #[tokio::test]
    async fn passwordless_users_sign_in_by_passcode() {
        let mut store = MockRecordStore::<User>::new();
        store.expect_create().returning(|_, draft| Ok(stored(draft)));

        let service = UserService::new(store);
        let user = service
            .create_user(&mut (), payload(None), None)
            .await
            .expect("create user");
        assert_eq!(user.provider, LoginProvider::Otp);
        assert!(user.password.is_none());
    }

    #[tokio::test]
    async fn invalid_payload_never_reaches_the_store() {
        let mut store = MockRecordStore::<User>::new();
        store.expect_create().never();

        let service = UserService::new(store);
        let mut invalid = payload(None);
        invalid.email = "not-an-email".into();
        let err = service
            .create_user(&mut (), invalid, None)
            .await
            .expect_err("validation");
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn touch_last_login_only_sets_the_timestamp() {
        let at = Utc::now();
        let mut store = MockRecordStore::<User>::new();
        store
            .expect_update_many()
            .withf(move |_, _, changes| {
                changes.last_login == Some(at) && changes.first_name.is_none()
            })
            .returning(|_, _, _| Ok(UpdateResult::new(1)));

        let service = UserService::new(store);
        let result = service
            .touch_last_login(&mut (), UserId::new(), at)
            .await
            .expect("touch");
        assert_eq!(result.matched, 1);
    }
}
