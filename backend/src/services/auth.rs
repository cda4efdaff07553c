//! Sign-up and sign-in flows for password and passcode accounts.

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use validator::Validate;

use crate::config::Config;
use crate::error::AppError;
use crate::models::otp_request::{OtpRequest, VerifyOtp};
use crate::models::user::{
    CreateUser, EmailStatus, LoginPayload, LoginProvider, LoginRequest, RegisterUser,
    TokenPayload, User,
};
use crate::repositories::pg_store::PgStore;
use crate::repositories::transaction::with_transaction;
use crate::services::notifier::{mask_email, OtpNotifier};
use crate::services::otp::OtpService;
use crate::services::user::UserService;
use crate::utils::jwt::create_access_token;
use crate::utils::password::password_matches;

/// Signs `user` into a bearer token using the configured secret and lifetime.
pub fn token_for(config: &Config, user: &User) -> Result<TokenPayload, AppError> {
    let access_token = create_access_token(
        user.id,
        user.role,
        &config.jwt_secret,
        config.jwt_expiration_hours,
    )?;

    Ok(TokenPayload {
        expires_in: config.jwt_expiration_seconds(),
        access_token,
    })
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    config: Config,
    users: UserService<PgStore<User>>,
    otp: OtpService<PgStore<OtpRequest>>,
}

impl AuthService {
    pub fn new(pool: PgPool, config: Config, notifier: Arc<dyn OtpNotifier>) -> Self {
        let otp = OtpService::new(PgStore::new(), notifier, config.otp_ttl_seconds);
        Self {
            pool,
            config,
            users: UserService::new(PgStore::new()),
            otp,
        }
    }

    pub fn users(&self) -> &UserService<PgStore<User>> {
        &self.users
    }

    pub fn otp(&self) -> &OtpService<PgStore<OtpRequest>> {
        &self.otp
    }

    /// Creates a password account.
    pub async fn register(&self, payload: RegisterUser) -> Result<User, AppError> {
        payload.validate()?;
        let mut conn = self.pool.acquire().await?;

        if self
            .users
            .find_by_email(&mut *conn, &payload.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let create = CreateUser {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            contact_no: None,
            role: None,
            provider: Some(LoginProvider::Normal),
            password: Some(payload.password),
        };
        self.users.create_user(&mut *conn, create, None).await
    }

    /// Checks email and password. Unknown emails and wrong passwords fail
    /// the same way.
    pub async fn login(&self, payload: LoginRequest) -> Result<LoginPayload, AppError> {
        payload.validate()?;
        let mut conn = self.pool.acquire().await?;

        let user = self.users.find_by_email(&mut *conn, &payload.email).await?;
        let valid = match &user {
            Some(user) => password_matches(&payload.password, user.password.as_deref())?,
            None => false,
        };

        let Some(user) = user.filter(|_| valid) else {
            tracing::info!(email = %mask_email(&payload.email), "Rejected login attempt");
            return Err(AppError::Unauthorized("Invalid email or password".into()));
        };

        let token = self.create_token(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginPayload { user, token })
    }

    /// Reports how a registered email signs in, sending a passcode to
    /// passcode accounts.
    pub async fn verify_email(&self, email: &str) -> Result<EmailStatus, AppError> {
        let mut conn = self.pool.acquire().await?;

        let user = self
            .users
            .find_by_email(&mut *conn, email)
            .await?
            .ok_or_else(|| AppError::BadRequest("This email is not registered with us".into()))?;

        if user.provider == LoginProvider::Otp {
            drop(conn);
            self.replace_code(email).await?;
        }

        Ok(EmailStatus {
            provider: user.provider,
            role: user.role,
        })
    }

    /// Redeems a passcode and signs the user in.
    ///
    /// The code is approved, every other pending code for the email is
    /// expired and `last_login` is set in one transaction.
    pub async fn verify_otp(&self, payload: VerifyOtp) -> Result<LoginPayload, AppError> {
        payload.validate()?;
        let mut conn = self.pool.acquire().await?;

        let otp = self.otp.clone();
        let users = self.users.clone();
        let VerifyOtp { email, otp: code } = payload;

        let user = with_transaction(&mut *conn, move |tx| {
            Box::pin(async move {
                otp.verify(&mut *tx, &email, &code).await?;
                otp.expire_existing(&mut *tx, &email).await?;

                let user = users
                    .find_by_email(&mut *tx, &email)
                    .await?
                    .ok_or_else(|| AppError::NotFound("User not found".into()))?;
                users
                    .touch_last_login(&mut *tx, user.id, Utc::now())
                    .await?;

                users
                    .find_user_by_id(&mut *tx, user.id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("User not found".into()))
            })
        })
        .await?;

        let token = self.create_token(&user)?;
        tracing::info!(user_id = %user.id, "User logged in with passcode");
        Ok(LoginPayload { user, token })
    }

    /// Replaces any pending passcode for `email` and sends the new one once
    /// the replacement is committed.
    pub async fn resend_otp(&self, email: &str) -> Result<OtpRequest, AppError> {
        self.replace_code(email).await
    }

    /// Expires pending codes and issues a fresh one in one transaction, so
    /// at most one code per email is ever pending. Dispatch follows commit.
    async fn replace_code(&self, email: &str) -> Result<OtpRequest, AppError> {
        let mut conn = self.pool.acquire().await?;

        let otp = self.otp.clone();
        let owned_email = email.to_string();
        let request = with_transaction(&mut *conn, move |tx| {
            Box::pin(async move {
                otp.expire_existing(&mut *tx, &owned_email).await?;
                otp.issue(&mut *tx, &owned_email).await
            })
        })
        .await?;

        self.otp.notify(&request).await;
        Ok(request)
    }

    pub fn create_token(&self, user: &User) -> Result<TokenPayload, AppError> {
        token_for(&self.config, user)
    }
}
