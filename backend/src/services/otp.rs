//! One-time passcode lifecycle: issue, expire and verify.
//!
//! A request starts `pending` and ends either `approved` (verified) or
//! `expired` (replaced, or older than the configured lifetime). Verification
//! claims the request with a conditional update, so a code can be redeemed
//! at most once even under concurrent calls.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::config::MAX_OTP_TTL_SECONDS;
use crate::error::AppError;
use crate::models::otp_request::{NewOtpRequest, OtpChanges, OtpRequest};
use crate::repositories::criteria::{Criteria, Direction};
use crate::repositories::repository::{RecordStore, UpdateResult};
use crate::services::notifier::{mask_email, OtpNotifier};
use crate::services::resource::ResourceService;
use crate::utils::otp::generate_code;

pub struct OtpService<S> {
    requests: ResourceService<OtpRequest, S>,
    notifier: Arc<dyn OtpNotifier>,
    ttl: Duration,
}

impl<S: Clone> Clone for OtpService<S> {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
            notifier: Arc::clone(&self.notifier),
            ttl: self.ttl,
        }
    }
}

/// Criteria for requests of `email` that can still be redeemed or expired.
fn pending_for(email: &str) -> Criteria {
    Criteria::new()
        .eq("email", email)
        .eq("is_approved", false)
        .eq("is_expired", false)
}

impl<S: RecordStore<OtpRequest>> OtpService<S> {
    /// `ttl_seconds` is clamped to `1..=MAX_OTP_TTL_SECONDS`.
    pub fn new(store: S, notifier: Arc<dyn OtpNotifier>, ttl_seconds: i64) -> Self {
        Self {
            requests: ResourceService::new(store),
            notifier,
            ttl: Duration::seconds(ttl_seconds.clamp(1, MAX_OTP_TTL_SECONDS)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Creates a new pending request with a fresh code. Earlier requests for
    /// the same email are left as they are.
    pub async fn issue(&self, conn: &mut S::Conn, email: &str) -> Result<OtpRequest, AppError> {
        let request = self
            .requests
            .create_record(
                conn,
                NewOtpRequest {
                    email: email.to_string(),
                    otp: generate_code(),
                },
            )
            .await?;

        tracing::info!(
            request_id = %request.id,
            email = %mask_email(email),
            "Issued one-time passcode"
        );
        Ok(request)
    }

    /// Expires every request for `email` that is still pending.
    pub async fn expire_existing(
        &self,
        conn: &mut S::Conn,
        email: &str,
    ) -> Result<UpdateResult, AppError> {
        let result = self
            .requests
            .update_many(conn, pending_for(email), OtpChanges::expire())
            .await?;

        tracing::debug!(
            email = %mask_email(email),
            expired = result.matched,
            "Expired pending passcodes"
        );
        Ok(result)
    }

    /// Redeems `code` for `email` and returns the approved request.
    ///
    /// Fails with [`AppError::InvalidCode`] when no pending, unexpired
    /// request carries that code, including when a concurrent call
    /// redeemed it first.
    pub async fn verify(
        &self,
        conn: &mut S::Conn,
        email: &str,
        code: &str,
    ) -> Result<OtpRequest, AppError> {
        let criteria = pending_for(email)
            .eq("otp", code)
            .gte("created_at", Utc::now() - self.ttl);

        let Some(request) = self.requests.find_one(conn, criteria).await? else {
            tracing::debug!(email = %mask_email(email), "No pending passcode matched");
            return Err(AppError::InvalidCode);
        };

        // Claim only while still pending.
        let claim = Criteria::by_id(request.id)
            .eq("is_approved", false)
            .eq("is_expired", false);
        let claimed = self
            .requests
            .update_many(conn, claim, OtpChanges::approve())
            .await?;
        if claimed.is_empty() {
            tracing::warn!(request_id = %request.id, "Passcode was redeemed concurrently");
            return Err(AppError::InvalidCode);
        }

        let approved = self
            .requests
            .find_by_id(conn, request.id)
            .await?
            .ok_or(AppError::InvalidCode)?;

        tracing::info!(request_id = %approved.id, "Verified one-time passcode");
        Ok(approved)
    }

    /// Newest request for `email` that has not been expired or used.
    pub async fn latest_for_email(
        &self,
        conn: &mut S::Conn,
        email: &str,
    ) -> Result<Option<OtpRequest>, AppError> {
        let criteria = pending_for(email).order_by("created_at", Direction::Desc);
        self.requests.find_one(conn, criteria).await
    }

    /// Expires pending requests issued before `now` minus the lifetime.
    pub async fn expire_stale(
        &self,
        conn: &mut S::Conn,
        now: DateTime<Utc>,
    ) -> Result<UpdateResult, AppError> {
        let criteria = Criteria::new()
            .eq("is_approved", false)
            .eq("is_expired", false)
            .lt("created_at", now - self.ttl);

        let result = self
            .requests
            .update_many(conn, criteria, OtpChanges::expire())
            .await?;
        tracing::info!(expired = result.matched, "Expired stale passcodes");
        Ok(result)
    }

    /// Issues a code and hands it to the notifier.
    pub async fn send(&self, conn: &mut S::Conn, email: &str) -> Result<OtpRequest, AppError> {
        let request = self.issue(conn, email).await?;
        self.notify(&request).await;
        Ok(request)
    }

    /// Replaces any pending code for `email` with a new one and sends it.
    pub async fn resend(&self, conn: &mut S::Conn, email: &str) -> Result<OtpRequest, AppError> {
        self.expire_existing(conn, email).await?;
        self.send(conn, email).await
    }

    /// Dispatches the request's code. Delivery failures are logged only.
    pub async fn notify(&self, request: &OtpRequest) {
        if let Err(err) = self.notifier.send_code(&request.email, &request.otp).await {
            tracing::warn!(
                request_id = %request.id,
                error = %err,
                "Failed to dispatch one-time passcode"
            );
        }
    }
}
