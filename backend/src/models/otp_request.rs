//! One-time passcode requests.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::entity::{Changeset, Entity, RecordMeta};
use crate::repositories::criteria::Value;
use crate::types::OtpRequestId;
use crate::validation::rules;

#[derive(Debug, Clone, Serialize, FromRow)]
/// A passcode issued to an email address.
pub struct OtpRequest {
    pub id: OtpRequestId,
    pub email: String,
    /// Six-digit code; never serialized.
    #[serde(skip_serializing)]
    pub otp: String,
    pub is_approved: bool,
    pub is_expired: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl OtpRequest {
    pub fn state(&self) -> OtpState {
        OtpState::from_flags(self.is_approved, self.is_expired)
    }
}

impl Entity for OtpRequest {
    const TABLE: &'static str = "otp_requests";

    type Id = OtpRequestId;
    type Draft = NewOtpRequest;
    type Changes = OtpChanges;

    fn id(&self) -> OtpRequestId {
        self.id
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

/// Where a request is in its lifecycle. `Approved` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpState {
    Pending,
    Approved,
    Expired,
}

impl OtpState {
    /// Approval wins over expiry: a verified request is also marked expired.
    pub fn from_flags(is_approved: bool, is_expired: bool) -> Self {
        match (is_approved, is_expired) {
            (true, _) => OtpState::Approved,
            (false, true) => OtpState::Expired,
            (false, false) => OtpState::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OtpState::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct NewOtpRequest {
    pub email: String,
    pub otp: String,
}

impl Changeset for NewOtpRequest {
    fn into_assignments(self) -> Vec<(&'static str, Value)> {
        vec![
            ("email", self.email.into()),
            ("otp", self.otp.into()),
            ("is_approved", false.into()),
            ("is_expired", false.into()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpChanges {
    pub is_approved: Option<bool>,
    pub is_expired: Option<bool>,
}

impl OtpChanges {
    /// Marks a request as used.
    pub fn approve() -> Self {
        Self {
            is_approved: Some(true),
            is_expired: Some(true),
        }
    }

    pub fn expire() -> Self {
        Self {
            is_approved: None,
            is_expired: Some(true),
        }
    }
}

impl Changeset for OtpChanges {
    fn into_assignments(self) -> Vec<(&'static str, Value)> {
        let mut assignments = Vec::new();
        if let Some(is_approved) = self.is_approved {
            assignments.push(("is_approved", is_approved.into()));
        }
        if let Some(is_expired) = self.is_expired {
            assignments.push(("is_expired", is_expired.into()));
        }
        assignments
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
/// Payload for requesting a passcode.
pub struct SendOtp {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
/// Payload for redeeming a passcode.
pub struct VerifyOtp {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom(function = "rules::validate_otp_code"))]
    pub otp: String,
}
