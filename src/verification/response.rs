//! Flat response values for callers that want a success flag and a message
//! instead of a `Result`.

use serde::Serialize;

use super::OtpIssued;
use crate::clock::Timestamp;
use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendOtpResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resend_count: Option<u32>,
}

/// Deadline to show the user before they may ask for a code again.
fn retry_after(err: &Error) -> Option<Timestamp> {
    match err {
        Error::AccountLocked { locked_until, .. } => Some(*locked_until),
        Error::CooldownActive { cooldown_until } => Some(*cooldown_until),
        _ => None,
    }
}

impl From<Result<OtpIssued>> for SendOtpResponse {
    fn from(result: Result<OtpIssued>) -> Self {
        match result {
            Ok(issued) => Self {
                success: true,
                message: format!("Verification code sent to {}", issued.email),
                expires_at: Some(issued.expires_at),
                cooldown_until: None,
            },
            Err(err) => Self {
                success: false,
                cooldown_until: retry_after(&err),
                message: err.to_string(),
                expires_at: None,
            },
        }
    }
}

impl From<Result<OtpIssued>> for ResendOtpResponse {
    fn from(result: Result<OtpIssued>) -> Self {
        match result {
            Ok(issued) => Self {
                success: true,
                message: "New verification code sent.".to_string(),
                expires_at: Some(issued.expires_at),
                cooldown_until: None,
                resend_count: Some(issued.resend_count),
            },
            Err(err) => Self {
                success: false,
                cooldown_until: retry_after(&err),
                message: err.to_string(),
                expires_at: None,
                resend_count: None,
            },
        }
    }
}

impl From<Result<()>> for VerifyOtpResponse {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                message: "Email verified successfully!".to_string(),
                verified: true,
                attempts_remaining: None,
                locked_until: None,
            },
            Err(err) => {
                let (attempts_remaining, locked_until) = match &err {
                    Error::IncorrectCode { attempts_remaining } => (Some(*attempts_remaining), None),
                    Error::AccountLocked {
                        locked_until,
                        attempts_remaining,
                    } => (*attempts_remaining, Some(*locked_until)),
                    _ => (None, None),
                };
                Self {
                    success: false,
                    message: err.to_string(),
                    verified: false,
                    attempts_remaining,
                    locked_until,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lockout_response_carries_deadline_and_zero_attempts() {
        let result: Result<()> = Err(Error::AccountLocked {
            locked_until: 900_000,
            attempts_remaining: Some(0),
        });
        let response = VerifyOtpResponse::from(result);

        assert!(!response.success);
        assert!(!response.verified);
        assert_eq!(response.attempts_remaining, Some(0));
        assert_eq!(response.locked_until, Some(900_000));
    }

    #[test]
    fn storage_failures_become_unsuccessful_responses() {
        let result: Result<OtpIssued> = Err(Error::StorageUnavailable("quota exceeded".into()));
        let response = SendOtpResponse::from(result);
        assert!(!response.success);
        assert_eq!(response.cooldown_until, None);
        assert!(response.message.contains("quota exceeded"));
    }

    #[test]
    fn cooldown_maps_to_cooldown_until() {
        let result: Result<OtpIssued> = Err(Error::CooldownActive { cooldown_until: 42 });
        let response = ResendOtpResponse::from(result);
        assert_eq!(response.cooldown_until, Some(42));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["cooldownUntil"], 42);
        assert!(json.get("resendCount").is_none());
    }

    #[test]
    fn successful_send_mentions_email() {
        let result: Result<OtpIssued> = Ok(OtpIssued {
            email: "a@x.com".to_string(),
            expires_at: 10,
            resend_count: 0,
        });
        let response = SendOtpResponse::from(result);
        assert!(response.success);
        assert_eq!(response.message, "Verification code sent to a@x.com");
        assert_eq!(response.expires_at, Some(10));
    }
}
