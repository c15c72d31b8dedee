//! Step outcomes and the user-facing (Arabic) messages they map to.

use thiserror::Error;

use crate::api::ApiError;

/// Messages shown to the user. Everything else goes to the log only.
pub mod messages {
    pub const INCOMPLETE_CODE: &str = "الرجاء إدخال 4 أرقام";
    pub const CODE_REJECTED: &str = "فشل في إرسال رمز التحقق";
    pub const SEND_FAILED: &str = "حدث خطأ أثناء الإرسال";
    pub const ACCOUNT_VERIFIED: &str = "تم إرسال رمز التحقق وتأكيد الحساب بنجاح!";
    pub const COMPANY_SAVE_FAILED: &str = "حدث خطأ أثناء حفظ الشركة. حاول مرة أخرى.";
    pub const PDF_ONLY: &str = "يسمح فقط برفع ملفات PDF.";
    pub const PHONE_NOT_VERIFIED: &str = "يرجى تأكيد رقم الجوال أولاً";
    pub const COMPANY_NAME_REQUIRED: &str = "الرجاء إدخال اسم الشركة";
    pub const INVALID_LOCATION: &str = "الموقع المحدد غير صالح";
}

/// Malformed local input; never reaches the network
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("verification code needs 4 digits, got {0}")]
    IncompleteCode(usize),

    #[error("no verified user to link the company to")]
    MissingUser,

    #[error("company name is required")]
    MissingCompanyName,

    #[error("coordinates ({0}, {1}) are out of range")]
    InvalidCoordinates(f64, f64),
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::IncompleteCode(_) => messages::INCOMPLETE_CODE,
            ValidationError::MissingUser => messages::PHONE_NOT_VERIFIED,
            ValidationError::MissingCompanyName => messages::COMPANY_NAME_REQUIRED,
            ValidationError::InvalidCoordinates(..) => messages::INVALID_LOCATION,
        }
    }
}

/// Why a step submission did not advance the wizard.
///
/// Every variant except `AlreadySubmitted` leaves the step retryable.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The step already advanced the wizard; submitting again would
    /// skip the next page or duplicate its records
    #[error("this step was already submitted")]
    AlreadySubmitted,

    /// The service answered but said no (e.g. wrong code)
    #[error("rejected: {0}")]
    Rejected(&'static str),

    #[error(transparent)]
    Transport(#[from] ApiError),
}

impl StepError {
    /// Message for the user; `generic` covers transport failures, which
    /// each step words differently
    pub fn user_message(&self, generic: &'static str) -> &'static str {
        match self {
            StepError::Validation(v) => v.user_message(),
            StepError::Rejected(message) => message,
            StepError::AlreadySubmitted | StepError::Transport(_) => generic,
        }
    }

    /// Operator-facing advice for transport failures
    pub fn hint(&self) -> Option<String> {
        let StepError::Transport(err) = self else {
            return None;
        };
        if err.is_auth_error() {
            return Some(format!(
                "{} rejected the credentials; check ONBOARDING_BACKEND__ANON_KEY",
                err.service_name()
            ));
        }
        if !err.is_retryable() {
            return None;
        }
        Some(match err.retry_after() {
            Some(secs) => format!("{} is rate limiting; retry in {}s", err.service_name(), secs),
            None => format!("{} is temporarily unavailable; retry shortly", err.service_name()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            StepError::from(ValidationError::IncompleteCode(2)).user_message(messages::SEND_FAILED),
            messages::INCOMPLETE_CODE
        );
        assert_eq!(
            ValidationError::MissingUser.user_message(),
            messages::PHONE_NOT_VERIFIED
        );
    }

    #[test]
    fn test_transport_uses_generic_message() {
        let err = StepError::from(ApiError::network("otp", "refused"));
        assert_eq!(err.user_message(messages::SEND_FAILED), messages::SEND_FAILED);
        assert_eq!(
            err.user_message(messages::COMPANY_SAVE_FAILED),
            messages::COMPANY_SAVE_FAILED
        );
    }

    #[test]
    fn test_hint_for_transport_errors() {
        let auth = StepError::from(ApiError::unauthorized("storage"));
        assert!(auth.hint().unwrap().contains("ONBOARDING_BACKEND__ANON_KEY"));

        let limited = StepError::from(ApiError::rate_limited("otp", Some(30)));
        assert_eq!(
            limited.hint().as_deref(),
            Some("otp is rate limiting; retry in 30s")
        );

        let conflict = StepError::from(ApiError::http("tables", 409, "duplicate key"));
        assert!(conflict.hint().is_none());
        assert!(StepError::from(ValidationError::MissingUser).hint().is_none());
    }

    #[test]
    fn test_rejected_carries_its_message() {
        let err = StepError::Rejected(messages::CODE_REJECTED);
        assert_eq!(err.user_message(messages::SEND_FAILED), messages::CODE_REJECTED);
        assert_eq!(err.to_string(), format!("rejected: {}", messages::CODE_REJECTED));
    }
}
