//! Phone validation step: collect the 4-digit code, verify it, create the user.

use tracing::{debug, error, info, warn};

use crate::api::providers::to_row;
use crate::api::{ApiError, Services};
use crate::types::{NewUser, PendingRegistration, UserRow};
use crate::wizard::error::{messages, StepError, ValidationError};
use crate::wizard::WizardHost;

pub const CODE_LENGTH: usize = 4;

/// Where the step is in its submit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhonePhase {
    Idle,
    Submitting,
    Advanced,
}

/// The code being typed plus the feedback shown next to it
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationAttempt {
    digits: [Option<u8>; CODE_LENGTH],
    focus: usize,
    error: Option<&'static str>,
    phase: PhonePhase,
}

impl Default for VerificationAttempt {
    fn default() -> Self {
        Self {
            digits: [None; CODE_LENGTH],
            focus: 0,
            error: None,
            phase: PhonePhase::Idle,
        }
    }
}

impl VerificationAttempt {
    /// Apply an edit to one slot.
    ///
    /// Accepts `""` (clear) or a single ASCII digit; anything else, or an
    /// out-of-range slot, is rejected with no state change. Accepting a
    /// digit moves focus to the next slot.
    pub fn set_digit(&mut self, index: usize, input: &str) -> bool {
        if index >= CODE_LENGTH {
            return false;
        }
        let value = match input.as_bytes() {
            [] => None,
            [b] if b.is_ascii_digit() => Some(b - b'0'),
            _ => return false,
        };

        self.digits[index] = value;
        self.error = None;
        if value.is_some() && index + 1 < CODE_LENGTH {
            self.focus = index + 1;
        }
        true
    }

    /// Fill slots from a pasted string, one character per slot
    pub fn paste(&mut self, input: &str) -> bool {
        let chars: Vec<char> = input.trim().chars().collect();
        if chars.len() != CODE_LENGTH || !chars.iter().all(char::is_ascii_digit) {
            return false;
        }
        for (i, c) in chars.iter().enumerate() {
            self.set_digit(i, &c.to_string());
        }
        true
    }

    /// Filled slots concatenated in order
    pub fn code(&self) -> String {
        self.digits
            .iter()
            .flatten()
            .map(|d| char::from(b'0' + d))
            .collect()
    }

    pub fn digits(&self) -> &[Option<u8>; CODE_LENGTH] {
        &self.digits
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub fn phase(&self) -> PhonePhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == PhonePhase::Submitting
    }

    /// Whether the submit control is enabled
    pub fn can_submit(&self) -> bool {
        self.phase == PhonePhase::Idle
    }
}

/// First wizard step
#[derive(Debug, Default)]
pub struct PhoneValidationStep {
    pub attempt: VerificationAttempt,
}

impl PhoneValidationStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify the code and create the user, then advance the host one page.
    ///
    /// Returns the user id handed forward through `set_login`.
    pub async fn submit<H: WizardHost>(
        &mut self,
        services: &Services,
        host: &mut H,
    ) -> Result<String, StepError> {
        if self.attempt.phase == PhonePhase::Advanced {
            return Err(StepError::AlreadySubmitted);
        }

        let code = self.attempt.code();
        if code.len() < CODE_LENGTH {
            let err = ValidationError::IncompleteCode(code.len());
            self.attempt.error = Some(err.user_message());
            return Err(err.into());
        }

        self.attempt.phase = PhonePhase::Submitting;
        self.attempt.error = None;

        let login = host.login().clone();
        let result = verify_and_create(services, &login, &code).await;

        match result {
            Ok(user_id) => {
                host.set_login(login.with_user_id(&user_id));
                host.set_page(host.page() + 1);
                self.attempt.phase = PhonePhase::Advanced;
                info!(user_id = %user_id, "{}", messages::ACCOUNT_VERIFIED);
                Ok(user_id)
            }
            Err(err) => {
                match &err {
                    StepError::Rejected(_) => {
                        warn!("Verification rejected for {}", login.phone_number);
                    }
                    other => error!("Phone verification failed: {}", other),
                }
                self.attempt.phase = PhonePhase::Idle;
                self.attempt.error = Some(err.user_message(messages::SEND_FAILED));
                Err(err)
            }
        }
    }

    /// Return to the previous page
    pub fn back<H: WizardHost>(&self, host: &mut H) {
        host.set_page(host.page().saturating_sub(1));
    }
}

async fn verify_and_create(
    services: &Services,
    login: &PendingRegistration,
    code: &str,
) -> Result<String, StepError> {
    if !services.otp.verify(&login.phone_number, code).await? {
        return Err(StepError::Rejected(messages::CODE_REJECTED));
    }
    Ok(find_or_create_user(services, login).await?)
}

/// Create the user row once per phone number.
///
/// An existing row for the same phone is reused, so resubmitting after a
/// later failure does not duplicate users.
pub async fn find_or_create_user(
    services: &Services,
    login: &PendingRegistration,
) -> Result<String, ApiError> {
    let table = &services.backend.users_table;
    let service = services.tables.name().to_string();

    let existing = services
        .tables
        .select_eq(table, "phone_number", &login.phone_number)
        .await?;
    if let Some(row) = existing.into_iter().next() {
        let user: UserRow =
            serde_json::from_value(row).map_err(|e| ApiError::parse(&service, e.to_string()))?;
        debug!("Reusing existing user {} for {}", user.id, login.phone_number);
        return Ok(user.id);
    }

    let row = to_row(&service, &NewUser::from(login))?;
    let created = services.tables.insert_returning(table, row).await?;
    let user: UserRow =
        serde_json::from_value(created).map_err(|e| ApiError::parse(&service, e.to_string()))?;
    Ok(user.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::providers::mock::{MockBackend, MockCall};
    use crate::wizard::{Wizard, WizardStage};
    use serde_json::json;

    fn wizard() -> Wizard {
        Wizard::new(PendingRegistration::new("Sara", "0500000000", "secret"))
    }

    fn typed(code: &str) -> PhoneValidationStep {
        let mut step = PhoneValidationStep::new();
        for (i, c) in code.chars().enumerate() {
            assert!(step.attempt.set_digit(i, &c.to_string()));
        }
        step
    }

    #[test]
    fn test_non_digit_input_leaves_state_unchanged() {
        let mut attempt = VerificationAttempt::default();
        attempt.set_digit(0, "7");
        let before = attempt.clone();

        for input in ["a", "12", " ", "٣", "-", "7 "] {
            assert!(!attempt.set_digit(1, input), "accepted {:?}", input);
            assert_eq!(attempt, before);
        }
        assert!(!attempt.set_digit(4, "1"));
        assert_eq!(attempt, before);
    }

    #[test]
    fn test_digit_advances_focus_until_last_slot() {
        let mut attempt = VerificationAttempt::default();
        attempt.set_digit(0, "1");
        assert_eq!(attempt.focus(), 1);
        attempt.set_digit(3, "4");
        assert_eq!(attempt.focus(), 1);
        attempt.set_digit(2, "3");
        assert_eq!(attempt.focus(), 3);
        attempt.set_digit(3, "4");
        assert_eq!(attempt.focus(), 3);
    }

    #[test]
    fn test_clearing_a_slot() {
        let mut attempt = VerificationAttempt::default();
        attempt.set_digit(0, "1");
        attempt.set_digit(1, "2");
        assert!(attempt.set_digit(0, ""));
        assert_eq!(attempt.code(), "2");
        assert_eq!(attempt.focus(), 2);
    }

    #[test]
    fn test_paste_fills_all_slots() {
        let mut attempt = VerificationAttempt::default();
        assert!(attempt.paste(" 9876 "));
        assert_eq!(attempt.code(), "9876");
        assert!(!attempt.paste("98a6"));
        assert_eq!(attempt.code(), "9876");
    }

    #[tokio::test]
    async fn test_incomplete_code_makes_no_calls() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut host = wizard();
        let mut step = typed("12");

        let err = step.submit(&services, &mut host).await.unwrap_err();
        assert!(matches!(
            err,
            StepError::Validation(ValidationError::IncompleteCode(2))
        ));
        assert_eq!(step.attempt.error(), Some(messages::INCOMPLETE_CODE));
        assert!(backend.log.calls().is_empty());
        assert_eq!(host.stage(), WizardStage::PhoneValidation);
    }

    #[tokio::test]
    async fn test_verified_code_creates_one_user_and_advances() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut host = wizard();
        let mut step = typed("1234");

        let user_id = step.submit(&services, &mut host).await.unwrap();

        let calls = backend.log.calls();
        assert_eq!(
            calls[0],
            MockCall::Verify {
                phone: "0500000000".to_string(),
                code: "1234".to_string()
            }
        );
        let inserts = backend.log.inserts_into("users");
        assert_eq!(inserts.len(), 1);
        assert_eq!(
            inserts[0],
            json!({"name": "Sara", "phone_number": "0500000000", "password": "secret"})
        );
        assert_eq!(host.page(), 1);
        assert_eq!(host.login().user_id.as_deref(), Some(user_id.as_str()));
        assert_eq!(step.attempt.phase(), PhonePhase::Advanced);
        assert!(!step.attempt.is_loading());
    }

    #[tokio::test]
    async fn test_rejected_code_creates_no_user() {
        let backend = MockBackend::new();
        backend.otp.answer(Ok(false));
        let services = backend.services();
        let mut host = wizard();
        let mut step = typed("0000");

        let err = step.submit(&services, &mut host).await.unwrap_err();
        assert!(matches!(err, StepError::Rejected(_)));
        assert_eq!(step.attempt.error(), Some(messages::CODE_REJECTED));
        assert!(backend.log.inserts_into("users").is_empty());
        assert_eq!(host.page(), 0);
        assert_eq!(step.attempt.phase(), PhonePhase::Idle);
    }

    #[tokio::test]
    async fn test_transport_failure_is_retryable() {
        let backend = MockBackend::new();
        backend
            .otp
            .answer(Err(ApiError::network("otp", "connection refused")));
        let services = backend.services();
        let mut host = wizard();
        let mut step = typed("1234");

        let err = step.submit(&services, &mut host).await.unwrap_err();
        assert!(matches!(err, StepError::Transport(_)));
        assert_eq!(step.attempt.error(), Some(messages::SEND_FAILED));
        assert!(step.attempt.can_submit());

        backend.otp.answer(Ok(true));
        step.submit(&services, &mut host).await.unwrap();
        assert_eq!(host.page(), 1);
    }

    #[tokio::test]
    async fn test_user_insert_failure_does_not_advance() {
        let backend = MockBackend::new();
        backend.tables.fail_inserts_into("users");
        let services = backend.services();
        let mut host = wizard();
        let mut step = typed("1234");

        let err = step.submit(&services, &mut host).await.unwrap_err();
        assert!(matches!(err, StepError::Transport(_)));
        assert_eq!(step.attempt.error(), Some(messages::SEND_FAILED));
        assert_eq!(host.page(), 0);
        assert!(host.login().user_id.is_none());
        assert!(!step.attempt.is_loading());
    }

    #[tokio::test]
    async fn test_resubmission_reuses_existing_user() {
        let backend = MockBackend::new();
        let services = backend.services();

        let mut first = wizard();
        let id = typed("1234").submit(&services, &mut first).await.unwrap();

        let mut again = wizard();
        let id_again = typed("1234").submit(&services, &mut again).await.unwrap();

        assert_eq!(id, id_again);
        assert_eq!(backend.log.inserts_into("users").len(), 1);
        assert_eq!(backend.tables.rows("users").len(), 1);
    }

    #[tokio::test]
    async fn test_second_submit_after_advance_is_refused() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut host = wizard();
        let mut step = typed("1234");

        step.submit(&services, &mut host).await.unwrap();
        assert_eq!(host.stage(), WizardStage::CompanyRegistration);
        assert!(!step.attempt.can_submit());
        let calls = backend.log.calls().len();

        let err = step.submit(&services, &mut host).await.unwrap_err();
        assert!(matches!(err, StepError::AlreadySubmitted));
        assert_eq!(host.stage(), WizardStage::CompanyRegistration);
        assert_eq!(backend.log.calls().len(), calls);
    }

    #[test]
    fn test_back_navigates_one_page() {
        let mut host = wizard();
        host.set_page(1);
        PhoneValidationStep::new().back(&mut host);
        assert_eq!(host.page(), 0);
        PhoneValidationStep::new().back(&mut host);
        assert_eq!(host.page(), 0);
    }
}
