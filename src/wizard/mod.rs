//! Onboarding wizard: a page index, the pending registration and the steps
//! that move between pages.

pub mod debounce;
pub mod error;
pub mod steps;

pub use debounce::{AddressDebouncer, Resolution};
pub use error::{messages, StepError, ValidationError};
pub use steps::company::{
    CompanyDraft, CompanyRegistrationStep, CompanySnapshot, DocumentFailure, IntakeReport,
    SubmissionReport,
};
pub use steps::phone::{find_or_create_user, PhonePhase, PhoneValidationStep, VerificationAttempt};

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::PendingRegistration;

/// What a step may read and change on the wizard that hosts it
pub trait WizardHost {
    fn page(&self) -> usize;
    fn set_page(&mut self, page: usize);
    fn login(&self) -> &PendingRegistration;
    fn set_login(&mut self, login: PendingRegistration);
}

/// Wizard pages in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStage {
    PhoneValidation,
    CompanyRegistration,
    Complete,
}

impl WizardStage {
    pub fn all() -> &'static [WizardStage] {
        &[
            WizardStage::PhoneValidation,
            WizardStage::CompanyRegistration,
            WizardStage::Complete,
        ]
    }

    /// Pages past the last one count as complete
    pub fn from_page(page: usize) -> Self {
        match page {
            0 => WizardStage::PhoneValidation,
            1 => WizardStage::CompanyRegistration,
            _ => WizardStage::Complete,
        }
    }

    pub fn page(self) -> usize {
        match self {
            WizardStage::PhoneValidation => 0,
            WizardStage::CompanyRegistration => 1,
            WizardStage::Complete => 2,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStage::PhoneValidation => "Phone verification",
            WizardStage::CompanyRegistration => "Company registration",
            WizardStage::Complete => "Done",
        }
    }
}

const LAST_PAGE: usize = 2;

/// Resumable wizard state, saved between runs as JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wizard {
    #[serde(default)]
    page: usize,
    #[serde(default)]
    login: PendingRegistration,
    #[serde(default)]
    pub company: CompanySnapshot,
}

impl Wizard {
    pub fn new(login: PendingRegistration) -> Self {
        Self {
            page: 0,
            login,
            company: CompanySnapshot::default(),
        }
    }

    pub fn stage(&self) -> WizardStage {
        WizardStage::from_page(self.page)
    }

    pub fn is_complete(&self) -> bool {
        self.stage() == WizardStage::Complete
    }

    pub fn back(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Keep the company form fields so a later run can pick them up
    pub fn record_company(&mut self, step: &CompanyRegistrationStep) {
        self.company = step.snapshot();
    }

    /// Load a saved draft; a missing file starts a fresh wizard
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No wizard draft at {}", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read wizard draft {}", path.display()))?;
        let mut wizard: Wizard = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse wizard draft {}", path.display()))?;
        wizard.page = wizard.page.min(LAST_PAGE);
        Ok(wizard)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create draft directory")?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write wizard draft {}", path.display()))?;
        Ok(())
    }
}

impl WizardHost for Wizard {
    fn page(&self) -> usize {
        self.page
    }

    fn set_page(&mut self, page: usize) {
        self.page = page.min(LAST_PAGE);
    }

    fn login(&self) -> &PendingRegistration {
        &self.login
    }

    fn set_login(&mut self, login: PendingRegistration) {
        self.login = login;
    }
}
