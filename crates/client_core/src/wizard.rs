//! Forward-gated, free-backward detection wizard.
//!
//! The session owns the patient form and the upload set. Patient fields are
//! editable only on the patient-info step, uploads only on the upload step and
//! consent only on review; a dispatched submission locks everything.

use shared::domain::PatientForm;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    submission::{SubmissionCoordinator, SubmissionError, SubmissionReceipt},
    uploads::{UploadItem, UploadRejection, UploadSet},
    validation::{is_patient_info_complete, is_upload_complete, missing_patient_fields, PatientField},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WizardStep {
    PatientInfo,
    UploadImages,
    Review,
    Submitted,
}

impl WizardStep {
    pub fn title(self) -> &'static str {
        match self {
            WizardStep::PatientInfo => "1. Patient Information",
            WizardStep::UploadImages => "2. Upload RBC Images",
            WizardStep::Review => "3. Review & Submit",
            WizardStep::Submitted => "Submitted",
        }
    }

    fn previous(self) -> Self {
        match self {
            WizardStep::PatientInfo | WizardStep::UploadImages => WizardStep::PatientInfo,
            WizardStep::Review => WizardStep::UploadImages,
            WizardStep::Submitted => WizardStep::Submitted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardState {
    pub current_step: WizardStep,
    pub form_complete: bool,
    pub upload_complete: bool,
    pub consent_given: bool,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            current_step: WizardStep::PatientInfo,
            form_complete: false,
            upload_complete: false,
            consent_given: false,
        }
    }
}

fn field_list(fields: &[PatientField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Input problems caught locally, before anything reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required patient fields: {}", field_list(.0))]
    MissingPatientFields(Vec<PatientField>),
    #[error(transparent)]
    Upload(#[from] UploadRejection),
    #[error("no images uploaded")]
    NoImages,
    #[error("consent not given")]
    ConsentRequired,
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::MissingPatientFields(_) => "Please complete all required patient fields.",
            ValidationError::Upload(rejection) => rejection.user_message(),
            ValidationError::NoImages => "Please upload at least one image.",
            ValidationError::ConsentRequired => "Please provide consent before submitting.",
        }
    }
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("step '{target:?}' is not reachable yet")]
    StepUnreachable { target: WizardStep },
    #[error("{action} is only allowed on the '{owner:?}' step (current step '{current:?}')")]
    StepLocked {
        action: &'static str,
        owner: WizardStep,
        current: WizardStep,
    },
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl WizardError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WizardError::Validation(err) => err.user_message(),
            WizardError::StepUnreachable { .. } => "Complete the previous steps first.",
            WizardError::StepLocked { .. } => "This information cannot be changed at this step.",
            WizardError::Submission(err) => err.user_message(),
        }
    }
}

impl From<UploadRejection> for WizardError {
    fn from(value: UploadRejection) -> Self {
        WizardError::Validation(ValidationError::Upload(value))
    }
}

/// One run of the detection flow.
#[derive(Debug, Clone, Default)]
pub struct WizardSession {
    patient: PatientForm,
    uploads: UploadSet,
    state: WizardState,
}

impl WizardSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn current_step(&self) -> WizardStep {
        self.state.current_step
    }

    pub fn patient(&self) -> &PatientForm {
        &self.patient
    }

    pub fn uploads(&self) -> &UploadSet {
        &self.uploads
    }

    fn ensure_step(&self, owner: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if self.state.current_step == owner {
            Ok(())
        } else {
            Err(WizardError::StepLocked {
                action,
                owner,
                current: self.state.current_step,
            })
        }
    }

    /// Applies an edit to the patient form and returns whether the form is
    /// now complete.
    pub fn edit_patient(
        &mut self,
        edit: impl FnOnce(&mut PatientForm),
    ) -> Result<bool, WizardError> {
        self.ensure_step(WizardStep::PatientInfo, "editing patient information")?;
        edit(&mut self.patient);
        self.state.form_complete = is_patient_info_complete(&self.patient);
        Ok(self.state.form_complete)
    }

    pub fn admit_uploads(&mut self, batch: Vec<UploadItem>) -> Result<usize, WizardError> {
        self.ensure_step(WizardStep::UploadImages, "adding images")?;
        let admitted = self.uploads.admit(batch).map_err(|rejection| {
            warn!(%rejection, "upload batch rejected");
            rejection
        })?;
        self.state.upload_complete = is_upload_complete(&self.uploads);
        Ok(admitted)
    }

    pub fn remove_upload(&mut self, index: usize) -> Result<Option<UploadItem>, WizardError> {
        self.ensure_step(WizardStep::UploadImages, "removing images")?;
        let removed = self.uploads.remove(index);
        self.state.upload_complete = is_upload_complete(&self.uploads);
        Ok(removed)
    }

    pub fn set_consent(&mut self, consent: bool) -> Result<(), WizardError> {
        self.ensure_step(WizardStep::Review, "recording consent")?;
        self.state.consent_given = consent;
        Ok(())
    }

    pub fn is_step_reachable(&self, step: WizardStep) -> bool {
        match step {
            WizardStep::PatientInfo => true,
            WizardStep::UploadImages => self.state.form_complete,
            WizardStep::Review => self.state.form_complete && self.state.upload_complete,
            WizardStep::Submitted => false,
        }
    }

    /// Moves one step forward when the current step's gate holds. Returns
    /// whether the step changed.
    pub fn next(&mut self) -> bool {
        let target = match self.state.current_step {
            WizardStep::PatientInfo if is_patient_info_complete(&self.patient) => {
                self.state.form_complete = true;
                WizardStep::UploadImages
            }
            WizardStep::UploadImages
                if self.state.form_complete && is_upload_complete(&self.uploads) =>
            {
                self.state.upload_complete = true;
                WizardStep::Review
            }
            _ => return false,
        };
        self.state.current_step = target;
        true
    }

    /// Moves one step back. Entered data is kept.
    pub fn back(&mut self) -> WizardStep {
        self.state.current_step = self.state.current_step.previous();
        self.state.current_step
    }

    /// Jumps to a step the way a tab click does.
    pub fn select_step(&mut self, step: WizardStep) -> Result<(), WizardError> {
        let locked = self.state.current_step == WizardStep::Submitted;
        let gated = step > self.state.current_step && !self.is_step_reachable(step);
        if locked || gated || step == WizardStep::Submitted {
            return Err(WizardError::StepUnreachable { target: step });
        }
        self.state.current_step = step;
        Ok(())
    }

    /// Checks the review → submitted gate and returns the batch to analyse.
    pub fn prepare_submission(&self) -> Result<Vec<UploadItem>, WizardError> {
        if self.state.current_step != WizardStep::Review {
            return Err(WizardError::StepUnreachable {
                target: WizardStep::Submitted,
            });
        }
        if self.uploads.is_empty() {
            return Err(ValidationError::NoImages.into());
        }
        if !self.state.consent_given {
            return Err(ValidationError::ConsentRequired.into());
        }
        let missing = missing_patient_fields(&self.patient);
        if !missing.is_empty() {
            return Err(ValidationError::MissingPatientFields(missing).into());
        }
        Ok(self.uploads.items().to_vec())
    }

    /// Dispatches the submission. On failure the session returns to review so
    /// the user can retry.
    pub async fn submit(
        &mut self,
        coordinator: &SubmissionCoordinator,
    ) -> Result<SubmissionReceipt, WizardError> {
        let batch = self.prepare_submission()?;
        self.state.current_step = WizardStep::Submitted;
        match coordinator.submit(&batch).await {
            Ok(receipt) => {
                info!(
                    submission_id = %receipt.submission_id,
                    count = receipt.results.len(),
                    "wizard submission complete"
                );
                Ok(receipt)
            }
            Err(err) => {
                self.state.current_step = WizardStep::Review;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
