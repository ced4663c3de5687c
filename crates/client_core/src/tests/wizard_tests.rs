use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::{
    domain::{Gender, PREDICTION_RESULTS_KEY},
    protocol::PredictResponse,
};
use storage::{MemorySlotStore, SlotStore};

use super::*;
use crate::{
    endpoint::{AnalysisEndpoint, EndpointError},
    results::{summarize, ResultsStore},
};

struct ScriptedEndpoint {
    labels: Vec<&'static str>,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedEndpoint {
    fn answering(labels: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            labels,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            labels: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisEndpoint for ScriptedEndpoint {
    async fn predict(&self, item: &UploadItem) -> Result<PredictResponse, EndpointError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EndpointError::Status {
                status: 500,
                detail: None,
            });
        }
        let index: usize = item
            .filename()
            .trim_start_matches("rbc_sample_")
            .trim_end_matches(".jpg")
            .parse::<usize>()
            .map(|n| n - 1)
            .unwrap_or(0);
        Ok(PredictResponse {
            result: self.labels[index].to_string(),
            code: None,
        })
    }
}

fn coordinator(endpoint: Arc<ScriptedEndpoint>) -> (SubmissionCoordinator, Arc<MemorySlotStore>) {
    let slots = Arc::new(MemorySlotStore::new());
    let coordinator = SubmissionCoordinator::new(endpoint, ResultsStore::new(slots.clone()));
    (coordinator, slots)
}

fn sample(n: usize) -> UploadItem {
    UploadItem::new(format!("rbc_sample_{n}.jpg"), "image/jpeg", vec![0xD8; 2048])
}

fn fill_patient(form: &mut PatientForm) {
    form.full_name = "John Doe".into();
    form.age = "32".into();
    form.gender = Some(Gender::Male);
    form.phone = "+1-555-123-4567".into();
}

fn session_at_review() -> WizardSession {
    let mut session = WizardSession::new();
    session.edit_patient(fill_patient).expect("edit");
    assert!(session.next());
    session
        .admit_uploads(vec![sample(1), sample(2)])
        .expect("admit");
    assert!(session.next());
    assert_eq!(session.current_step(), WizardStep::Review);
    session
}

#[test]
fn starts_on_patient_info_with_all_flags_cleared() {
    let session = WizardSession::new();
    assert_eq!(session.state(), WizardState::default());
    assert_eq!(session.current_step(), WizardStep::PatientInfo);
    assert!(!session.is_step_reachable(WizardStep::UploadImages));
    assert!(!session.is_step_reachable(WizardStep::Review));
}

#[test]
fn next_is_a_no_op_until_patient_info_is_complete() {
    let mut session = WizardSession::new();
    assert!(!session.next());

    let complete = session
        .edit_patient(|form| {
            form.full_name = "John Doe".into();
            form.age = "32".into();
        })
        .expect("edit");
    assert!(!complete);
    assert!(!session.next());
    assert_eq!(session.current_step(), WizardStep::PatientInfo);

    assert!(session.edit_patient(fill_patient).expect("edit"));
    assert!(session.next());
    assert_eq!(session.current_step(), WizardStep::UploadImages);
}

#[test]
fn review_requires_an_admitted_upload() {
    let mut session = WizardSession::new();
    session.edit_patient(fill_patient).expect("edit");
    session.next();

    assert!(!session.next());
    let err = session
        .admit_uploads(vec![UploadItem::new("a.gif.exe", "application/x-msdownload", vec![0])])
        .expect_err("non-image must be rejected");
    assert_eq!(err.user_message(), "Please upload only image files.");
    assert!(!session.next());

    session.admit_uploads(vec![sample(1)]).expect("admit");
    assert!(session.state().upload_complete);
    session.remove_upload(0).expect("remove");
    assert!(!session.state().upload_complete);
    assert!(!session.next());

    session.admit_uploads(vec![sample(1)]).expect("admit");
    assert!(session.next());
    assert_eq!(session.current_step(), WizardStep::Review);
}

#[test]
fn edits_are_confined_to_their_owning_step() {
    let mut session = WizardSession::new();
    assert!(matches!(
        session.admit_uploads(vec![sample(1)]),
        Err(WizardError::StepLocked {
            owner: WizardStep::UploadImages,
            ..
        })
    ));
    assert!(matches!(
        session.set_consent(true),
        Err(WizardError::StepLocked {
            owner: WizardStep::Review,
            ..
        })
    ));

    let mut session = session_at_review();
    assert!(matches!(
        session.edit_patient(|form| form.full_name.clear()),
        Err(WizardError::StepLocked { .. })
    ));
    assert_eq!(session.patient().full_name, "John Doe");
}

#[test]
fn moving_backward_keeps_entered_data() {
    let mut session = session_at_review();
    session.set_consent(true).expect("consent");

    assert_eq!(session.back(), WizardStep::UploadImages);
    assert_eq!(session.back(), WizardStep::PatientInfo);
    assert_eq!(session.back(), WizardStep::PatientInfo);

    assert_eq!(session.patient().full_name, "John Doe");
    assert_eq!(session.uploads().len(), 2);
    assert!(session.state().consent_given);

    session.select_step(WizardStep::Review).expect("tab jump");
    assert_eq!(session.current_step(), WizardStep::Review);
}

#[test]
fn tab_selection_respects_completion_flags() {
    let mut session = WizardSession::new();
    assert!(matches!(
        session.select_step(WizardStep::UploadImages),
        Err(WizardError::StepUnreachable { .. })
    ));

    session.edit_patient(fill_patient).expect("edit");
    session.select_step(WizardStep::UploadImages).expect("reachable");
    assert!(session.select_step(WizardStep::Review).is_err());

    session.select_step(WizardStep::PatientInfo).expect("backward");
    session.edit_patient(|form| form.phone.clear()).expect("edit");
    assert!(session.select_step(WizardStep::UploadImages).is_err());
    assert!(session.select_step(WizardStep::Submitted).is_err());
}

#[tokio::test]
async fn submission_without_consent_fails_before_any_request() {
    let endpoint = ScriptedEndpoint::answering(vec!["Detected", "No sickle cells"]);
    let (coordinator, slots) = coordinator(endpoint.clone());
    let mut session = session_at_review();

    let err = session
        .submit(&coordinator)
        .await
        .expect_err("consent is required");
    assert!(matches!(
        err,
        WizardError::Validation(ValidationError::ConsentRequired)
    ));
    assert_eq!(err.user_message(), "Please provide consent before submitting.");
    assert_eq!(session.current_step(), WizardStep::Review);
    assert_eq!(endpoint.calls(), 0);
    assert!(slots.is_empty().await);
}

#[tokio::test]
async fn submission_without_images_fails_before_any_request() {
    let endpoint = ScriptedEndpoint::answering(vec![]);
    let (coordinator, slots) = coordinator(endpoint.clone());
    let mut session = WizardSession::new();
    session.edit_patient(fill_patient).expect("edit");
    session.state.current_step = WizardStep::Review;
    session.state.consent_given = true;

    let err = session
        .submit(&coordinator)
        .await
        .expect_err("images are required");
    assert!(matches!(err, WizardError::Validation(ValidationError::NoImages)));
    assert_eq!(err.user_message(), "Please upload at least one image.");
    assert_eq!(endpoint.calls(), 0);
    assert!(slots.is_empty().await);
}

#[tokio::test]
async fn full_flow_persists_ordered_results() {
    let endpoint = ScriptedEndpoint::answering(vec!["Detected", "No sickle cells"]);
    let (coordinator, slots) = coordinator(endpoint.clone());
    let mut session = session_at_review();
    session.set_consent(true).expect("consent");

    let receipt = session.submit(&coordinator).await.expect("submit");
    assert_eq!(session.current_step(), WizardStep::Submitted);
    assert_eq!(receipt.route, crate::Route::Results);
    assert_eq!(endpoint.calls(), 2);

    let stored = coordinator
        .results_store()
        .load()
        .await
        .expect("load")
        .expect("envelope");
    assert_eq!(stored.labels(), vec!["Detected", "No sickle cells"]);
    assert!(slots
        .get_slot(PREDICTION_RESULTS_KEY)
        .await
        .expect("slot")
        .is_some());

    let summary = summarize(&stored.results);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.detected, 1);
    assert_eq!(summary.normal, 1);
    assert!(summary.overall_detected);

    assert!(session.set_consent(false).is_err());
    assert!(session.select_step(WizardStep::PatientInfo).is_err());
}

#[tokio::test]
async fn failed_submission_returns_to_review_for_retry() {
    let endpoint = ScriptedEndpoint::failing();
    let (coordinator, slots) = coordinator(endpoint.clone());
    let mut session = session_at_review();
    session.set_consent(true).expect("consent");

    let err = session
        .submit(&coordinator)
        .await
        .expect_err("endpoint failure");
    assert!(matches!(err, WizardError::Submission(_)));
    assert_eq!(
        err.user_message(),
        "An error occurred while submitting your images."
    );
    assert_eq!(session.current_step(), WizardStep::Review);
    assert!(slots.is_empty().await);
}
