use std::{sync::Arc, time::Duration};

use shared::{
    domain::{PatientForm, ResultCode, SubmissionId, PREDICTION_RESULTS_KEY},
    protocol::{PredictionEnvelopeV1, StoredPrediction, PREDICTION_ENVELOPE_VERSION},
};
use storage::SlotStore;
use thiserror::Error;
use tracing::{info, warn};

use crate::{pacing::Pacer, wizard::WizardSession};

/// Shown next to the metrics. Fixed mock value, not derived from any model
/// output.
pub const PLACEHOLDER_CONFIDENCE_PERCENT: u8 = 87;
pub const ANALYSIS_PACING: Duration = Duration::from_millis(2000);
pub const DETAILS_REVEAL_DELAY: Duration = Duration::from_millis(500);
pub const PENDING_LABEL: &str = "Pending";

#[derive(Debug, Error)]
pub enum ResultsStoreError {
    #[error("storage failure: {0}")]
    Storage(#[source] anyhow::Error),
    #[error("failed to encode prediction results: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("stored prediction results are unreadable: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("stored prediction results use unsupported version {0}")]
    UnsupportedVersion(u64),
}

/// Typed access to the `predictionResults` slot.
#[derive(Clone)]
pub struct ResultsStore {
    slots: Arc<dyn SlotStore>,
}

impl ResultsStore {
    pub fn new(slots: Arc<dyn SlotStore>) -> Self {
        Self { slots }
    }

    pub async fn save(&self, envelope: &PredictionEnvelopeV1) -> Result<(), ResultsStoreError> {
        let encoded = serde_json::to_string(envelope).map_err(ResultsStoreError::Encode)?;
        self.slots
            .put_slot(PREDICTION_RESULTS_KEY, &encoded)
            .await
            .map_err(ResultsStoreError::Storage)
    }

    /// `Ok(None)` when nothing was ever submitted. A bare JSON array of labels
    /// is read as a pre-envelope payload.
    pub async fn load(&self) -> Result<Option<PredictionEnvelopeV1>, ResultsStoreError> {
        let Some(raw) = self
            .slots
            .get_slot(PREDICTION_RESULTS_KEY)
            .await
            .map_err(ResultsStoreError::Storage)?
        else {
            return Ok(None);
        };

        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(ResultsStoreError::Decode)?;
        if value.is_array() {
            let labels: Vec<String> =
                serde_json::from_value(value).map_err(ResultsStoreError::Decode)?;
            info!(count = labels.len(), "migrating legacy prediction results");
            return Ok(Some(migrate_legacy_labels(labels)));
        }

        match value.get("version").and_then(serde_json::Value::as_u64) {
            Some(version) if version == u64::from(PREDICTION_ENVELOPE_VERSION) => {
                serde_json::from_value(value)
                    .map(Some)
                    .map_err(ResultsStoreError::Decode)
            }
            Some(version) => Err(ResultsStoreError::UnsupportedVersion(version)),
            None => serde_json::from_value::<PredictionEnvelopeV1>(value)
                .map(Some)
                .map_err(ResultsStoreError::Decode),
        }
    }
}

fn migrate_legacy_labels(labels: Vec<String>) -> PredictionEnvelopeV1 {
    let results = labels
        .into_iter()
        .map(|label| StoredPrediction {
            code: ResultCode::from_legacy_label(&label),
            label,
        })
        .collect();
    PredictionEnvelopeV1::new(SubmissionId::new(), results)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultsSummary {
    pub total: usize,
    pub detected: usize,
    pub normal: usize,
    pub overall_detected: bool,
    pub placeholder_confidence_percent: u8,
}

pub fn summarize(results: &[StoredPrediction]) -> ResultsSummary {
    let detected = results
        .iter()
        .filter(|r| r.code == ResultCode::Detected)
        .count();
    let normal = results
        .iter()
        .filter(|r| r.code == ResultCode::NotDetected)
        .count();
    ResultsSummary {
        total: results.len(),
        detected,
        normal,
        overall_detected: detected > 0,
        placeholder_confidence_percent: PLACEHOLDER_CONFIDENCE_PERCENT,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientSummary {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub location: String,
}

impl From<&PatientForm> for PatientSummary {
    fn from(form: &PatientForm) -> Self {
        Self {
            name: form.full_name.trim().to_string(),
            age: form.age.trim().to_string(),
            gender: form
                .gender
                .map(|g| g.as_str().to_string())
                .unwrap_or_default(),
            location: form.location().unwrap_or("N/A").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResultRow {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsView {
    pub submission_id: Option<SubmissionId>,
    pub summary: ResultsSummary,
    pub labels: Vec<String>,
    pub images: Vec<ImageResultRow>,
    pub patient: Option<PatientSummary>,
}

impl ResultsView {
    /// Builds the view model. With a session, rows follow its uploads and
    /// missing labels read [`PENDING_LABEL`].
    pub fn build(envelope: Option<&PredictionEnvelopeV1>, session: Option<&WizardSession>) -> Self {
        let results = envelope.map(|e| e.results.as_slice()).unwrap_or_default();
        let labels: Vec<String> = results.iter().map(|r| r.label.clone()).collect();

        let images = match session {
            Some(session) => session
                .uploads()
                .filenames()
                .into_iter()
                .enumerate()
                .map(|(index, name)| ImageResultRow {
                    name: name.to_string(),
                    label: labels
                        .get(index)
                        .cloned()
                        .unwrap_or_else(|| PENDING_LABEL.to_string()),
                })
                .collect(),
            None => labels
                .iter()
                .enumerate()
                .map(|(index, label)| ImageResultRow {
                    name: format!("Sample {}", index + 1),
                    label: label.clone(),
                })
                .collect(),
        };

        Self {
            submission_id: envelope.map(|e| e.submission_id),
            summary: summarize(results),
            labels,
            images,
            patient: session.map(|s| PatientSummary::from(s.patient())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.total == 0
    }

    pub fn headline(&self) -> &'static str {
        if self.summary.overall_detected {
            "Sickle Cell Traits Detected"
        } else {
            "No Sickle Cell Traits Detected"
        }
    }

    pub fn advisory(&self) -> &'static str {
        if self.summary.overall_detected {
            "Our analysis has detected characteristics consistent with sickle cell disease. Please consult a healthcare professional for confirmation."
        } else {
            "No sickle cell characteristics were found, but you should consult a doctor for confirmation."
        }
    }

    pub fn interpretation(&self) -> String {
        let finding = if self.summary.overall_detected {
            "Sickle-shaped cells were detected. Please consult a medical professional for confirmation and further diagnosis."
        } else {
            "No sickle-shaped cells were detected. However, always confirm with a lab-based test."
        };
        format!(
            "The uploaded RBC samples have been analyzed for signs of sickle cell disease. {finding}"
        )
    }
}

/// Loads the stored results for display, pacing the reveal through `pacer`.
/// Missing or unreadable data renders as the empty state.
pub async fn load_results_view(
    store: &ResultsStore,
    pacer: &dyn Pacer,
    session: Option<&WizardSession>,
) -> ResultsView {
    let envelope = match store.load().await {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(%error, "ignoring stored prediction results");
            None
        }
    };

    pacer.pause(ANALYSIS_PACING).await;
    let view = ResultsView::build(envelope.as_ref(), session);
    pacer.pause(DETAILS_REVEAL_DELAY).await;
    view
}

#[cfg(test)]
#[path = "tests/results_tests.rs"]
mod tests;
