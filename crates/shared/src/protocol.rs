use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ResultCode, SubmissionId};

pub const PREDICTION_ENVELOPE_VERSION: u8 = 1;

/// Body returned by `POST /predict`.
///
/// `result` is mandatory. `code` is optional so label-only endpoints keep
/// working; callers fall back to [`ResultCode::from_legacy_label`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ResultCode>,
}

impl PredictResponse {
    pub fn resolved_code(&self) -> ResultCode {
        self.code
            .unwrap_or_else(|| ResultCode::from_legacy_label(&self.result))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub label: String,
    pub code: ResultCode,
}

impl From<PredictResponse> for StoredPrediction {
    fn from(value: PredictResponse) -> Self {
        let code = value.resolved_code();
        Self {
            label: value.result,
            code,
        }
    }
}

/// Contents of the `predictionResults` slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionEnvelopeV1 {
    pub version: u8,
    pub submission_id: SubmissionId,
    pub created_at: DateTime<Utc>,
    pub results: Vec<StoredPrediction>,
}

impl PredictionEnvelopeV1 {
    pub fn new(submission_id: SubmissionId, results: Vec<StoredPrediction>) -> Self {
        Self {
            version: PREDICTION_ENVELOPE_VERSION,
            submission_id,
            created_at: Utc::now(),
            results,
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.label.as_str()).collect()
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
