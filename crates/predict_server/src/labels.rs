use shared::{domain::ResultCode, protocol::PredictResponse};

pub const DETECTED_LABEL: &str = "Detected";
pub const NOT_DETECTED_LABEL: &str = "No sickle cells detected";
const DETECTED_KEYWORD: &str = "sickle";

/// How the stub picks a label. No pixels are inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelPolicy {
    Fixed(String),
    /// `Detected` when the filename contains the keyword, case-insensitively.
    FilenameKeyword,
}

impl LabelPolicy {
    pub fn from_fixed_label(fixed_label: Option<String>) -> Self {
        match fixed_label {
            Some(label) => LabelPolicy::Fixed(label),
            None => LabelPolicy::FilenameKeyword,
        }
    }

    pub fn label_for(&self, filename: &str) -> PredictResponse {
        match self {
            LabelPolicy::Fixed(label) => PredictResponse {
                code: Some(ResultCode::from_legacy_label(label)),
                result: label.clone(),
            },
            LabelPolicy::FilenameKeyword => {
                if filename.to_ascii_lowercase().contains(DETECTED_KEYWORD) {
                    PredictResponse {
                        result: DETECTED_LABEL.into(),
                        code: Some(ResultCode::Detected),
                    }
                } else {
                    PredictResponse {
                        result: NOT_DETECTED_LABEL.into(),
                        code: Some(ResultCode::NotDetected),
                    }
                }
            }
        }
    }
}
