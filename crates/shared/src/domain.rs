use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable slot the submission coordinator writes and the results view reads.
pub const PREDICTION_RESULTS_KEY: &str = "predictionResults";
/// Per-file upload ceiling (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
/// Multipart field name carrying the image payload.
pub const UPLOAD_FIELD_NAME: &str = "file";

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(SubmissionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender '{other}' (expected male, female or other)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyHistory {
    None,
    Immediate,
    Extended,
    Unknown,
}

impl FromStr for FamilyHistory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(FamilyHistory::None),
            "immediate" => Ok(FamilyHistory::Immediate),
            "extended" => Ok(FamilyHistory::Extended),
            "unknown" => Ok(FamilyHistory::Unknown),
            other => Err(format!(
                "unknown family history '{other}' (expected none, immediate, extended or unknown)"
            )),
        }
    }
}

/// Patient metadata as entered on the first wizard step.
///
/// Age is kept as entered text; only `full_name`, `age`, `gender` and `phone`
/// are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientForm {
    pub full_name: String,
    pub age: String,
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_history: Option<FamilyHistory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_medications: Option<String>,
}

impl PatientForm {
    /// Location shown on review and results screens.
    pub fn location(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Classification of a single analysed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Detected,
    NotDetected,
    Unrecognized,
}

impl ResultCode {
    /// Classifies a free-text label from endpoints that do not send a code.
    pub fn from_legacy_label(label: &str) -> Self {
        if label.contains("Detected") {
            ResultCode::Detected
        } else if label.contains("No") {
            ResultCode::NotDetected
        } else {
            ResultCode::Unrecognized
        }
    }
}
