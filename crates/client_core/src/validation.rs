//! Completion predicates gating wizard transitions. Pure and infallible.

use shared::domain::{PatientForm, MAX_UPLOAD_BYTES};

use crate::uploads::{UploadItem, UploadRejection, UploadSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientField {
    FullName,
    Age,
    Gender,
    Phone,
}

impl PatientField {
    pub fn label(self) -> &'static str {
        match self {
            PatientField::FullName => "full name",
            PatientField::Age => "age",
            PatientField::Gender => "gender",
            PatientField::Phone => "phone number",
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Required fields that are still empty, in form order.
pub fn missing_patient_fields(form: &PatientForm) -> Vec<PatientField> {
    let mut missing = Vec::new();
    if is_blank(&form.full_name) {
        missing.push(PatientField::FullName);
    }
    if is_blank(&form.age) {
        missing.push(PatientField::Age);
    }
    if form.gender.is_none() {
        missing.push(PatientField::Gender);
    }
    if is_blank(&form.phone) {
        missing.push(PatientField::Phone);
    }
    missing
}

pub fn is_patient_info_complete(form: &PatientForm) -> bool {
    missing_patient_fields(form).is_empty()
}

pub fn validate_upload(item: &UploadItem) -> Result<(), UploadRejection> {
    if !item.is_image() {
        return Err(UploadRejection::NotAnImage {
            filename: item.filename().to_string(),
            mime_type: item.mime_type().to_string(),
        });
    }
    if item.size_bytes() > MAX_UPLOAD_BYTES {
        return Err(UploadRejection::TooLarge {
            filename: item.filename().to_string(),
            size_bytes: item.size_bytes(),
        });
    }
    Ok(())
}

pub fn is_upload_complete(uploads: &UploadSet) -> bool {
    !uploads.is_empty() && uploads.items().iter().all(|item| validate_upload(item).is_ok())
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
