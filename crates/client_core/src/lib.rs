//! Detection wizard core: step sequencing, upload admission, submission to
//! the analysis endpoint and the results view model. Rendering lives in the
//! front ends.

use shared::domain::SubmissionId;

pub mod config;
pub mod content;
pub mod endpoint;
pub mod pacing;
pub mod results;
pub mod submission;
pub mod uploads;
pub mod validation;
pub mod wizard;

pub use endpoint::{AnalysisEndpoint, EndpointError, HttpAnalysisEndpoint};
pub use pacing::{Pacer, RecordingPacer, TokioPacer};
pub use results::{
    load_results_view, summarize, ResultsStore, ResultsStoreError, ResultsSummary, ResultsView,
};
pub use submission::{SubmissionCoordinator, SubmissionError, SubmissionReceipt};
pub use uploads::{UploadItem, UploadRejection, UploadSet};
pub use wizard::{ValidationError, WizardError, WizardSession, WizardState, WizardStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Detection,
    Results,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Detection => "/detection",
            Route::Results => "/detection/results",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    SubmissionStarted {
        submission_id: SubmissionId,
        count: usize,
    },
    ItemAnalyzed {
        index: usize,
        label: String,
    },
    SubmissionFailed {
        message: String,
    },
    Navigate(Route),
}
