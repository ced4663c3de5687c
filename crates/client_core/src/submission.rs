use std::sync::Arc;

use futures::{stream, StreamExt};
use shared::{
    domain::SubmissionId,
    protocol::{PredictionEnvelopeV1, StoredPrediction},
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    endpoint::{AnalysisEndpoint, EndpointError},
    results::{ResultsStore, ResultsStoreError},
    uploads::UploadItem,
    ClientEvent, Route,
};

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("no images to submit")]
    Empty,
    #[error("image {index} ('{filename}') failed analysis: {source}")]
    Endpoint {
        index: usize,
        filename: String,
        #[source]
        source: EndpointError,
    },
    #[error("failed to persist prediction results: {0}")]
    Persist(#[from] ResultsStoreError),
}

impl SubmissionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmissionError::Empty => "Please upload at least one image.",
            SubmissionError::Endpoint { .. } | SubmissionError::Persist(_) => {
                "An error occurred while submitting your images."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub submission_id: SubmissionId,
    pub results: Vec<StoredPrediction>,
    pub route: Route,
}

/// Fans a batch of uploads out to the analysis endpoint and commits the
/// ordered results only when every request succeeded.
pub struct SubmissionCoordinator {
    endpoint: Arc<dyn AnalysisEndpoint>,
    results: ResultsStore,
    max_concurrent: usize,
    events: broadcast::Sender<ClientEvent>,
}

impl SubmissionCoordinator {
    pub fn new(endpoint: Arc<dyn AnalysisEndpoint>, results: ResultsStore) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            endpoint,
            results,
            max_concurrent: DEFAULT_MAX_CONCURRENT_REQUESTS,
            events,
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn results_store(&self) -> &ResultsStore {
        &self.results
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    /// Output order always matches `items`, whatever order the requests
    /// complete in. Dropping the returned future abandons in-flight requests
    /// without touching storage.
    pub async fn submit(&self, items: &[UploadItem]) -> Result<SubmissionReceipt, SubmissionError> {
        if items.is_empty() {
            return Err(SubmissionError::Empty);
        }

        let submission_id = SubmissionId::new();
        info!(%submission_id, count = items.len(), "submitting images for analysis");
        self.emit(ClientEvent::SubmissionStarted {
            submission_id,
            count: items.len(),
        });

        let endpoint = &self.endpoint;
        let mut slots: Vec<Option<StoredPrediction>> = vec![None; items.len()];
        let mut in_flight = stream::iter(items.iter().enumerate())
            .map(move |(index, item)| async move { (index, endpoint.predict(item).await) })
            .buffer_unordered(self.max_concurrent);

        while let Some((index, outcome)) = in_flight.next().await {
            match outcome {
                Ok(response) => {
                    let prediction = StoredPrediction::from(response);
                    self.emit(ClientEvent::ItemAnalyzed {
                        index,
                        label: prediction.label.clone(),
                    });
                    slots[index] = Some(prediction);
                }
                Err(source) => {
                    let filename = items[index].filename().to_string();
                    warn!(%submission_id, index, %filename, error = %source, "analysis request failed; aborting batch");
                    let err = SubmissionError::Endpoint {
                        index,
                        filename,
                        source,
                    };
                    self.emit(ClientEvent::SubmissionFailed {
                        message: err.user_message().to_string(),
                    });
                    return Err(err);
                }
            }
        }

        let results: Vec<StoredPrediction> = slots.into_iter().flatten().collect();
        let envelope = PredictionEnvelopeV1::new(submission_id, results);
        if let Err(err) = self.results.save(&envelope).await {
            let err = SubmissionError::from(err);
            self.emit(ClientEvent::SubmissionFailed {
                message: err.user_message().to_string(),
            });
            return Err(err);
        }

        info!(%submission_id, count = envelope.results.len(), "prediction results stored");
        self.emit(ClientEvent::Navigate(Route::Results));
        Ok(SubmissionReceipt {
            submission_id,
            results: envelope.results,
            route: Route::Results,
        })
    }
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
