use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{domain::UPLOAD_FIELD_NAME, error::ApiError, protocol::PredictResponse};
use thiserror::Error;
use url::Url;

use crate::uploads::UploadItem;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("analysis endpoint answered HTTP {status}{}", detail_suffix(.detail))]
    Status {
        status: u16,
        detail: Option<ApiError>,
    },
    #[error("analysis endpoint response violated the contract: {0}")]
    Contract(String),
}

fn detail_suffix(detail: &Option<ApiError>) -> String {
    detail
        .as_ref()
        .map(|err| format!(" ({:?}: {})", err.code, err.message))
        .unwrap_or_default()
}

/// External collaborator that classifies one image per call.
#[async_trait]
pub trait AnalysisEndpoint: Send + Sync {
    async fn predict(&self, item: &UploadItem) -> Result<PredictResponse, EndpointError>;
}

/// Multipart `POST` client for a `/predict`-style endpoint.
pub struct HttpAnalysisEndpoint {
    http: Client,
    url: Url,
}

impl HttpAnalysisEndpoint {
    pub fn new(url: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build analysis http client")?;
        Ok(Self::with_client(http, url))
    }

    pub fn with_client(http: Client, url: Url) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl AnalysisEndpoint for HttpAnalysisEndpoint {
    async fn predict(&self, item: &UploadItem) -> Result<PredictResponse, EndpointError> {
        let part = Part::bytes(item.payload().to_vec())
            .file_name(item.filename().to_string())
            .mime_str(item.mime_type())?;
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        let response = self
            .http
            .post(self.url.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.json::<ApiError>().await.ok();
            return Err(EndpointError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<PredictResponse>(&body)
            .map_err(|err| EndpointError::Contract(err.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/endpoint_tests.rs"]
mod tests;
