use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::{MAX_UPLOAD_BYTES, UPLOAD_FIELD_NAME},
    error::{ApiError, ErrorCode},
    protocol::PredictResponse,
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod labels;

use crate::{config::load_settings, labels::LabelPolicy};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    labels: LabelPolicy,
}

type ApiFailure = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let labels = LabelPolicy::from_fixed_label(settings.fixed_label);
    let app = build_router(Arc::new(AppState { labels }));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "predict server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/predict", post(predict))
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            MAX_UPLOAD_BYTES as usize + MULTIPART_OVERHEAD_BYTES,
        ))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn not_found() -> ApiFailure {
    api_failure(StatusCode::NOT_FOUND, ErrorCode::NotFound, "no such route")
}

fn api_failure(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> ApiFailure {
    (status, Json(ApiError::new(code, message)))
}

fn multipart_failure(err: MultipartError) -> ApiFailure {
    let status = err.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorCode::PayloadTooLarge
    } else {
        ErrorCode::Validation
    };
    api_failure(status, code, err.body_text())
}

async fn predict(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiFailure> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_failure)? {
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            warn!(%filename, %content_type, "rejected non-image upload");
            return Err(api_failure(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ErrorCode::UnsupportedMediaType,
                format!("'{filename}' is not an image"),
            ));
        }

        let bytes = field.bytes().await.map_err(multipart_failure)?;
        if bytes.is_empty() {
            return Err(api_failure(
                StatusCode::BAD_REQUEST,
                ErrorCode::Validation,
                format!("'{filename}' is empty"),
            ));
        }
        if bytes.len() as u64 > MAX_UPLOAD_BYTES {
            warn!(%filename, size = bytes.len(), "rejected oversized upload");
            return Err(api_failure(
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorCode::PayloadTooLarge,
                format!("'{filename}' exceeds {MAX_UPLOAD_BYTES} bytes"),
            ));
        }

        let response = state.labels.label_for(&filename);
        info!(%filename, size = bytes.len(), result = %response.result, "prediction served");
        return Ok(Json(response));
    }

    Err(api_failure(
        StatusCode::BAD_REQUEST,
        ErrorCode::Validation,
        format!("missing multipart field '{UPLOAD_FIELD_NAME}'"),
    ))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
