use super::*;
use axum::{body, body::Body, http::Request};
use tower::ServiceExt;

use crate::labels::{DETECTED_LABEL, NOT_DETECTED_LABEL};
use shared::domain::ResultCode;

const BOUNDARY: &str = "sicklescan-test-boundary";

fn test_app(labels: LabelPolicy) -> Router {
    build_router(Arc::new(AppState { labels }))
}

fn multipart_body(field: &str, filename: &str, content_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn predict_request(body: Vec<u8>) -> Request<Body> {
    Request::post("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = test_app(LabelPolicy::FilenameKeyword);
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn filename_keyword_selects_the_label() {
    let app = test_app(LabelPolicy::FilenameKeyword);

    let response = app
        .clone()
        .oneshot(predict_request(multipart_body(
            "file",
            "Sickle_smear_01.jpg",
            "image/jpeg",
            &[0xFF, 0xD8, 0xFF],
        )))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let dto: PredictResponse = json_body(response).await;
    assert_eq!(dto.result, DETECTED_LABEL);
    assert_eq!(dto.code, Some(ResultCode::Detected));

    let response = app
        .oneshot(predict_request(multipart_body(
            "file",
            "smear_02.png",
            "image/png",
            &[0x89, b'P', b'N', b'G'],
        )))
        .await
        .expect("response");
    let dto: PredictResponse = json_body(response).await;
    assert_eq!(dto.result, NOT_DETECTED_LABEL);
    assert_eq!(dto.code, Some(ResultCode::NotDetected));
}

#[tokio::test]
async fn fixed_label_is_returned_for_every_image() {
    let app = test_app(LabelPolicy::from_fixed_label(Some("No sickle cells".into())));

    let response = app
        .oneshot(predict_request(multipart_body(
            "file",
            "sickle.jpg",
            "image/jpeg",
            &[1, 2, 3],
        )))
        .await
        .expect("response");
    let dto: PredictResponse = json_body(response).await;
    assert_eq!(dto.result, "No sickle cells");
    assert_eq!(dto.code, Some(ResultCode::NotDetected));
}

#[tokio::test]
async fn non_image_upload_is_unsupported_media_type() {
    let app = test_app(LabelPolicy::FilenameKeyword);

    let response = app
        .oneshot(predict_request(multipart_body(
            "file",
            "notes.pdf",
            "application/pdf",
            b"%PDF-1.7",
        )))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::UnsupportedMediaType);
}

#[tokio::test]
async fn oversized_image_is_rejected() {
    let app = test_app(LabelPolicy::FilenameKeyword);
    let payload = vec![0u8; MAX_UPLOAD_BYTES as usize + 1];

    let response = app
        .oneshot(predict_request(multipart_body(
            "file",
            "huge.jpg",
            "image/jpeg",
            &payload,
        )))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::PayloadTooLarge);
}

#[tokio::test]
async fn missing_file_field_is_a_validation_error() {
    let app = test_app(LabelPolicy::FilenameKeyword);

    let response = app
        .oneshot(predict_request(multipart_body(
            "image",
            "smear.jpg",
            "image/jpeg",
            &[1, 2, 3],
        )))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn unknown_route_answers_not_found_body() {
    let app = test_app(LabelPolicy::FilenameKeyword);
    let request = Request::get("/analyze")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[test]
fn keyword_match_ignores_case() {
    let policy = LabelPolicy::FilenameKeyword;
    assert_eq!(policy.label_for("SICKLE.PNG").code, Some(ResultCode::Detected));
    assert_eq!(policy.label_for("normal.png").code, Some(ResultCode::NotDetected));
}
