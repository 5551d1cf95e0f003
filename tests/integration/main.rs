//! End-to-end tests for the HTTP API.
//!
//! The router is driven in-process with a mock inference backend, so no
//! model file is needed.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

use image_classifier_api::api::{create_router, AppState};
use image_classifier_api::classifier::{LabelSet, MockClassifier, ModelService};

const BOUNDARY: &str = "X-TEST-BOUNDARY";

/// A multipart part: (field name, file name, content type, bytes).
type Part<'a> = (&'a str, &'a str, Option<&'a str>, &'a [u8]);

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n")
                .as_bytes(),
        );
        if let Some(ct) = content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn predict_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn small_jpeg() -> Vec<u8> {
    let mut img = ImageBuffer::new(24, 16);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = Rgb([(x * 10) as u8, (y * 15) as u8, 90]);
    }
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

fn app_with(mock: Arc<MockClassifier>) -> Router {
    let service = ModelService::with_classifier(mock, LabelSet::cifar10());
    create_router(AppState::new(Arc::new(service)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn probabilities(json: &Value) -> Vec<f64> {
    json["probabilities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = app_with(Arc::new(MockClassifier::one_hot(10, 0)));

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn text_upload_is_rejected_without_inference() {
    let mock = Arc::new(MockClassifier::one_hot(10, 0));
    let app = app_with(mock.clone());

    let request = predict_request(&[("file", "test.txt", Some("text/plain"), b"abc")]);
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, serde_json::json!({"detail": "Invalid file type"}));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn upload_without_content_type_is_rejected() {
    let mock = Arc::new(MockClassifier::one_hot(10, 0));
    let app = app_with(mock.clone());

    let jpeg = small_jpeg();
    let request = predict_request(&[("file", "photo.jpg", None, &jpeg)]);
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn jpeg_upload_is_classified() {
    let scores = vec![0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.55, 0.05, 0.05];
    let mock = Arc::new(MockClassifier::with_scores(scores));
    let app = app_with(mock.clone());

    let jpeg = small_jpeg();
    let request = predict_request(&[("file", "photo.jpg", Some("image/jpeg"), &jpeg)]);
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["class_label"], "horse");

    let probs = probabilities(&json);
    assert_eq!(probs.len(), 10);
    assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn label_matches_first_maximum() {
    let scores = vec![0.1, 0.3, 0.0, 0.0, 0.3, 0.0, 0.1, 0.1, 0.05, 0.05];
    let app = app_with(Arc::new(MockClassifier::with_scores(scores)));

    let png = encode(
        DynamicImage::ImageLuma8(ImageBuffer::from_pixel(50, 70, Luma([200u8]))),
        ImageFormat::Png,
    );
    let request = predict_request(&[("file", "gray.png", Some("image/png"), &png)]);
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);

    let probs = probabilities(&json);
    let max = probs.iter().cloned().fold(f64::MIN, f64::max);
    let first_max = probs.iter().position(|&p| p == max).unwrap();
    let labels = LabelSet::cifar10();
    assert_eq!(json["class_label"], labels.get(first_max).unwrap());
    assert_eq!(json["class_label"], "automobile");
}

#[tokio::test]
async fn same_image_gives_same_prediction() {
    let app = app_with(Arc::new(MockClassifier::one_hot(10, 8)));
    let jpeg = small_jpeg();

    let (_, first) = send(
        app.clone(),
        predict_request(&[("file", "a.jpg", Some("image/jpeg"), &jpeg)]),
    )
    .await;
    let (_, second) = send(
        app,
        predict_request(&[("file", "a.jpg", Some("image/jpeg"), &jpeg)]),
    )
    .await;

    assert_eq!(first, second);
    assert_eq!(first["class_label"], "ship");
}

#[tokio::test]
async fn undecodable_image_is_server_error() {
    let mock = Arc::new(MockClassifier::one_hot(10, 0));
    let app = app_with(mock.clone());

    let request = predict_request(&[("file", "broken.png", Some("image/png"), b"not really a png")]);
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["detail"], "Internal Server Error");
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn inference_failure_is_server_error() {
    let app = app_with(Arc::new(MockClassifier::failing()));

    let jpeg = small_jpeg();
    let request = predict_request(&[("file", "photo.jpg", Some("image/jpeg"), &jpeg)]);
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unloadable_model_is_server_error() {
    let service = ModelService::new("no/such/model.onnx", LabelSet::cifar10());
    let app = create_router(AppState::new(Arc::new(service)));

    let jpeg = small_jpeg();
    let request = predict_request(&[("file", "photo.jpg", Some("image/jpeg"), &jpeg)]);
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn missing_file_field_is_unprocessable() {
    let app = app_with(Arc::new(MockClassifier::one_hot(10, 0)));

    let jpeg = small_jpeg();
    let request = predict_request(&[("image", "photo.jpg", Some("image/jpeg"), &jpeg)]);
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["detail"], "Missing file field");
}

#[tokio::test]
async fn plain_form_value_is_not_a_file() {
    let mock = Arc::new(MockClassifier::one_hot(10, 0));
    let app = app_with(mock.clone());

    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"\r\n\
         \r\n\
         not-an-upload\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json, serde_json::json!({"detail": "Missing file field"}));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn non_finite_scores_are_server_error() {
    let mut scores = vec![0.1_f32; 10];
    scores[4] = f32::NAN;
    let app = app_with(Arc::new(MockClassifier::with_scores(scores)));

    let jpeg = small_jpeg();
    let request = predict_request(&[("file", "photo.jpg", Some("image/jpeg"), &jpeg)]);
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, serde_json::json!({"detail": "Internal Server Error"}));
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let app = app_with(Arc::new(MockClassifier::one_hot(10, 0)));

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].is_string());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let mock = Arc::new(MockClassifier::one_hot(10, 0));
    let service = ModelService::with_classifier(mock.clone(), LabelSet::cifar10());
    let app = create_router(AppState::new(Arc::new(service)).with_max_upload_bytes(256));

    let big = vec![0u8; 4096];
    let request = predict_request(&[("file", "big.png", Some("image/png"), &big)]);
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(mock.calls(), 0);
}
