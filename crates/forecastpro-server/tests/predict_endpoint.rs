//! End-to-end tests of the HTTP API.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; the
//! identity service is replaced by a verifier that knows a single token.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use forecastpro_server::{router, AppState, AuthError, Identity, IdentityVerifier, ServerConfig};

const TOKEN: &str = "test-token";
const BOUNDARY: &str = "forecastpro-test-boundary";

const EAST_CSV: &str = "date,region,sales\n2024-01-01,east,10\n2024-01-02,east,12\n";

struct StaticVerifier;

impl IdentityVerifier for StaticVerifier {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token != TOKEN {
            return Err(AuthError::InvalidToken("unknown token".to_string()));
        }
        Ok(Identity {
            uid: "uid-123".to_string(),
            email: Some("analyst@example.com".to_string()),
            claims: serde_json::Map::new(),
        })
    }
}

fn app_with(config: ServerConfig) -> Router {
    router(AppState::new(config, Arc::new(StaticVerifier)))
}

fn app() -> Router {
    app_with(ServerConfig::default())
}

/// A multipart body with the given text fields and an optional CSV file.
fn multipart_body(fields: &[(&str, &str)], file: Option<&str>) -> Vec<u8> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    if let Some(csv) = file {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"data.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n{}\r\n",
            BOUNDARY, csv
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body.into_bytes()
}

fn predict_request(uri: &str, auth: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len());
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body)).unwrap()
}

fn form(csv: &str, start: &str, end: &str, model: &str) -> Vec<u8> {
    multipart_body(
        &[("start_date", start), ("end_date", end), ("model_name", model)],
        Some(csv),
    )
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn bearer() -> String {
    format!("Bearer {}", TOKEN)
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_predict_grouped_arima() {
    let body = form(EAST_CSV, "2024-01-03", "2024-01-04", "ARIMA");
    let (status, json) = send(app(), predict_request("/predict/", Some(&bearer()), body)).await;
    assert_eq!(status, StatusCode::OK, "{}", json);

    let predictions = json["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0]["ds"], "2024-01-03");
    assert_eq!(predictions[1]["ds"], "2024-01-04");
    for p in predictions {
        assert_eq!(p["Metric"], "sales");
        assert_eq!(p["Model"], "ARIMA");
        assert_eq!(p["Group"], serde_json::json!({"region": "east"}));
        assert!(p["yhat"].is_f64());
    }

    assert_eq!(
        json["unique_group_data"],
        serde_json::json!({"region": ["east"]})
    );
    assert_eq!(
        json["user_info"],
        serde_json::json!({"email": "analyst@example.com", "uid": "uid-123"})
    );
}

#[tokio::test]
async fn test_predict_ungrouped_without_trailing_slash() {
    let csv = "date,sales\n2024-01-01,1\n2024-01-02,2\n2024-01-03,3\n";
    let body = form(csv, "2024-01-04", "2024-01-06", "Prophet");
    let (status, json) = send(app(), predict_request("/predict", Some(&bearer()), body)).await;
    assert_eq!(status, StatusCode::OK, "{}", json);

    let predictions = json["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    assert!(predictions.iter().all(|p| p["Group"].is_null()));
    assert_eq!(json["unique_group_data"], serde_json::json!({}));
}

#[tokio::test]
async fn test_missing_credentials() {
    let body = form(EAST_CSV, "2024-01-03", "2024-01-04", "ARIMA");
    let (status, json) = send(app(), predict_request("/predict/", None, body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["detail"], "Not authenticated");
}

#[tokio::test]
async fn test_invalid_credentials() {
    for auth in ["Bearer wrong-token", "Basic dXNlcjpwYXNz", "Bearer"] {
        let body = form(EAST_CSV, "2024-01-03", "2024-01-04", "ARIMA");
        let (status, json) = send(app(), predict_request("/predict/", Some(auth), body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", auth);
        assert_eq!(json["detail"], "Invalid authentication credentials");
    }
}

#[tokio::test]
async fn test_invalid_model_is_bad_request() {
    let body = form(EAST_CSV, "2024-01-03", "2024-01-04", "LSTM");
    let (status, json) = send(app(), predict_request("/predict/", Some(&bearer()), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Invalid model name: LSTM");
}

#[tokio::test]
async fn test_column_errors_are_bad_request() {
    let body = form("region,sales\neast,1\n", "2024-01-03", "2024-01-04", "ARIMA");
    let (status, json) = send(app(), predict_request("/predict/", Some(&bearer()), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "No datetime column detected");

    let body = form(
        "date,region\n2024-01-01,east\n",
        "2024-01-03",
        "2024-01-04",
        "ARIMA",
    );
    let (status, json) = send(app(), predict_request("/predict/", Some(&bearer()), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "No metric columns detected");
}

#[tokio::test]
async fn test_malformed_date_is_server_error() {
    let body = form(EAST_CSV, "next tuesday", "2024-01-04", "ARIMA");
    let (status, json) = send(app(), predict_request("/predict/", Some(&bearer()), body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.starts_with("Prediction failed (request "), "{}", detail);
    assert!(!detail.contains("next tuesday"));
}

#[tokio::test]
async fn test_exposed_server_error_detail() {
    let config = ServerConfig {
        expose_errors: true,
        ..ServerConfig::default()
    };
    let body = form(EAST_CSV, "next tuesday", "2024-01-04", "ARIMA");
    let (status, json) = send(
        app_with(config),
        predict_request("/predict/", Some(&bearer()), body),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json["detail"],
        "Invalid date 'next tuesday': expected YYYY-MM-DD"
    );
}

#[tokio::test]
async fn test_missing_form_field() {
    let body = multipart_body(
        &[("start_date", "2024-01-03"), ("end_date", "2024-01-04")],
        Some(EAST_CSV),
    );
    let (status, json) = send(app(), predict_request("/predict/", Some(&bearer()), body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["detail"], "Missing form field 'model_name'");

    let body = multipart_body(
        &[
            ("start_date", "2024-01-03"),
            ("end_date", "2024-01-04"),
            ("model_name", "ARIMA"),
        ],
        None,
    );
    let (status, json) = send(app(), predict_request("/predict/", Some(&bearer()), body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["detail"], "Missing form field 'file'");
}

#[tokio::test]
async fn test_non_multipart_body_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/predict/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, bearer())
        .body(Body::from("{}"))
        .unwrap();
    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_upload_limit() {
    let config = ServerConfig {
        max_upload_bytes: 64,
        ..ServerConfig::default()
    };
    let body = form(EAST_CSV, "2024-01-03", "2024-01-04", "ARIMA");
    let response = app_with(config)
        .oneshot(predict_request("/predict/", Some(&bearer()), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
