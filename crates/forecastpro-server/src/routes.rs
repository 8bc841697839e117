//! API route handlers

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use forecastpro_core::PredictRequest;

use crate::auth::AuthenticatedUser;
use crate::error::{run_blocking, ApiError};
use crate::types::{HealthResponse, PredictResponse};
use crate::AppState;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /predict/`: forecast every metric of the uploaded file.
pub async fn predict(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let request = read_form(multipart).await?;

    tracing::info!(
        uid = %identity.uid,
        email = identity.email.as_deref().unwrap_or(""),
        model = %request.model_name,
        bytes = request.file.len(),
        "Prediction request"
    );

    let expose = state.config.expose_errors;
    let prediction = run_blocking(
        move || forecastpro_core::predict(&request).map_err(|e| ApiError::from_forecast(e, expose)),
        expose,
    )
    .await?;

    tracing::info!(
        uid = %identity.uid,
        records = prediction.records.len(),
        groups = prediction.unique_group_values.len(),
        "Prediction complete"
    );

    Ok(Json(PredictResponse::new(prediction, &identity)))
}

#[derive(Default)]
struct Form {
    file: Option<Vec<u8>>,
    start_date: Option<String>,
    end_date: Option<String>,
    model_name: Option<String>,
}

/// Collect the four form fields. Unknown fields are ignored; a missing or
/// repeated field is a 422.
async fn read_form(mut multipart: Multipart) -> Result<PredictRequest, ApiError> {
    let mut form = Form::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, None))?
    {
        let Some(name) = field.name().map(String::from) else {
            continue;
        };
        let unreadable = |e: MultipartError| multipart_error(&e, Some(&name));

        match name.as_str() {
            "file" => {
                let bytes = field.bytes().await.map_err(unreadable)?;
                set_once(&mut form.file, &name, bytes.to_vec())?;
            }
            "start_date" => {
                let text = field.text().await.map_err(unreadable)?;
                set_once(&mut form.start_date, &name, text)?;
            }
            "end_date" => {
                let text = field.text().await.map_err(unreadable)?;
                set_once(&mut form.end_date, &name, text)?;
            }
            "model_name" => {
                let text = field.text().await.map_err(unreadable)?;
                set_once(&mut form.model_name, &name, text)?;
            }
            _ => {}
        }
    }

    Ok(PredictRequest {
        file: required(form.file, "file")?,
        start_date: required(form.start_date, "start_date")?,
        end_date: required(form.end_date, "end_date")?,
        model_name: required(form.model_name, "model_name")?,
    })
}

/// An oversized body stays a 413; any other multipart failure is a 422.
fn multipart_error(e: &MultipartError, field: Option<&str>) -> ApiError {
    let detail = match field {
        Some(name) => format!("Unreadable form field '{}': {}", name, e.body_text()),
        None => e.body_text(),
    };
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, detail)
    } else {
        ApiError::unprocessable(detail)
    }
}

fn set_once<T>(slot: &mut Option<T>, name: &str, value: T) -> Result<(), ApiError> {
    if slot.is_some() {
        return Err(ApiError::unprocessable(format!(
            "Form field '{}' given more than once",
            name
        )));
    }
    *slot = Some(value);
    Ok(())
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::unprocessable(format!("Missing form field '{}'", name)))
}
