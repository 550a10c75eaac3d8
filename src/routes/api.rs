use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::results::{append_block, encode_rows, Submission};
use crate::state::AppState;
use crate::storage::{generate_submission_id, StoreLocation};

const DEBUG_TAIL_LINES: usize = 20;

#[derive(Debug, Serialize)]
struct SaveResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    submission_id: String,
    appended: usize,
    attempts: usize,
    #[serde(flatten)]
    location: StoreLocation,
    key: String,
    before_tail: String,
    after_tail: String,
}

/// Appends one participant's ratings to the shared results file.
pub async fn save_results(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::MalformedPayload(format!("Invalid JSON body: {e}")))?;
    let submission =
        Submission::from_json(&body).map_err(|e| AppError::MalformedPayload(e.to_string()))?;

    let submission_id = generate_submission_id();
    let rows = encode_rows(&submission);
    tracing::info!(
        "Submission {}: {} rating(s) to append",
        submission_id,
        rows.len()
    );

    let outcome = state.appends.append(append_block(&rows)).await?;

    let response = SaveResponse {
        ok: outcome.succeeded(),
        error: outcome.error_message(),
        submission_id,
        appended: if outcome.succeeded() { rows.len() } else { 0 },
        attempts: outcome.attempts,
        location: state.store.location(),
        key: state.config.results_key.clone(),
        before_tail: outcome.before_tail,
        after_tail: outcome.after_tail,
    };

    if let Some(error) = &response.error {
        tracing::error!("Submission {} not saved: {}", response.submission_id, error);
        return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response());
    }

    Ok(Json(response).into_response())
}

/// Hands out the results file: a redirect to a short-lived signed URL when
/// the store supports it, the CSV itself otherwise.
pub async fn download_results(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let key = &state.config.results_key;
    if !state.store.exists(key).await? {
        return Err(AppError::NotFound);
    }

    if let Some(url) = state.store.signed_url(key, state.config.download_ttl).await? {
        return Ok(Redirect::temporary(&url).into_response());
    }

    let bytes = state.store.read(key).await?;
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"results.csv\""),
        ],
        bytes,
    )
        .into_response())
}

/// Size and last lines of the results file.
pub async fn debug_results(State(state): State<Arc<AppState>>) -> Response {
    match state.store.read(&state.config.results_key).await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
            let tail = &lines[lines.len().saturating_sub(DEBUG_TAIL_LINES)..];

            Json(serde_json::json!({
                "bytes": bytes.len(),
                "lines": lines.len(),
                "tail": tail,
            }))
            .into_response()
        }
        Err(e) => {
            let (status, name) = if e.is_not_found() {
                (StatusCode::NOT_FOUND, "NotFound")
            } else {
                (StatusCode::INTERNAL_SERVER_ERROR, "StoreError")
            };
            (
                status,
                Json(serde_json::json!({ "error": name, "msg": e.to_string() })),
            )
                .into_response()
        }
    }
}
