//! Status and transport mapping shared by the task and directory clients.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::RequestError;
use crate::model::TaskId;

const MAX_MESSAGE_LEN: usize = 200;

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> RequestError {
    if err.is_timeout() {
        RequestError::Timeout(timeout)
    } else if err.is_decode() {
        RequestError::Decode(err.to_string())
    } else {
        RequestError::Network(err.to_string())
    }
}

/// Turn a non-2xx response into the matching [`RequestError`]. `target` names the
/// record addressed by the request so a 404 can be reported as `NotFound`.
pub(crate) async fn check_status(
    response: Response,
    target: Option<&TaskId>,
) -> Result<Response, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body, target))
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RequestError> {
    let body = response
        .bytes()
        .await
        .map_err(|err| RequestError::Network(err.to_string()))?;
    serde_json::from_slice(&body).map_err(|err| RequestError::Decode(err.to_string()))
}

pub(crate) fn classify_failure(
    status: StatusCode,
    body: &str,
    target: Option<&TaskId>,
) -> RequestError {
    if status == StatusCode::UNAUTHORIZED {
        return RequestError::Unauthorized;
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = target {
            return RequestError::NotFound(id.clone());
        }
    }
    let message = extract_message(body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| String::from("unexpected response"));
    RequestError::Status {
        status: status.as_u16(),
        message,
    }
}

fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
    }
    Some(trimmed.chars().take(MAX_MESSAGE_LEN).collect())
}
