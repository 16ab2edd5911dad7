use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERR")]
    Err,
}

/// Shared `{ status, data }` body used by every JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Outcome,
    pub data: String,
}

impl Envelope {
    pub fn ok(data: impl Into<String>) -> Self {
        Self {
            status: Outcome::Ok,
            data: data.into(),
        }
    }

    pub fn err(data: impl Into<String>) -> Self {
        Self {
            status: Outcome::Err,
            data: data.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub users: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub mail: String,
    pub pass: String,
}

/// `302 Found` with a `Location` header.
pub fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}
