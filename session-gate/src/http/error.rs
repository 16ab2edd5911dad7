use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::session::SessionError;

use super::responses::Envelope;

/// Every variant renders as `{ "status": "ERR", "data": <Display> }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Usuario no autorizado")]
    Unauthenticated,
    #[error("Usuario no admin")]
    Forbidden,
    #[error("Datos no válidos")]
    InvalidCredentials,
    #[error("El correo ya está registrado.")]
    EmailTaken,
    #[error("Error interno del servidor.")]
    RegistrationFailed,
    #[error("Error interno del servidor.")]
    Internal,
    #[error("{0}")]
    Failure(String),
    #[error("{0}")]
    UnreadableBody(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::EmailTaken | ApiError::RegistrationFailed | ApiError::UnreadableBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal | ApiError::Failure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::Failure(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(Envelope::err(self.to_string()));
        (self.status(), body).into_response()
    }
}
