use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Compila tutti i campi obbligatori")]
    MissingFields,

    #[error("Tipo utente non valido")]
    InvalidType,

    #[error("Indirizzo email non valido")]
    InvalidEmail,

    #[error("Richiesta non valida")]
    MalformedBody(String),

    #[error("Endpoint not found")]
    NotFound,

    /// `details` carries the raw transport error and is only set outside production.
    #[error("Errore durante l'invio dell'email, riprova più tardi")]
    Transport { details: Option<String> },

    #[error("Internal server error")]
    Internal,
}

/// JSON body shared by every failure response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFields
            | AppError::InvalidType
            | AppError::InvalidEmail
            | AppError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Transport { .. } | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            AppError::Transport { details } => details.clone(),
            _ => None,
        };

        let body = Json(ErrorBody {
            success: false,
            error: self.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedBody(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
