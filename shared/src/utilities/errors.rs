use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} environment variable not set error")]
    EnvironmentVariableNotSetError(String),
    #[error("Database url parsing error")]
    DatabaseUrlParsingError,
    #[error("Database connection error")]
    DatabaseConnectionError,
    #[error("Sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("Query error, {0}")]
    QueryError(String),
    #[error("Internal error, {0}")]
    InternalError(String),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Serde json error")]
    SerdejsonError(#[from] serde_json::Error),
    #[error("IO error, {0}")]
    IoError(#[from] std::io::Error),
}

impl AppError {
    /// Client errors get their message back verbatim; everything else is
    /// logged here and surfaced generically so driver details never leak.
    pub fn client_message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Cancelled => "Request cancelled".to_string(),
            // Already logged verbatim by the executor.
            Self::SqlxError(_) => {
                "Problems encountered querying the component catalog".to_string()
            }
            other => {
                error!("Request failure: {other}");
                "Problems encountered processing the request".to_string()
            }
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::BadRequest(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::BadRequest(e) => (StatusCode::BAD_REQUEST, e),
            Self::EnvironmentVariableNotSetError(field) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{field} environment variable not set error"),
            ),
            Self::DatabaseUrlParsingError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database url parsing error".to_string(),
            ),
            Self::DatabaseConnectionError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database connection error".to_string(),
            ),
            Self::SqlxError(e) => {
                error!("Database failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database query error".to_string(),
                )
            }
            Self::QueryError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
            Self::InternalError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
            Self::Cancelled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Request cancelled".to_string(),
            ),
            Self::SerdejsonError(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            Self::IoError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = Json(json!({"error": error_message}));

        (status, body).into_response()
    }
}
