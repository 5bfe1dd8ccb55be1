use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollError {
    #[error("Unknown poll")]
    UnknownPoll,

    #[error("Invalid option")]
    InvalidOption,

    #[error("Missing {0}")]
    MissingParam(&'static str),

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Storage error: {0}")]
    Storage(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let status = match self {
            PollError::UnknownPoll | PollError::InvalidOption | PollError::MissingParam(_) => {
                StatusCode::BAD_REQUEST
            }
            PollError::AlreadyVoted => StatusCode::CONFLICT,
            PollError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
