use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use thiserror::Error;
use tracing::{error, warn};

use warbler_db::DbError;
use warbler_types::api::ErrorResponse;

use crate::flash::{self, Flash};

#[derive(Debug, Error)]
pub enum ApiError {
    /// No session, or the session user may not do this. Answered with a
    /// redirect home carrying the "Access unauthorized." flash.
    #[error("Access unauthorized.")]
    Unauthorized,

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{field} already taken")]
    Duplicate { field: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate { field } => ApiError::Duplicate { field },
            DbError::NotFound { entity, .. } => ApiError::NotFound(entity),
            DbError::MissingReference => ApiError::NotFound("record"),
            DbError::TextTooLong => ApiError::Validation(err.to_string()),
            DbError::OwnMessage => ApiError::Forbidden(err.to_string()),
            DbError::NotOwner(_) => ApiError::Unauthorized,
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => {
                warn!("Access unauthorized");
                return flash::redirect(CookieJar::new(), Flash::AccessUnauthorized, "/")
                    .into_response();
            }
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Duplicate { .. } => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "internal server error".into(),
                    }),
                )
                    .into_response();
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
