use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

/// Failure categories surfaced by the request layer. Realtime handlers log
/// and drop instead of responding; see `chat::router`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not authorized")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    DuplicateName(&'static str),

    #[error("{0}")]
    InvalidOperation(&'static str),

    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),

    #[error("session failure: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    fn category(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::DuplicateName(_) => "duplicate_name",
            Self::InvalidOperation(_) => "invalid_operation",
            Self::Store(_) => "store_failure",
            Self::Session(_) | Self::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DuplicateName(_) | Self::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "server error".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": self.category(), "message": message }))).into_response()
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_category() {
        assert_eq!(AppError::Unauthenticated.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("room").into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Forbidden("nope").into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::DuplicateName("taken").into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidOperation("bad").into_response().status(), StatusCode::BAD_REQUEST);
    }
}
