use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use copa_server_app::error::{AppError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store failure: {0}")]
    StoreFailure(String),

    #[error("store timeout: {0}")]
    StoreTimeout(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::StoreFailure(_) => StatusCode::BAD_GATEWAY,
            ServiceError::StoreTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        let msg = err.to_string();
        match err {
            AppError::Validation(ValidationError::DuplicateTag(_)) => ServiceError::Conflict(msg),
            AppError::Validation(_) => ServiceError::BadRequest(msg),
            AppError::NotFound(_) | AppError::ConfirmationExpired => ServiceError::NotFound(msg),
            AppError::OperationInProgress(_) => ServiceError::Conflict(msg),
            AppError::StoreWrite { .. } | AppError::StoreRead(_) => ServiceError::StoreFailure(msg),
            AppError::StoreTimeout(_) => ServiceError::StoreTimeout(msg),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match self {
            ServiceError::BadRequest(msg)
            | ServiceError::Unauthorized(msg)
            | ServiceError::NotFound(msg)
            | ServiceError::Conflict(msg)
            | ServiceError::StoreFailure(msg)
            | ServiceError::StoreTimeout(msg) => msg,
        };
        let body = serde_json::json!({ "error": msg });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use copa_server_app::domain::{EntityRef, RoundId, TeamId};

    use super::*;

    #[test]
    fn test_app_errors_map_to_status_codes() {
        let cases = [
            (
                AppError::Validation(ValidationError::PositionRequired),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Validation(ValidationError::DuplicateTag("QW".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                AppError::NotFound(EntityRef::Round(RoundId(3))),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::OperationInProgress("round 1".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                AppError::StoreWrite {
                    entity: EntityRef::RoundResult {
                        round_id: RoundId(1),
                        team_id: TeamId(2),
                    },
                    message: "disk full".to_string(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::StoreTimeout(Duration::from_secs(10)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (AppError::ConfirmationExpired, StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(ServiceError::from(err).status(), status);
        }
    }

    #[test]
    fn test_store_write_message_names_the_row() {
        let err = ServiceError::from(AppError::StoreWrite {
            entity: EntityRef::RoundResult {
                round_id: RoundId(1),
                team_id: TeamId(2),
            },
            message: "disk full".to_string(),
        });
        let ServiceError::StoreFailure(msg) = err else {
            panic!("expected a store failure");
        };
        assert_eq!(msg, "failed to write result of team 2 in round 1: disk full");
    }

    #[test]
    fn test_display_names_the_kind() {
        let err = ServiceError::from(AppError::Validation(ValidationError::PositionRequired));
        assert_eq!(err.to_string(), "bad request: position required");
    }
}
