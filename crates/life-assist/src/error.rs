use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::journeys::router::status_for;
use crate::workflows::journeys::JourneyError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Journey(JourneyError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Journey(err) => write!(f, "journey error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Journey(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            AppError::Journey(err) => (status_for(err.kind()), Some(err.kind())),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        let body = Json(json!({ "error": self.to_string(), "kind": kind }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<JourneyError> for AppError {
    fn from(value: JourneyError) -> Self {
        Self::Journey(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::journeys::{JourneyId, StepId};

    #[test]
    fn journey_errors_keep_their_status() {
        let response = AppError::from(JourneyError::ConsentRequired {
            journey_id: JourneyId("journey_a".to_string()),
            step_id: StepId::from("birth_reg"),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = AppError::from(std::io::Error::other("disk full")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
