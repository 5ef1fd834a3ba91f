use crate::geometry::Dimension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Failures of the sample-to-geometry transformation.
/// Every variant aborts the whole call: no partial geometry is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("no samples supplied")]
    EmptyInput,

    #[error("degenerate {dimension} range: maximum is {max}")]
    DegenerateRange { dimension: Dimension, max: f64 },

    #[error("{dimension} coordinate {value} matches no axis bucket")]
    AxisLookupMiss { dimension: Dimension, value: f64 },

    #[error("negative {dimension} value {value}")]
    NegativeValue { dimension: Dimension, value: f64 },

    #[error("surface grid of {vertices} vertices exceeds the limit of {limit}")]
    GridTooLarge { vertices: usize, limit: usize },
}

impl GeometryError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::DegenerateRange { .. } => "degenerate_range",
            Self::AxisLookupMiss { .. } => "axis_lookup_miss",
            Self::NegativeValue { .. } => "negative_value",
            Self::GridTooLarge { .. } => "grid_too_large",
        }
    }
}

pub type GeometryResult<T> = Result<T, GeometryError>;

/// Service-level errors. Request handlers return these directly;
/// the `IntoResponse` impl picks the status code.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("model computation error: {0}")]
    Model(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("worker failed: {0}")]
    Worker(String),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Parse(_) => "parse",
            Self::Geometry(e) => e.kind(),
            Self::Model(_) => "model",
            Self::NotFound(_) => "not_found",
            Self::Config(_) => "config",
            Self::Worker(_) => "worker",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::Parse(_) => StatusCode::BAD_REQUEST,
            // Request size, not sample content
            Self::Geometry(GeometryError::GridTooLarge { .. }) => StatusCode::BAD_REQUEST,
            Self::Geometry(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Model(_) | Self::Config(_) | Self::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(e: tokio::task::JoinError) -> Self {
        EngineError::Worker(e.to_string())
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, kind = self.kind(), "request rejected");
        }
        let body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        (status, Json(body)).into_response()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_errors_are_unprocessable() {
        let e = EngineError::from(GeometryError::DegenerateRange {
            dimension: Dimension::Price,
            max: 0.0,
        });
        assert_eq!(e.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(e.kind(), "degenerate_range");
        assert_eq!(e.to_string(), "degenerate price range: maximum is 0");
    }

    #[test]
    fn test_oversized_grid_is_bad_request() {
        let e = EngineError::from(GeometryError::GridTooLarge { vertices: 10, limit: 4 });
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.kind(), "grid_too_large");
    }

    #[test]
    fn test_invalid_input_is_bad_request() {
        let e = EngineError::InvalidInput("spot must be positive".into());
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
    }
}
