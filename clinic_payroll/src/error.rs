//! Error types for the payroll engine.
//!
//! Only malformed input reaches this enum.  Business conditions such as
//! an unsupported team headcount or a missing mask-sale record degrade
//! to a zero bonus with a reason and never surface here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayrollError {
    /// A required numeric field was absent from the provider's data.
    #[error("{record}: missing required metric `{field}`")]
    MissingMetric { record: String, field: &'static str },

    /// A field was present but not a usable value (negative, fractional
    /// visit count, unparsable cell).
    #[error("{record}: invalid value {value:?} for `{field}`")]
    InvalidMetric {
        record: String,
        field: &'static str,
        value: String,
    },

    /// A sum or ratio left the range `Decimal` can represent.
    #[error("{record}: `{quantity}` exceeds the representable decimal range")]
    Overflow {
        record: String,
        quantity: &'static str,
    },

    #[error("invalid payroll rules: {0}")]
    InvalidRules(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = PayrollError> = std::result::Result<T, E>;

impl IntoResponse for PayrollError {
    fn into_response(self) -> Response {
        let status = match self {
            PayrollError::MissingMetric { .. }
            | PayrollError::InvalidMetric { .. }
            | PayrollError::Overflow { .. }
            | PayrollError::InvalidRules(_)
            | PayrollError::Json(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PayrollError::Io(_) | PayrollError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
