//! Error taxonomy for the export, AI-convert and storage boundaries, and its
//! mapping onto HTTP responses.
//!
//! Every error is logged where it is converted into a response. Clients only ever
//! see the `Display` text of the variant, never transport or packing internals.

use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;
use tracing::{error, warn};

use crate::domain::ValidationError;
use crate::protocol::ErrorOut;

pub const DATA_SHAPE_MESSAGE: &str = "AI response did not contain a questions list";
pub const GENERIC_SERVICE_MESSAGE: &str = "AI service request failed";

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("No questions selected for export")]
  EmptySelection,
  #[error("Invalid question selection: {0}")]
  InvalidSelection(String),
  /// One selected question failed to parse; the serde detail is logged, not shown.
  #[error("Invalid question selection: question {position} is malformed")]
  InvalidQuestion { position: usize, detail: String },
  /// Document assembly failed; the detail is logged, not shown.
  #[error("Failed to build the document")]
  Pack(String),
}

#[derive(Debug, Error)]
pub enum ConvertError {
  /// AI service unreachable or answered with a non-success status.
  #[error("{0}")]
  External(String),
  #[error("{}", DATA_SHAPE_MESSAGE)]
  DataShape,
  /// The reason is logged, not shown.
  #[error("AI question {index} is malformed")]
  InvalidItem { index: usize, reason: String },
  #[error("AI conversion is not configured")]
  Disabled,
  #[error("AI response contained no questions")]
  Empty,
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("{kind} not found: {id}")]
  NotFound { kind: &'static str, id: String },
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("A quiz needs at least one question")]
  EmptyQuiz,
  #[error("Response name must not be empty")]
  MissingName,
}

impl StoreError {
  pub fn question(id: &str) -> Self { StoreError::NotFound { kind: "question", id: id.to_string() } }
  pub fn quiz(id: &str) -> Self { StoreError::NotFound { kind: "quiz", id: id.to_string() } }
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Export(#[from] ExportError),
  #[error(transparent)]
  Convert(#[from] ConvertError),
  #[error(transparent)]
  Store(#[from] StoreError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Export(ExportError::Pack(_)) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::Export(_) => StatusCode::BAD_REQUEST,
      ApiError::Convert(ConvertError::External(_)) => StatusCode::BAD_GATEWAY,
      ApiError::Convert(ConvertError::Disabled) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Convert(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
      ApiError::Store(_) => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> axum::response::Response {
    let status = self.status();
    match &self {
      ApiError::Export(ExportError::Pack(detail)) => {
        error!(target: "export", %detail, "Document packing failed");
      }
      ApiError::Export(ExportError::InvalidQuestion { position, detail }) => {
        warn!(target: "export", %status, position, %detail, "Export selection rejected");
      }
      ApiError::Convert(ConvertError::InvalidItem { index, reason }) => {
        warn!(target: "convert", %status, index, %reason, "AI conversion rejected");
      }
      e if status.is_server_error() => error!(target: "teacoo", %status, error = %e, "Request failed"),
      e => warn!(target: "teacoo", %status, error = %e, "Request rejected"),
    }
    (status, Json(ErrorOut { error: self.to_string() })).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn statuses_follow_the_taxonomy() {
    assert_eq!(ApiError::from(ExportError::EmptySelection).status(), StatusCode::BAD_REQUEST);
    assert_eq!(ApiError::from(ConvertError::External("down".into())).status(), StatusCode::BAD_GATEWAY);
    assert_eq!(ApiError::from(ConvertError::DataShape).status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ApiError::from(StoreError::quiz("q1")).status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn pack_errors_hide_their_detail() {
    let e = ApiError::from(ExportError::Pack("zip: disk full".into()));
    assert_eq!(e.to_string(), "Failed to build the document");
    assert_eq!(ConvertError::DataShape.to_string(), DATA_SHAPE_MESSAGE);
  }

  #[test]
  fn malformed_items_report_only_their_position() {
    let serde_err = serde_json::from_value::<crate::domain::Question>(serde_json::json!({ "type": "essay" }))
      .unwrap_err()
      .to_string();

    let convert = ApiError::from(ConvertError::InvalidItem { index: 3, reason: serde_err.clone() });
    assert_eq!(convert.to_string(), "AI question 3 is malformed");

    let export = ApiError::from(ExportError::InvalidQuestion { position: 2, detail: serde_err.clone() });
    assert_eq!(export.to_string(), "Invalid question selection: question 2 is malformed");
    assert_eq!(export.status(), StatusCode::BAD_REQUEST);

    for message in [convert.to_string(), export.to_string()] {
      assert!(!message.contains(&serde_err));
      assert!(!message.contains("variant"));
      assert!(!message.contains("missing field"));
    }
  }
}
