//! Boundary operations called by the HTTP handlers.
//!
//! This includes:
//!   - Export: selection check → formatter → docx bytes + filename
//!   - AI convert: raw text → service call → normalizer → questions
//!
//! Failures are terminal for the current operation (no retries).

use chrono::Local;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::domain::Question;
use crate::errors::{ConvertError, ExportError};
use crate::export::{export_document, parse_selection, ExportedDocument};
use crate::normalize::normalize_response;
use crate::protocol::ConvertIn;
use crate::state::AppState;

/// Validate the posted selection and build the Word document. Nothing is
/// formatted when the selection is empty or malformed.
#[instrument(level = "info", skip_all)]
pub fn export_selection(state: &AppState, payload: &Value) -> Result<ExportedDocument, ExportError> {
  let questions = parse_selection(payload).map_err(|e| {
    warn!(target: "export", error = %e, "Export selection rejected");
    e
  })?;
  let now = state.clock.now().with_timezone(&Local);
  export_document(&questions, &now, &state.export)
}

/// Convert free text into normalized questions through the AI service.
#[instrument(level = "info", skip(state, input), fields(text_len = input.text.len()))]
pub async fn convert_text(state: &AppState, input: &ConvertIn) -> Result<Vec<Question>, ConvertError> {
  let oa = state.openai.as_ref().ok_or(ConvertError::Disabled)?;
  let payload = oa
    .convert_text(&state.prompts, &input.text, input.system_prompt.as_deref(), input.example.as_deref())
    .await?;
  let questions = normalize_payload(state, &payload)?;
  info!(target: "convert", count = questions.len(), "AI conversion produced questions");
  Ok(questions)
}

/// Service payload → questions stamped with the state's clock.
pub fn normalize_payload(state: &AppState, payload: &Value) -> Result<Vec<Question>, ConvertError> {
  normalize_response(payload, state.clock.now()).map_err(|e| {
    warn!(target: "convert", error = %e, "AI payload rejected");
    e
  })
}

/// Single-question flavour: first converted question, or `Empty`.
#[instrument(level = "info", skip(state, input), fields(text_len = input.text.len()))]
pub async fn convert_single(state: &AppState, input: &ConvertIn) -> Result<Question, ConvertError> {
  convert_text(state, input).await?.into_iter().next().ok_or(ConvertError::Empty)
}
