//! HTTP endpoint handlers. These are thin wrappers that forward to state and logic.
//! Each handler is instrumented and logs ids and sizes, never question contents.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::header,
  response::IntoResponse,
  Json,
};
use serde_json::Value;
use tracing::{info, instrument};

use crate::errors::ApiError;
use crate::export::CONTENT_TYPE;
use crate::logic::{convert_single, convert_text, export_selection};
use crate::protocol::*;
use crate::results::QuizView;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, ai_enabled: state.openai.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_questions(
  State(state): State<Arc<AppState>>,
  Query(q): Query<QuestionsQuery>,
) -> impl IntoResponse {
  let questions = state.list_questions(q.tag.as_deref()).await;
  Json(QuestionsOut { questions })
}

#[instrument(level = "info", skip(state, body), fields(kind = body.body.kind()))]
pub async fn http_create_question(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuestionIn>,
) -> Result<impl IntoResponse, ApiError> {
  let question = state.create_question(body).await?;
  Ok(Json(QuestionOut { question }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  let question = state.get_question(&id).await?;
  Ok(Json(QuestionOut { question }))
}

#[instrument(level = "info", skip(state, body), fields(kind = body.body.kind()))]
pub async fn http_update_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<QuestionIn>,
) -> Result<impl IntoResponse, ApiError> {
  let question = state.update_question(&id, body).await?;
  Ok(Json(QuestionOut { question }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  state.delete_question(&id).await?;
  Ok(Json(DeletedOut { deleted: true }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_export(
  State(state): State<Arc<AppState>>,
  Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
  let doc = export_selection(&state, &body)?;
  info!(target: "export", filename = %doc.filename, size = doc.bytes.len(), "HTTP export served");
  let disposition = format!("attachment; filename=\"{}\"", doc.filename);
  Ok((
    [(header::CONTENT_TYPE, CONTENT_TYPE.to_string()), (header::CONTENT_DISPOSITION, disposition)],
    doc.bytes,
  ))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_convert(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ConvertIn>,
) -> Result<impl IntoResponse, ApiError> {
  let questions = convert_text(&state, &body).await?;
  Ok(Json(QuestionsOut { questions }))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_convert_single(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ConvertIn>,
) -> Result<impl IntoResponse, ApiError> {
  let question = convert_single(&state, &body).await?;
  Ok(Json(QuestionOut { question }))
}

#[instrument(level = "info", skip(state, body), fields(title = %body.title))]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuizIn>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(state.publish_quiz(body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  let quiz = state.get_quiz(&id).await?;
  Ok(Json(QuizView::from(&quiz)))
}

#[instrument(level = "info", skip(state, body), fields(answers = body.answers.len()))]
pub async fn http_post_response(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ResponseIn>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(state.submit_response(&id, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_results(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(state.quiz_results(&id).await?))
}
