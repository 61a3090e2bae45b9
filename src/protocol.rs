//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{Question, QuestionBody};

/// Question as sent by the editor grid: everything except id and timestamps.
#[derive(Debug, Deserialize)]
pub struct QuestionIn {
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(flatten)]
    pub body: QuestionBody,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionsQuery {
    pub tag: Option<String>,
}

#[derive(Serialize)]
pub struct QuestionsOut {
    pub questions: Vec<Question>,
}

#[derive(Serialize)]
pub struct QuestionOut {
    pub question: Question,
}

#[derive(Deserialize)]
pub struct ConvertIn {
    pub text: String,
    #[serde(default, rename = "systemPrompt")]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizIn {
    pub title: String,
    #[serde(default)]
    pub roster_enabled: bool,
    #[serde(default)]
    pub roster: Vec<String>,
    pub question_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseIn {
    pub name: String,
    #[serde(default)]
    pub answers: HashMap<String, Value>,
    #[serde(default)]
    pub duration_secs: u64,
}

#[derive(Serialize)]
pub struct DeletedOut {
    pub deleted: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub ai_enabled: bool,
}
