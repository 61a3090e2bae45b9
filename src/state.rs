//! Application state: in-memory stores, prompts, export layout, OpenAI client and clock.
//!
//! This module owns:
//!   - the question bank (by id)
//!   - published quizzes (by id) and their responses (by quiz id)
//!   - the prompts/export config (from TOML or defaults)
//!   - optional OpenAI client
//!
//! Questions are validated whenever they enter the bank or a quiz. Deleting a
//! question drops its sub-questions with it since they are owned by the parent.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::clock::{Clock, SystemClock};
use crate::config::{load_app_config_from_env, AppConfig, ExportLayout, Prompts};
use crate::domain::{new_id, Question};
use crate::errors::StoreError;
use crate::openai::OpenAI;
use crate::protocol::{QuestionIn, QuizIn, ResponseIn};
use crate::results::{aggregate, grade, QuizRecord, QuizResults, ResponseRecord};
use crate::seeds::seed_questions;

#[derive(Clone)]
pub struct AppState {
    pub questions: Arc<RwLock<HashMap<String, Question>>>,
    pub quizzes: Arc<RwLock<HashMap<String, QuizRecord>>>,
    pub responses: Arc<RwLock<HashMap<String, Vec<ResponseRecord>>>>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub export: ExportLayout,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Build state from env: load config, seed the bank, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_app_config_from_env().unwrap_or_default();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "teacoo", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "teacoo", "OpenAI disabled (no OPENAI_API_KEY). AI conversion unavailable.");
        }

        Self::with_parts(config, openai, Arc::new(SystemClock))
    }

    pub fn with_parts(config: AppConfig, openai: Option<OpenAI>, clock: Arc<dyn Clock>) -> Self {
        let mut bank = HashMap::new();
        if config.seed_bank {
            for q in seed_questions(clock.now()) {
                bank.insert(q.id.clone(), q);
            }
            info!(target: "teacoo", count = bank.len(), "Seeded question bank");
        }

        Self {
            questions: Arc::new(RwLock::new(bank)),
            quizzes: Arc::new(RwLock::new(HashMap::new())),
            responses: Arc::new(RwLock::new(HashMap::new())),
            openai,
            prompts: config.prompts,
            export: config.export,
            clock,
        }
    }

    /// Validate and insert a new question with fresh ids and timestamps.
    #[instrument(level = "debug", skip(self, input), fields(kind = input.body.kind()))]
    pub async fn create_question(&self, input: QuestionIn) -> Result<Question, StoreError> {
        let mut q = Question::new(input.body, self.clock.now());
        q.tags = input.tags;
        q.explanation = input.explanation;
        q.extra = input.extra;
        q.validate()?;
        self.questions.write().await.insert(q.id.clone(), q.clone());
        info!(target: "teacoo", id = %q.id, kind = q.kind(), "Question created");
        Ok(q)
    }

    /// All questions, oldest first, optionally filtered by tag.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_questions(&self, tag: Option<&str>) -> Vec<Question> {
        let bank = self.questions.read().await;
        let mut out: Vec<Question> = bank
            .values()
            .filter(|q| tag.map_or(true, |t| q.tags.contains(t)))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_question(&self, id: &str) -> Result<Question, StoreError> {
        self.questions.read().await.get(id).cloned().ok_or_else(|| StoreError::question(id))
    }

    /// Replace a question's content in place; id and creation time are kept.
    #[instrument(level = "debug", skip(self, input), fields(%id))]
    pub async fn update_question(&self, id: &str, input: QuestionIn) -> Result<Question, StoreError> {
        let mut bank = self.questions.write().await;
        let existing = bank.get(id).ok_or_else(|| StoreError::question(id))?;

        let mut body = input.body;
        body.fill_missing_sub_ids();
        let updated = Question {
            id: existing.id.clone(),
            tags: input.tags,
            explanation: input.explanation,
            created_at: existing.created_at,
            updated_at: self.clock.now(),
            body,
            extra: input.extra,
        };
        updated.validate()?;
        bank.insert(id.to_string(), updated.clone());
        info!(target: "teacoo", %id, kind = updated.kind(), "Question updated");
        Ok(updated)
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn delete_question(&self, id: &str) -> Result<(), StoreError> {
        let removed = self.questions.write().await.remove(id);
        match removed {
            Some(q) => {
                info!(target: "teacoo", %id, kind = q.kind(), "Question deleted");
                Ok(())
            }
            None => Err(StoreError::question(id)),
        }
    }

    /// Publish a quiz from bank questions, snapshotting them in the given order.
    #[instrument(level = "info", skip(self, input), fields(title = %input.title, count = input.question_ids.len()))]
    pub async fn publish_quiz(&self, input: QuizIn) -> Result<QuizRecord, StoreError> {
        if input.question_ids.is_empty() {
            return Err(StoreError::EmptyQuiz);
        }
        let questions = {
            let bank = self.questions.read().await;
            input
                .question_ids
                .iter()
                .map(|id| bank.get(id).cloned().ok_or_else(|| StoreError::question(id)))
                .collect::<Result<Vec<_>, _>>()?
        };
        for q in &questions {
            q.validate()?;
        }

        let quiz = QuizRecord {
            id: new_id(),
            title: input.title,
            roster_enabled: input.roster_enabled,
            roster: input.roster,
            questions,
            created_at: self.clock.now(),
        };
        self.quizzes.write().await.insert(quiz.id.clone(), quiz.clone());
        info!(target: "quiz", id = %quiz.id, questions = quiz.questions.len(), roster = quiz.roster.len(), "Quiz published");
        Ok(quiz)
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_quiz(&self, id: &str) -> Result<QuizRecord, StoreError> {
        self.quizzes.read().await.get(id).cloned().ok_or_else(|| StoreError::quiz(id))
    }

    /// Grade and store one student's response.
    #[instrument(level = "info", skip(self, input), fields(%quiz_id, answers = input.answers.len()))]
    pub async fn submit_response(&self, quiz_id: &str, input: ResponseIn) -> Result<ResponseRecord, StoreError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::MissingName);
        }
        let quiz = self.get_quiz(quiz_id).await?;
        let score = grade(&quiz.questions, &input.answers);

        let record = ResponseRecord {
            id: new_id(),
            quiz_id: quiz.id.clone(),
            name,
            answers: input.answers,
            score,
            duration_secs: input.duration_secs,
            submitted_at: self.clock.now(),
        };
        self.responses
            .write()
            .await
            .entry(quiz.id.clone())
            .or_default()
            .push(record.clone());
        info!(target: "quiz", %quiz_id, response = %record.id, score, "Response recorded");
        Ok(record)
    }

    #[instrument(level = "info", skip(self), fields(%quiz_id))]
    pub async fn quiz_results(&self, quiz_id: &str) -> Result<QuizResults, StoreError> {
        let quiz = self.get_quiz(quiz_id).await?;
        let responses = self.responses.read().await.get(quiz_id).cloned().unwrap_or_default();
        Ok(aggregate(&quiz, &responses))
    }
}
