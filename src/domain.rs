//! Question model: the six question types, their sub-questions, and construction-time checks.
//!
//! A `Question` carries the shared fields (id, tags, explanation, timestamps) and a
//! `QuestionBody` holding the type-specific part. On the wire the body is flattened
//! next to the shared fields and tagged by `type`.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Minimum number of options on any option-bearing question or sub-question.
pub const MIN_OPTIONS: usize = 2;

/// Fresh opaque identifier for questions and sub-questions.
pub fn new_id() -> String {
  Uuid::new_v4().to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: String,
  #[serde(default)]
  pub tags: BTreeSet<String>,
  #[serde(default)]
  pub explanation: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[serde(flatten)]
  pub body: QuestionBody,
  /// Fields we do not model, kept so they survive a round trip through the backend.
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub extra: Map<String, Value>,
}

/// Type-specific part of a question.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionBody {
  #[serde(alias = "single")]
  SingleChoice {
    content: String,
    options: Vec<String>,
    answer: usize,
  },
  #[serde(alias = "multiple")]
  MultipleChoice {
    content: String,
    options: Vec<String>,
    /// Kept in the order given; rendering does not sort.
    answers: Vec<usize>,
  },
  #[serde(alias = "fill")]
  FillInBlank {
    content: String,
    /// Accepted text per blank marker, in marker order.
    blanks: Vec<String>,
  },
  #[serde(alias = "short")]
  ShortAnswer {
    content: String,
    answer: String,
  },
  #[serde(alias = "reading")]
  ReadingComprehension {
    content: String,
    article: String,
    questions: Vec<ReadingSubQuestion>,
  },
  Cloze {
    #[serde(default)]
    content: String,
    questions: Vec<ClozeBlank>,
  },
}

/// Sub-question of a reading passage. Keys we do not model stay in `extra` and
/// are written back next to the known ones.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReadingSubQuestion {
  #[serde(default)]
  pub id: String,
  pub content: String,
  pub options: Vec<String>,
  #[serde(default)]
  pub answer: SubAnswer,
  #[serde(default)]
  pub explanation: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl ReadingSubQuestion {
  /// Empty id; `Question::new` or `fill_missing_sub_ids` assigns one.
  pub fn new(content: impl Into<String>, options: Vec<String>, answer: SubAnswer) -> Self {
    Self {
      id: String::new(),
      content: content.into(),
      options,
      answer,
      explanation: String::new(),
      extra: Map::new(),
    }
  }
}

/// Answer of a reading sub-question. The AI service may hand back either an
/// option index or the option text itself; both are kept as given.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SubAnswer {
  Index(usize),
  Text(String),
}

impl Default for SubAnswer {
  fn default() -> Self { SubAnswer::Text(String::new()) }
}

/// One blank of a cloze passage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClozeBlank {
  #[serde(default)]
  pub id: String,
  pub options: Vec<String>,
  #[serde(default)]
  pub answer: usize,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl ClozeBlank {
  pub fn new(options: Vec<String>, answer: usize) -> Self {
    Self { id: String::new(), options, answer, extra: Map::new() }
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
  #[error("{field}: needs at least 2 options, got {got}")]
  TooFewOptions { field: String, got: usize },
  #[error("{field}: answer index {index} is out of range for {len} options")]
  AnswerOutOfRange { field: String, index: usize, len: usize },
  #[error("{field}: answer must be an option index")]
  AnswerNotIndex { field: String },
  #[error("duplicate sub-question id '{0}'")]
  DuplicateSubId(String),
}

impl Question {
  /// Build a question with a fresh id, fresh sub-question ids and both timestamps set to `now`.
  pub fn new(body: QuestionBody, now: DateTime<Utc>) -> Self {
    let mut body = body;
    body.regenerate_sub_ids();
    Self {
      id: new_id(),
      tags: BTreeSet::new(),
      explanation: String::new(),
      created_at: now,
      updated_at: now,
      body,
      extra: Map::new(),
    }
  }

  pub fn with_tags<I, S>(mut self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.tags = tags.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
    self.explanation = explanation.into();
    self
  }

  pub fn content(&self) -> &str {
    self.body.content()
  }

  pub fn kind(&self) -> &'static str {
    self.body.kind()
  }

  /// Enforce option counts, answer index bounds and sub-question id uniqueness.
  pub fn validate(&self) -> Result<(), ValidationError> {
    match &self.body {
      QuestionBody::SingleChoice { options, answer, .. } => {
        check_options("options", options)?;
        check_index("answer", *answer, options.len())
      }
      QuestionBody::MultipleChoice { options, answers, .. } => {
        check_options("options", options)?;
        answers.iter().try_for_each(|i| check_index("answers", *i, options.len()))
      }
      QuestionBody::FillInBlank { .. } | QuestionBody::ShortAnswer { .. } => Ok(()),
      QuestionBody::ReadingComprehension { questions, .. } => {
        unique_ids(questions.iter().map(|q| q.id.as_str()))?;
        for (k, sub) in questions.iter().enumerate() {
          check_options(&format!("questions[{k}].options"), &sub.options)?;
          let field = format!("questions[{k}].answer");
          match &sub.answer {
            SubAnswer::Index(i) => check_index(&field, *i, sub.options.len())?,
            SubAnswer::Text(_) => return Err(ValidationError::AnswerNotIndex { field }),
          }
        }
        Ok(())
      }
      QuestionBody::Cloze { questions, .. } => {
        unique_ids(questions.iter().map(|q| q.id.as_str()))?;
        for (k, blank) in questions.iter().enumerate() {
          check_options(&format!("questions[{k}].options"), &blank.options)?;
          check_index(&format!("questions[{k}].answer"), blank.answer, blank.options.len())?;
        }
        Ok(())
      }
    }
  }
}

impl QuestionBody {
  pub fn content(&self) -> &str {
    match self {
      QuestionBody::SingleChoice { content, .. }
      | QuestionBody::MultipleChoice { content, .. }
      | QuestionBody::FillInBlank { content, .. }
      | QuestionBody::ShortAnswer { content, .. }
      | QuestionBody::ReadingComprehension { content, .. }
      | QuestionBody::Cloze { content, .. } => content,
    }
  }

  /// Wire name of the variant (the `type` tag).
  pub fn kind(&self) -> &'static str {
    match self {
      QuestionBody::SingleChoice { .. } => "single_choice",
      QuestionBody::MultipleChoice { .. } => "multiple_choice",
      QuestionBody::FillInBlank { .. } => "fill_in_blank",
      QuestionBody::ShortAnswer { .. } => "short_answer",
      QuestionBody::ReadingComprehension { .. } => "reading_comprehension",
      QuestionBody::Cloze { .. } => "cloze",
    }
  }

  /// Replace every sub-question id with a fresh one. No-op for flat variants.
  pub fn regenerate_sub_ids(&mut self) {
    match self {
      QuestionBody::ReadingComprehension { questions, .. } => {
        questions.iter_mut().for_each(|q| q.id = new_id());
      }
      QuestionBody::Cloze { questions, .. } => {
        questions.iter_mut().for_each(|q| q.id = new_id());
      }
      _ => {}
    }
  }

  /// Give sub-questions added in the editor (empty id) a fresh id; keep the rest.
  pub fn fill_missing_sub_ids(&mut self) {
    match self {
      QuestionBody::ReadingComprehension { questions, .. } => {
        questions.iter_mut().filter(|q| q.id.is_empty()).for_each(|q| q.id = new_id());
      }
      QuestionBody::Cloze { questions, .. } => {
        questions.iter_mut().filter(|q| q.id.is_empty()).for_each(|q| q.id = new_id());
      }
      _ => {}
    }
  }
}

fn check_options(field: &str, options: &[String]) -> Result<(), ValidationError> {
  if options.len() < MIN_OPTIONS {
    return Err(ValidationError::TooFewOptions { field: field.to_string(), got: options.len() });
  }
  Ok(())
}

fn check_index(field: &str, index: usize, len: usize) -> Result<(), ValidationError> {
  if index >= len {
    return Err(ValidationError::AnswerOutOfRange { field: field.to_string(), index, len });
  }
  Ok(())
}

fn unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), ValidationError> {
  let mut seen = HashSet::new();
  for id in ids {
    if !seen.insert(id) {
      return Err(ValidationError::DuplicateSubId(id.to_string()));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn opts(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn wire_format_flattens_body_next_to_shared_fields() {
    let q = Question::new(
      QuestionBody::SingleChoice { content: "Q1".into(), options: opts(&["A", "B"]), answer: 1 },
      Utc::now(),
    )
    .with_tags(["grammar"]);
    let v = serde_json::to_value(&q).unwrap();
    assert_eq!(v["type"], "single_choice");
    assert_eq!(v["answer"], 1);
    assert_eq!(v["tags"], json!(["grammar"]));
    assert!(v.get("createdAt").is_some());
    assert!(v.get("extra").is_none());

    let back: Question = serde_json::from_value(v).unwrap();
    assert_eq!(back, q);
  }

  #[test]
  fn reading_sub_answer_accepts_index_or_text() {
    let idx: SubAnswer = serde_json::from_value(json!(2)).unwrap();
    let txt: SubAnswer = serde_json::from_value(json!("cat")).unwrap();
    assert_eq!(idx, SubAnswer::Index(2));
    assert_eq!(txt, SubAnswer::Text("cat".into()));
  }

  #[test]
  fn sub_questions_without_ids_keep_unknown_keys() {
    let now = Utc::now().to_rfc3339();
    let v = json!({
      "id": "q1", "type": "reading_comprehension", "content": "Read", "article": "A",
      "createdAt": now, "updatedAt": now,
      "questions": [{ "content": "Who?", "options": ["a", "b"], "answer": 0, "difficulty": "easy" }]
    });
    let q: Question = serde_json::from_value(v).unwrap();
    let QuestionBody::ReadingComprehension { questions, .. } = &q.body else { panic!("reading expected") };
    assert_eq!(questions[0].id, "");
    assert_eq!(questions[0].explanation, "");
    assert_eq!(questions[0].extra.get("difficulty"), Some(&json!("easy")));

    let out = serde_json::to_value(&q).unwrap();
    assert_eq!(out["questions"][0]["difficulty"], "easy");
    assert!(out["questions"][0].get("extra").is_none());
  }

  #[test]
  fn new_regenerates_sub_ids() {
    let body = QuestionBody::Cloze {
      content: String::new(),
      questions: vec![
        ClozeBlank { id: "same".into(), ..ClozeBlank::new(opts(&["x", "y"]), 0) },
        ClozeBlank { id: "same".into(), ..ClozeBlank::new(opts(&["x", "y"]), 1) },
      ],
    };
    let q = Question::new(body, Utc::now());
    let QuestionBody::Cloze { questions, .. } = &q.body else { panic!("cloze expected") };
    assert_ne!(questions[0].id, "same");
    assert_ne!(questions[0].id, questions[1].id);
    assert!(q.validate().is_ok());
  }

  #[test]
  fn validate_rejects_bad_option_counts_and_indices() {
    let one_option = Question::new(
      QuestionBody::SingleChoice { content: "Q".into(), options: opts(&["only"]), answer: 0 },
      Utc::now(),
    );
    assert!(matches!(one_option.validate(), Err(ValidationError::TooFewOptions { got: 1, .. })));

    let out_of_range = Question::new(
      QuestionBody::MultipleChoice { content: "Q".into(), options: opts(&["a", "b"]), answers: vec![0, 2] },
      Utc::now(),
    );
    assert_eq!(
      out_of_range.validate(),
      Err(ValidationError::AnswerOutOfRange { field: "answers".into(), index: 2, len: 2 })
    );
  }

  #[test]
  fn validate_requires_index_answers_on_reading_sub_questions() {
    let q = Question::new(
      QuestionBody::ReadingComprehension {
        content: "Read".into(),
        article: "Text".into(),
        questions: vec![ReadingSubQuestion::new("Who?", opts(&["Tom", "Ann"]), SubAnswer::Text("Tom".into()))],
      },
      Utc::now(),
    );
    assert!(matches!(q.validate(), Err(ValidationError::AnswerNotIndex { .. })));
  }

  #[test]
  fn validate_rejects_duplicate_sub_ids() {
    let mut q = Question::new(
      QuestionBody::Cloze {
        content: String::new(),
        questions: vec![
          ClozeBlank::new(opts(&["x", "y"]), 0),
          ClozeBlank::new(opts(&["x", "y"]), 0),
        ],
      },
      Utc::now(),
    );
    if let QuestionBody::Cloze { questions, .. } = &mut q.body {
      questions[1].id = questions[0].id.clone();
    }
    assert!(matches!(q.validate(), Err(ValidationError::DuplicateSubId(_))));
  }
}
