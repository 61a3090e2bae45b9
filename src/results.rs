//! Published quizzes, student responses, grading and per-quiz result aggregation.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Question, QuestionBody, SubAnswer};

/// A published quiz. Questions are snapshotted at publish time so later bank
/// edits do not change what students see or how they are graded.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
  pub id: String,
  pub title: String,
  pub roster_enabled: bool,
  #[serde(default)]
  pub roster: Vec<String>,
  pub questions: Vec<Question>,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
  pub id: String,
  pub quiz_id: String,
  pub name: String,
  /// Question id → submitted answer.
  pub answers: HashMap<String, Value>,
  pub score: u32,
  pub duration_secs: u64,
  pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResults {
  pub quiz_id: String,
  pub title: String,
  pub total_points: u32,
  pub submission_count: usize,
  pub average_score: f64,
  pub submissions: Vec<ResponseRecord>,
  /// Roster names without a response, in roster order. Empty when the roster is off.
  pub non_submitters: Vec<String>,
}

/// What a student sees of a published quiz: prompts and choices, never answers,
/// blank solutions or explanations.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
  pub id: String,
  pub title: String,
  pub roster_enabled: bool,
  pub roster: Vec<String>,
  pub questions: Vec<StudentQuestion>,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StudentQuestion {
  pub id: String,
  #[serde(flatten)]
  pub body: StudentBody,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudentBody {
  SingleChoice { content: String, options: Vec<String> },
  MultipleChoice { content: String, options: Vec<String> },
  FillInBlank {
    content: String,
    #[serde(rename = "blankCount")]
    blank_count: usize,
  },
  ShortAnswer { content: String },
  ReadingComprehension { content: String, article: String, questions: Vec<StudentChoice> },
  Cloze { content: String, questions: Vec<StudentChoice> },
}

/// Reading sub-question or cloze blank. Cloze blanks have no prompt of their own.
#[derive(Clone, Debug, Serialize)]
pub struct StudentChoice {
  pub id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  pub options: Vec<String>,
}

impl From<&Question> for StudentQuestion {
  fn from(q: &Question) -> Self {
    let body = match &q.body {
      QuestionBody::SingleChoice { content, options, .. } => {
        StudentBody::SingleChoice { content: content.clone(), options: options.clone() }
      }
      QuestionBody::MultipleChoice { content, options, .. } => {
        StudentBody::MultipleChoice { content: content.clone(), options: options.clone() }
      }
      QuestionBody::FillInBlank { content, blanks } => {
        StudentBody::FillInBlank { content: content.clone(), blank_count: blanks.len() }
      }
      QuestionBody::ShortAnswer { content, .. } => StudentBody::ShortAnswer { content: content.clone() },
      QuestionBody::ReadingComprehension { content, article, questions } => StudentBody::ReadingComprehension {
        content: content.clone(),
        article: article.clone(),
        questions: questions
          .iter()
          .map(|sub| StudentChoice { id: sub.id.clone(), content: Some(sub.content.clone()), options: sub.options.clone() })
          .collect(),
      },
      QuestionBody::Cloze { content, questions } => StudentBody::Cloze {
        content: content.clone(),
        questions: questions
          .iter()
          .map(|blank| StudentChoice { id: blank.id.clone(), content: None, options: blank.options.clone() })
          .collect(),
      },
    };
    StudentQuestion { id: q.id.clone(), body }
  }
}

impl From<&QuizRecord> for QuizView {
  fn from(quiz: &QuizRecord) -> Self {
    QuizView {
      id: quiz.id.clone(),
      title: quiz.title.clone(),
      roster_enabled: quiz.roster_enabled,
      roster: quiz.roster.clone(),
      questions: quiz.questions.iter().map(StudentQuestion::from).collect(),
      created_at: quiz.created_at,
    }
  }
}

/// Number of auto-gradable units: one per flat objective question, one per
/// reading/cloze sub-question. Short answers are not auto-graded.
pub fn gradable_units(questions: &[Question]) -> u32 {
  questions
    .iter()
    .map(|q| match &q.body {
      QuestionBody::SingleChoice { .. } | QuestionBody::MultipleChoice { .. } | QuestionBody::FillInBlank { .. } => 1,
      QuestionBody::ShortAnswer { .. } => 0,
      QuestionBody::ReadingComprehension { questions, .. } => questions.len() as u32,
      QuestionBody::Cloze { questions, .. } => questions.len() as u32,
    })
    .sum()
}

pub fn grade(questions: &[Question], answers: &HashMap<String, Value>) -> u32 {
  questions
    .iter()
    .map(|q| answers.get(&q.id).map(|given| grade_one(&q.body, given)).unwrap_or(0))
    .sum()
}

fn as_index(v: &Value) -> Option<usize> {
  v.as_u64().and_then(|n| usize::try_from(n).ok())
}

fn grade_one(body: &QuestionBody, given: &Value) -> u32 {
  match body {
    QuestionBody::SingleChoice { answer, .. } => u32::from(as_index(given) == Some(*answer)),
    QuestionBody::MultipleChoice { answers, .. } => {
      let expected: BTreeSet<usize> = answers.iter().copied().collect();
      let got: Option<BTreeSet<usize>> = given.as_array().and_then(|xs| xs.iter().map(as_index).collect());
      u32::from(got.as_ref() == Some(&expected))
    }
    QuestionBody::FillInBlank { blanks, .. } => {
      let ok = given.as_array().is_some_and(|xs| {
        xs.len() == blanks.len()
          && xs.iter().zip(blanks).all(|(x, b)| x.as_str().map(str::trim) == Some(b.trim()))
      });
      u32::from(ok)
    }
    QuestionBody::ShortAnswer { .. } => 0,
    QuestionBody::ReadingComprehension { questions, .. } => {
      let Some(xs) = given.as_array() else { return 0 };
      questions
        .iter()
        .zip(xs)
        .filter(|(sub, x)| match &sub.answer {
          SubAnswer::Index(i) => as_index(x) == Some(*i),
          SubAnswer::Text(t) => {
            x.as_str() == Some(t.as_str())
              || as_index(x).and_then(|i| sub.options.get(i)).is_some_and(|o| o == t)
          }
        })
        .count() as u32
    }
    QuestionBody::Cloze { questions, .. } => {
      let Some(xs) = given.as_array() else { return 0 };
      questions
        .iter()
        .zip(xs)
        .filter(|(blank, x)| as_index(x) == Some(blank.answer))
        .count() as u32
    }
  }
}

/// Join a quiz with its responses.
pub fn aggregate(quiz: &QuizRecord, responses: &[ResponseRecord]) -> QuizResults {
  let mut submissions: Vec<ResponseRecord> = responses
    .iter()
    .filter(|r| r.quiz_id == quiz.id)
    .cloned()
    .collect();
  submissions.sort_by_key(|r| r.submitted_at);

  let average_score = if submissions.is_empty() {
    0.0
  } else {
    submissions.iter().map(|r| f64::from(r.score)).sum::<f64>() / submissions.len() as f64
  };

  let non_submitters = if quiz.roster_enabled {
    let submitted: HashSet<&str> = submissions.iter().map(|r| r.name.trim()).collect();
    quiz
      .roster
      .iter()
      .filter(|name| !submitted.contains(name.trim()))
      .cloned()
      .collect()
  } else {
    Vec::new()
  };

  QuizResults {
    quiz_id: quiz.id.clone(),
    title: quiz.title.clone(),
    total_points: gradable_units(&quiz.questions),
    submission_count: submissions.len(),
    average_score,
    submissions,
    non_submitters,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{ClozeBlank, ReadingSubQuestion};
  use chrono::Duration;
  use serde_json::json;

  fn opts(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
  }

  fn quiz() -> QuizRecord {
    let now = Utc::now();
    QuizRecord {
      id: "quiz1".into(),
      title: "Unit 1".into(),
      roster_enabled: true,
      roster: vec!["Ann".into(), "Bo".into(), "Cy".into()],
      questions: vec![
        Question::new(QuestionBody::SingleChoice { content: "s".into(), options: opts(&["a", "b"]), answer: 1 }, now),
        Question::new(QuestionBody::MultipleChoice { content: "m".into(), options: opts(&["a", "b", "c"]), answers: vec![2, 0] }, now),
        Question::new(QuestionBody::FillInBlank { content: "f".into(), blanks: opts(&["x", "y"]) }, now),
        Question::new(QuestionBody::ShortAnswer { content: "w".into(), answer: "free".into() }, now),
        Question::new(
          QuestionBody::ReadingComprehension {
            content: "r".into(),
            article: "text".into(),
            questions: vec![
              ReadingSubQuestion::new("1", opts(&["a", "b"]), SubAnswer::Index(0)),
              ReadingSubQuestion::new("2", opts(&["a", "b"]), SubAnswer::Text("b".into())),
            ],
          },
          now,
        ),
        Question::new(
          QuestionBody::Cloze {
            content: "c".into(),
            questions: vec![ClozeBlank::new(opts(&["p", "q"]), 1)],
          },
          now,
        ),
      ],
      created_at: now,
    }
  }

  fn response(quiz: &QuizRecord, name: &str, score: u32, offset_secs: i64) -> ResponseRecord {
    ResponseRecord {
      id: format!("r-{name}"),
      quiz_id: quiz.id.clone(),
      name: name.into(),
      answers: HashMap::new(),
      score,
      duration_secs: 60,
      submitted_at: quiz.created_at + Duration::seconds(offset_secs),
    }
  }

  #[test]
  fn counts_gradable_units() {
    assert_eq!(gradable_units(&quiz().questions), 1 + 1 + 1 + 0 + 2 + 1);
  }

  #[test]
  fn perfect_answers_score_every_unit() {
    let q = quiz();
    let ids: Vec<&str> = q.questions.iter().map(|q| q.id.as_str()).collect();
    let answers: HashMap<String, Value> = [
      (ids[0], json!(1)),
      (ids[1], json!([0, 2])),
      (ids[2], json!([" x", "y "])),
      (ids[3], json!("anything")),
      (ids[4], json!([0, 1])),
      (ids[5], json!([1])),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    assert_eq!(grade(&q.questions, &answers), gradable_units(&q.questions));
  }

  #[test]
  fn wrong_or_missing_answers_score_nothing() {
    let q = quiz();
    let answers: HashMap<String, Value> = [
      (q.questions[0].id.clone(), json!(0)),
      (q.questions[1].id.clone(), json!([0])),
      (q.questions[2].id.clone(), json!(["x"])),
    ]
    .into_iter()
    .collect();
    assert_eq!(grade(&q.questions, &answers), 0);
  }

  #[test]
  fn aggregate_orders_submissions_and_finds_non_submitters() {
    let q = quiz();
    let responses = vec![response(&q, "Cy", 4, 20), response(&q, "Ann", 2, 10)];
    let results = aggregate(&q, &responses);
    assert_eq!(results.submission_count, 2);
    assert_eq!(results.submissions[0].name, "Ann");
    assert_eq!(results.non_submitters, vec!["Bo".to_string()]);
    assert!((results.average_score - 3.0).abs() < f64::EPSILON);
  }

  #[test]
  fn student_view_hides_answers_and_explanations() {
    let mut q = quiz();
    q.questions[1].explanation = "because".into();
    let view = QuizView::from(&q);
    assert_eq!(view.questions.len(), q.questions.len());
    assert_eq!(view.questions[0].id, q.questions[0].id);

    let v = serde_json::to_value(&view).unwrap();
    for item in v["questions"].as_array().unwrap() {
      for key in ["answer", "answers", "blanks", "explanation"] {
        assert!(item.get(key).is_none(), "{key} leaked in {item}");
      }
    }
    assert_eq!(v["questions"][2]["blankCount"], 2);
    assert_eq!(v["questions"][4]["questions"][1], json!({ "id": q_sub_id(&q, 4, 1), "content": "2", "options": ["a", "b"] }));
    assert!(v["questions"][5]["questions"][0].get("answer").is_none());
  }

  fn q_sub_id(q: &QuizRecord, at: usize, sub: usize) -> String {
    match &q.questions[at].body {
      QuestionBody::ReadingComprehension { questions, .. } => questions[sub].id.clone(),
      _ => String::new(),
    }
  }

  #[test]
  fn roster_off_reports_no_non_submitters() {
    let mut q = quiz();
    q.roster_enabled = false;
    let results = aggregate(&q, &[]);
    assert!(results.non_submitters.is_empty());
    assert_eq!(results.average_score, 0.0);
  }
}
