//! Turning the loosely-typed JSON of the text-to-question service into `Question`s.
//!
//! Every item gets a fresh id, fresh timestamps and defaults for the optional
//! shared fields, an empty `content` when missing, and empty `options`/`questions`
//! lists on the variants that carry them. Then the type-specific fixes are applied:
//!   - single choice: an answer given as option text is resolved to its index
//!   - multiple choice / fill-in-blank / short answer: missing answers default to empty
//!   - reading comprehension: missing article defaults to empty; sub-questions get
//!     fresh ids, empty content/options/explanation when missing, and their answers
//!     pass through unresolved (a missing or null answer becomes empty text)
//!   - cloze: blanks get fresh ids and empty options when missing, a missing answer
//!     defaults to the first option
//!
//! Keys the model does not know are moved under `extra` untouched. An item that is
//! not an object, has no known `type`, or carries a field of the wrong JSON type
//! fails the whole conversion; the serde detail is logged, not returned.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use crate::domain::{new_id, Question};
use crate::errors::ConvertError;

const SHARED_KEYS: &[&str] = &["id", "type", "tags", "explanation", "createdAt", "updatedAt", "extra"];

fn variant_keys(kind: &str) -> &'static [&'static str] {
  match kind {
    "single_choice" | "single" => &["content", "options", "answer"],
    "multiple_choice" | "multiple" => &["content", "options", "answers"],
    "fill_in_blank" | "fill" => &["content", "blanks"],
    "short_answer" | "short" => &["content", "answer"],
    "reading_comprehension" | "reading" => &["content", "article", "questions"],
    "cloze" => &["content", "questions"],
    _ => &[],
  }
}

/// Normalize a full service payload (`{"questions": [...]}`).
#[instrument(level = "info", skip(payload, now))]
pub fn normalize_response(payload: &Value, now: DateTime<Utc>) -> Result<Vec<Question>, ConvertError> {
  let items = payload
    .get("questions")
    .and_then(Value::as_array)
    .ok_or(ConvertError::DataShape)?;
  let questions = items
    .iter()
    .enumerate()
    .map(|(index, item)| {
      normalize_item(item, now).map_err(|reason| {
        warn!(target: "convert", item = index + 1, %reason, "AI question could not be normalized");
        ConvertError::InvalidItem { index: index + 1, reason }
      })
    })
    .collect::<Result<Vec<_>, _>>()?;
  debug!(target: "convert", count = questions.len(), "Normalized AI questions");
  Ok(questions)
}

/// Normalize one item. The error is a human-readable reason.
pub fn normalize_item(item: &Value, now: DateTime<Utc>) -> Result<Question, String> {
  let mut obj = item.as_object().cloned().ok_or_else(|| "expected a JSON object".to_string())?;

  obj.insert("id".into(), Value::String(new_id()));
  let ts = Value::String(now.to_rfc3339());
  obj.insert("createdAt".into(), ts.clone());
  obj.insert("updatedAt".into(), ts);
  default_key(&mut obj, "tags", json!([]));
  default_key(&mut obj, "explanation", json!(""));

  let kind = obj
    .get("type")
    .and_then(Value::as_str)
    .map(str::to_string)
    .ok_or_else(|| "missing `type`".to_string())?;

  default_key(&mut obj, "content", json!(""));

  match kind.as_str() {
    "single_choice" | "single" => {
      default_key(&mut obj, "options", json!([]));
      let resolved = resolve_single_answer(obj.get("answer"), obj.get("options"));
      obj.insert("answer".into(), resolved);
    }
    "multiple_choice" | "multiple" => {
      default_key(&mut obj, "options", json!([]));
      default_key(&mut obj, "answers", json!([]));
    }
    "fill_in_blank" | "fill" => default_key(&mut obj, "blanks", json!([])),
    "short_answer" | "short" => default_key(&mut obj, "answer", json!("")),
    "reading_comprehension" | "reading" => {
      default_key(&mut obj, "article", json!(""));
      default_key(&mut obj, "questions", json!([]));
      for_each_sub(&mut obj, |sub| {
        sub.insert("id".into(), Value::String(new_id()));
        default_key(sub, "content", json!(""));
        default_key(sub, "options", json!([]));
        default_key(sub, "answer", json!(""));
        default_key(sub, "explanation", json!(""));
      });
    }
    "cloze" => {
      default_key(&mut obj, "questions", json!([]));
      for_each_sub(&mut obj, |sub| {
        sub.insert("id".into(), Value::String(new_id()));
        default_key(sub, "options", json!([]));
        default_key(sub, "answer", json!(0));
      });
    }
    other => return Err(format!("unknown question type '{other}'")),
  }

  let obj = move_unknown_to_extra(obj, variant_keys(&kind));
  serde_json::from_value::<Question>(Value::Object(obj)).map_err(|e| e.to_string())
}

fn default_key(obj: &mut Map<String, Value>, key: &str, value: Value) {
  match obj.get(key) {
    Some(v) if !v.is_null() => {}
    _ => {
      obj.insert(key.to_string(), value);
    }
  }
}

fn for_each_sub(obj: &mut Map<String, Value>, mut f: impl FnMut(&mut Map<String, Value>)) {
  if let Some(Value::Array(subs)) = obj.get_mut("questions") {
    subs.iter_mut().filter_map(Value::as_object_mut).for_each(|sub| f(sub));
  }
}

/// Option text → index (first exact match). Non-negative integers pass through;
/// anything else, including a missing answer, becomes 0.
fn resolve_single_answer(answer: Option<&Value>, options: Option<&Value>) -> Value {
  let index = match answer {
    Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
    Some(Value::String(text)) => options
      .and_then(Value::as_array)
      .and_then(|opts| opts.iter().position(|o| o.as_str() == Some(text.as_str())))
      .map(|i| i as u64)
      .unwrap_or(0),
    _ => 0,
  };
  Value::from(index)
}

fn move_unknown_to_extra(obj: Map<String, Value>, variant_keys: &[&str]) -> Map<String, Value> {
  let mut known = Map::new();
  let mut extra = match obj.get("extra") {
    Some(Value::Object(m)) => m.clone(),
    _ => Map::new(),
  };
  for (k, v) in obj {
    if k == "extra" {
      continue;
    }
    if SHARED_KEYS.contains(&k.as_str()) || variant_keys.contains(&k.as_str()) {
      known.insert(k, v);
    } else {
      extra.insert(k, v);
    }
  }
  if !extra.is_empty() {
    known.insert("extra".into(), Value::Object(extra));
  }
  known
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{QuestionBody, SubAnswer};
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 8, 30, 0).unwrap()
  }

  fn one(item: Value) -> Question {
    let mut qs = normalize_response(&json!({ "questions": [item] }), now()).unwrap();
    assert_eq!(qs.len(), 1);
    qs.remove(0)
  }

  #[test]
  fn single_choice_text_answer_resolves_to_its_index() {
    let q = one(json!({ "type": "single_choice", "content": "Capital?", "options": ["Rome", "Paris", "Oslo"], "answer": "Paris" }));
    let QuestionBody::SingleChoice { options, answer, .. } = &q.body else { panic!("single choice expected") };
    assert_eq!(options[*answer], "Paris");
    assert!(q.tags.is_empty());
    assert_eq!(q.explanation, "");
    assert_eq!(q.created_at, now());
    assert_eq!(q.updated_at, now());
  }

  #[test]
  fn single_choice_unmatched_or_missing_answer_defaults_to_zero() {
    for answer in [json!("Berlin"), Value::Null, json!(-3)] {
      let q = one(json!({ "type": "single_choice", "content": "Q", "options": ["a", "b"], "answer": answer }));
      assert!(matches!(q.body, QuestionBody::SingleChoice { answer: 0, .. }));
    }
    let q = one(json!({ "type": "single_choice", "content": "Q", "options": ["a", "b"], "answer": 1 }));
    assert!(matches!(q.body, QuestionBody::SingleChoice { answer: 1, .. }));
  }

  #[test]
  fn missing_answer_collections_default_to_empty() {
    let m = one(json!({ "type": "multiple_choice", "content": "M", "options": ["a", "b"] }));
    assert!(matches!(&m.body, QuestionBody::MultipleChoice { answers, .. } if answers.is_empty()));
    let f = one(json!({ "type": "fill_in_blank", "content": "F" }));
    assert!(matches!(&f.body, QuestionBody::FillInBlank { blanks, .. } if blanks.is_empty()));
    let s = one(json!({ "type": "short_answer", "content": "S" }));
    assert!(matches!(&s.body, QuestionBody::ShortAnswer { answer, .. } if answer.is_empty()));
  }

  #[test]
  fn reading_sub_questions_get_fresh_ids_and_unresolved_answers() {
    let q = one(json!({
      "type": "reading_comprehension",
      "content": "Read",
      "questions": [
        { "id": "from-ai", "content": "Who?", "options": ["Tom", "Ann"], "answer": "Ann" },
        { "id": "from-ai", "content": "Where?", "options": ["home", "park"], "answer": 1 }
      ]
    }));
    let QuestionBody::ReadingComprehension { article, questions, .. } = &q.body else { panic!("reading expected") };
    assert_eq!(article, "");
    assert_ne!(questions[0].id, "from-ai");
    assert_ne!(questions[0].id, questions[1].id);
    assert_eq!(questions[0].answer, SubAnswer::Text("Ann".into()));
    assert_eq!(questions[1].answer, SubAnswer::Index(1));
    assert_eq!(questions[0].explanation, "");
  }

  #[test]
  fn missing_content_and_options_default_to_empty() {
    let m = one(json!({ "type": "multiple_choice", "content": "M", "answers": [0] }));
    assert!(matches!(&m.body, QuestionBody::MultipleChoice { options, answers, .. } if options.is_empty() && answers == &vec![0]));
    let s = one(json!({ "type": "single_choice", "answer": "x" }));
    assert!(matches!(&s.body, QuestionBody::SingleChoice { content, options, answer: 0 } if content.is_empty() && options.is_empty()));
    let f = one(json!({ "type": "fill_in_blank", "blanks": ["a"] }));
    assert_eq!(f.content(), "");
  }

  #[test]
  fn reading_and_cloze_without_questions_get_empty_lists() {
    let r = one(json!({ "type": "reading_comprehension", "content": "R", "article": "A" }));
    assert!(matches!(&r.body, QuestionBody::ReadingComprehension { questions, .. } if questions.is_empty()));
    let c = one(json!({ "type": "cloze", "content": "C" }));
    assert!(matches!(&c.body, QuestionBody::Cloze { questions, .. } if questions.is_empty()));
  }

  #[test]
  fn sloppy_reading_sub_question_is_filled_in() {
    let q = one(json!({
      "type": "reading_comprehension",
      "content": "Read",
      "questions": [{ "answer": null }, { "content": "Why?", "options": ["a", "b"] }]
    }));
    let QuestionBody::ReadingComprehension { questions, .. } = &q.body else { panic!("reading expected") };
    assert_eq!(questions[0].answer, SubAnswer::default());
    assert_eq!(questions[0].content, "");
    assert!(questions[0].options.is_empty());
    assert_eq!(questions[1].answer, SubAnswer::default());
  }

  #[test]
  fn incomplete_item_does_not_discard_its_neighbours() {
    let payload = json!({ "questions": [
      { "type": "short_answer", "content": "ok" },
      { "type": "multiple_choice", "content": "M", "answers": [0] },
      { "type": "cloze", "questions": [{ "answer": 1 }] }
    ]});
    let qs = normalize_response(&payload, now()).unwrap();
    assert_eq!(qs.len(), 3);
    assert_eq!(qs[0].content(), "ok");
  }

  #[test]
  fn unknown_sub_question_keys_pass_through() {
    let q = one(json!({
      "type": "cloze",
      "questions": [{ "options": ["x", "y"], "answer": 1, "hint": "verb" }]
    }));
    let QuestionBody::Cloze { questions, .. } = &q.body else { panic!("cloze expected") };
    assert_eq!(questions[0].extra.get("hint"), Some(&json!("verb")));
  }

  #[test]
  fn cloze_blanks_get_ids_and_default_answer() {
    let q = one(json!({ "type": "cloze", "questions": [{ "options": ["x", "y"] }] }));
    let QuestionBody::Cloze { questions, .. } = &q.body else { panic!("cloze expected") };
    assert!(!questions[0].id.is_empty());
    assert_eq!(questions[0].answer, 0);
  }

  #[test]
  fn unknown_fields_are_kept_under_extra() {
    let q = one(json!({ "type": "short_answer", "content": "S", "answer": "a", "difficulty": "hard" }));
    assert_eq!(q.extra.get("difficulty"), Some(&json!("hard")));
  }

  #[test]
  fn normalizing_a_normalized_question_only_changes_id_and_timestamps() {
    let first = one(json!({
      "type": "single_choice", "content": "Q", "options": ["a", "b", "c"], "answer": 2,
      "tags": ["t1"], "explanation": "why", "source": "book"
    }));
    let again = normalize_item(&serde_json::to_value(&first).unwrap(), Utc::now()).unwrap();
    assert_ne!(again.id, first.id);
    assert_eq!(again.body, first.body);
    assert_eq!(again.tags, first.tags);
    assert_eq!(again.explanation, first.explanation);
    assert_eq!(again.extra, first.extra);
  }

  #[test]
  fn missing_questions_list_is_a_shape_error() {
    assert!(matches!(normalize_response(&json!({ "items": [] }), now()), Err(ConvertError::DataShape)));
    assert!(matches!(normalize_response(&json!({ "questions": {} }), now()), Err(ConvertError::DataShape)));
  }

  #[test]
  fn one_bad_item_fails_the_whole_conversion() {
    let payload = json!({ "questions": [
      { "type": "short_answer", "content": "ok" },
      { "type": "essay", "content": "nope" }
    ]});
    let err = normalize_response(&payload, now()).unwrap_err();
    assert!(matches!(err, ConvertError::InvalidItem { index: 2, .. }));
  }
}
