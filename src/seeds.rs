//! Built-in sample questions: one per question type, so a fresh bank has
//! something to browse, export and publish without any external service.

use chrono::{DateTime, Utc};

use crate::domain::{ClozeBlank, Question, QuestionBody, ReadingSubQuestion, SubAnswer};

fn strings(xs: &[&str]) -> Vec<String> {
  xs.iter().map(|s| s.to_string()).collect()
}

pub fn seed_questions(now: DateTime<Utc>) -> Vec<Question> {
  vec![
    Question::new(
      QuestionBody::SingleChoice {
        content: "“今天天气很好”的英文是？".into(),
        options: strings(&["The weather is great today.", "I want to drink coffee.", "He is a teacher."]),
        answer: 0,
      },
      now,
    )
    .with_tags(["sample", "translation"]),
    Question::new(
      QuestionBody::MultipleChoice {
        content: "Which of these are prime numbers?".into(),
        options: strings(&["2", "4", "7", "9"]),
        answers: vec![0, 2],
      },
      now,
    )
    .with_tags(["sample", "math"])
    .with_explanation("4 = 2×2 and 9 = 3×3."),
    Question::new(
      QuestionBody::FillInBlank {
        content: "Water boils at ___ degrees Celsius and freezes at ___.".into(),
        blanks: strings(&["100", "0"]),
      },
      now,
    )
    .with_tags(["sample", "science"]),
    Question::new(
      QuestionBody::ShortAnswer {
        content: "Describe your favourite season in one sentence.".into(),
        answer: "Any complete sentence naming a season.".into(),
      },
      now,
    )
    .with_tags(["sample", "writing"]),
    Question::new(
      QuestionBody::ReadingComprehension {
        content: "Read the passage and answer the questions.".into(),
        article: "Lin gets up at seven. She takes the bus to school and has lunch with her friend Mei.".into(),
        questions: vec![
          ReadingSubQuestion::new("When does Lin get up?", strings(&["At six", "At seven", "At eight"]), SubAnswer::Index(1)),
          ReadingSubQuestion::new("How does Lin go to school?", strings(&["By bike", "On foot", "By bus"]), SubAnswer::Index(2)),
        ],
      },
      now,
    )
    .with_tags(["sample", "reading"]),
    Question::new(
      QuestionBody::Cloze {
        content: "I ___(1) a student. I ___(2) English every day.".into(),
        questions: vec![
          ClozeBlank::new(strings(&["am", "is", "are"]), 0),
          ClozeBlank::new(strings(&["study", "studies", "studying"]), 0),
        ],
      },
      now,
    )
    .with_tags(["sample", "grammar"]),
  ]
}
