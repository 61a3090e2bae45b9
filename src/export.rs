//! Word export: questions → printable blocks → `.docx` bytes.
//!
//! `format_questions` is a read-only projection producing flat paragraphs; it
//! never fails. An answer index that points outside its options renders as an
//! empty string rather than an error. `render_docx` packs the blocks with docx-rs,
//! and `export_document` is the boundary entry point that checks the selection
//! and names the file.

use std::fmt::Display;
use std::io::Cursor;

use chrono::{DateTime, TimeZone};
use docx_rs::{AlignmentType, BreakType, Docx, Paragraph, Run};
use serde_json::Value;
use tracing::{info, instrument};

use crate::config::ExportLayout;
use crate::domain::{Question, QuestionBody, SubAnswer};
use crate::errors::ExportError;

/// Joins multi-part answers (multiple choice, fill-in-blank).
pub const ANSWER_SEPARATOR: &str = "、";
pub const ANSWER_PREFIX: &str = "答案：";
pub const EXPLANATION_PREFIX: &str = "解析：";
pub const FILE_EXTENSION: &str = "docx";
pub const CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

// Left indents in twips.
const LEVEL: i32 = 420;
pub const OPTION_INDENT: i32 = LEVEL;
pub const SUB_QUESTION_INDENT: i32 = LEVEL;
pub const SUB_OPTION_INDENT: i32 = 2 * LEVEL;
/// Cloze follow-up options sit shallower than reading sub-options.
pub const CLOZE_OPTION_INDENT: i32 = LEVEL + LEVEL / 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
  Header,
  Article,
  Body,
  Answer,
  Explanation,
  Spacer,
}

/// One paragraph of the exported document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
  pub kind: BlockKind,
  pub text: String,
  pub indent: i32,
}

impl Block {
  fn new(kind: BlockKind, text: impl Into<String>, indent: i32) -> Self {
    Self { kind, text: text.into(), indent }
  }
}

#[derive(Debug)]
pub struct ExportedDocument {
  pub filename: String,
  pub bytes: Vec<u8>,
}

fn letter(i: usize) -> char {
  u32::try_from(i)
    .ok()
    .and_then(|i| char::from_u32('A' as u32 + i))
    .unwrap_or('?')
}

fn option_at(options: &[String], index: usize) -> &str {
  options.get(index).map(String::as_str).unwrap_or("")
}

fn push_options(out: &mut Vec<Block>, options: &[String], indent: i32) {
  for (i, opt) in options.iter().enumerate() {
    out.push(Block::new(BlockKind::Body, format!("{}. {}", letter(i), opt), indent));
  }
}

/// Flatten questions into paragraphs. Numbering runs 1..=N over top-level questions.
pub fn format_questions(questions: &[Question]) -> Vec<Block> {
  let mut out = Vec::new();
  for (i, q) in questions.iter().enumerate() {
    if i > 0 {
      out.push(Block::new(BlockKind::Spacer, "", 0));
    }
    let header = format!("{}. {}", i + 1, q.content());
    out.push(Block::new(BlockKind::Header, header.trim_end(), 0));
    push_body(&mut out, &q.body);
    out.push(Block::new(BlockKind::Answer, format!("{}{}", ANSWER_PREFIX, answer_text(&q.body)), 0));
    if !q.explanation.is_empty() {
      out.push(Block::new(BlockKind::Explanation, format!("{}{}", EXPLANATION_PREFIX, q.explanation), 0));
    }
  }
  out
}

fn push_body(out: &mut Vec<Block>, body: &QuestionBody) {
  match body {
    QuestionBody::SingleChoice { options, .. } | QuestionBody::MultipleChoice { options, .. } => {
      push_options(out, options, OPTION_INDENT);
    }
    QuestionBody::FillInBlank { .. } | QuestionBody::ShortAnswer { .. } => {}
    QuestionBody::ReadingComprehension { article, questions, .. } => {
      out.push(Block::new(BlockKind::Article, article.as_str(), 0));
      for (k, sub) in questions.iter().enumerate() {
        out.push(Block::new(BlockKind::Body, format!("({}) {}", k + 1, sub.content), SUB_QUESTION_INDENT));
        push_options(out, &sub.options, SUB_OPTION_INDENT);
      }
    }
    QuestionBody::Cloze { questions, .. } => {
      for (k, blank) in questions.iter().enumerate() {
        let first = match blank.options.first() {
          Some(opt) => format!("({}) A. {}", k + 1, opt),
          None => format!("({})", k + 1),
        };
        out.push(Block::new(BlockKind::Body, first, SUB_QUESTION_INDENT));
        for (i, opt) in blank.options.iter().enumerate().skip(1) {
          out.push(Block::new(BlockKind::Body, format!("{}. {}", letter(i), opt), CLOZE_OPTION_INDENT));
        }
      }
    }
  }
}

/// Text of the answer line, without the prefix.
pub fn answer_text(body: &QuestionBody) -> String {
  match body {
    QuestionBody::SingleChoice { options, answer, .. } => option_at(options, *answer).to_string(),
    QuestionBody::MultipleChoice { options, answers, .. } => answers
      .iter()
      .map(|i| option_at(options, *i))
      .collect::<Vec<_>>()
      .join(ANSWER_SEPARATOR),
    QuestionBody::FillInBlank { blanks, .. } => blanks.join(ANSWER_SEPARATOR),
    QuestionBody::ShortAnswer { answer, .. } => answer.clone(),
    QuestionBody::ReadingComprehension { questions, .. } => questions
      .iter()
      .enumerate()
      .map(|(k, sub)| {
        let text = match &sub.answer {
          SubAnswer::Index(i) => option_at(&sub.options, *i),
          SubAnswer::Text(t) => t.as_str(),
        };
        format!("{}. {}", k + 1, text)
      })
      .collect::<Vec<_>>()
      .join("\n"),
    QuestionBody::Cloze { questions, .. } => questions
      .iter()
      .enumerate()
      .map(|(k, blank)| format!("{}. {}", k + 1, option_at(&blank.options, blank.answer)))
      .collect::<Vec<_>>()
      .join("\n"),
  }
}

/// Pack blocks into a WordprocessingML document.
pub fn render_docx(blocks: &[Block], layout: &ExportLayout) -> Result<Vec<u8>, ExportError> {
  let mut docx = Docx::new();

  if let Some(title) = layout.title.as_deref().filter(|t| !t.is_empty()) {
    let run = Run::new().add_text(title).bold().size(layout.font_size + 8);
    docx = docx.add_paragraph(Paragraph::new().add_run(run).align(AlignmentType::Center));
  }

  for block in blocks {
    let mut run = Run::new().size(layout.font_size);
    for (i, line) in block.text.split('\n').enumerate() {
      if i > 0 {
        run = run.add_break(BreakType::TextWrapping);
      }
      run = run.add_text(line);
    }
    if block.kind == BlockKind::Header {
      run = run.bold();
    }
    let mut p = Paragraph::new().add_run(run);
    if block.indent > 0 {
      p = p.indent(Some(block.indent), None, None, None);
    }
    docx = docx.add_paragraph(p);
  }

  let mut buf = Cursor::new(Vec::new());
  docx.build().pack(&mut buf).map_err(|e| ExportError::Pack(e.to_string()))?;
  Ok(buf.into_inner())
}

/// `Teacoo_<YYYYMMDD>_<HHMM>_Q<count>.docx`
pub fn export_filename<Tz: TimeZone>(now: &DateTime<Tz>, count: usize) -> String
where
  Tz::Offset: Display,
{
  format!("Teacoo_{}_Q{}.{}", now.format("%Y%m%d_%H%M"), count, FILE_EXTENSION)
}

/// Boundary check: the payload must carry a non-empty `questions` array of valid questions.
pub fn parse_selection(payload: &Value) -> Result<Vec<Question>, ExportError> {
  let items = payload
    .get("questions")
    .and_then(Value::as_array)
    .ok_or_else(|| ExportError::InvalidSelection("`questions` must be an array".into()))?;
  if items.is_empty() {
    return Err(ExportError::EmptySelection);
  }
  items
    .iter()
    .enumerate()
    .map(|(i, item)| {
      serde_json::from_value::<Question>(item.clone())
        .map_err(|e| ExportError::InvalidQuestion { position: i + 1, detail: e.to_string() })
    })
    .collect()
}

#[instrument(level = "info", skip(questions, now, layout), fields(count = questions.len()))]
pub fn export_document<Tz: TimeZone>(
  questions: &[Question],
  now: &DateTime<Tz>,
  layout: &ExportLayout,
) -> Result<ExportedDocument, ExportError>
where
  Tz::Offset: Display,
{
  if questions.is_empty() {
    return Err(ExportError::EmptySelection);
  }
  let blocks = format_questions(questions);
  let bytes = render_docx(&blocks, layout)?;
  let filename = export_filename(now, questions.len());
  info!(target: "export", %filename, blocks = blocks.len(), size = bytes.len(), "Document exported");
  Ok(ExportedDocument { filename, bytes })
}
