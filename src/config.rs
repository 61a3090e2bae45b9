//! Loading service configuration (AI prompts + export layout) from TOML.
//!
//! See `AppConfig`, `Prompts` and `ExportLayout` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub export: ExportLayout,
  /// Load the built-in sample questions into the bank at startup.
  #[serde(default = "default_seed_bank")]
  pub seed_bank: bool,
}

fn default_seed_bank() -> bool { true }

impl Default for AppConfig {
  fn default() -> Self {
    Self { prompts: Prompts::default(), export: ExportLayout::default(), seed_bank: true }
  }
}

/// Prompts used by the AI-convert flow. Callers may override system prompt and
/// example per request; these are the fallbacks.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub convert_system: String,
  pub convert_example: String,
  /// Placeholders: `{text}`, `{example}`.
  pub convert_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      convert_system: "You turn teaching material into structured quiz questions. Respond ONLY with strict JSON of the form {\"questions\": [...]}. Each question has a `type` of single_choice, multiple_choice, fill_in_blank, short_answer, reading_comprehension or cloze.".into(),
      convert_example: r#"{"questions":[{"type":"single_choice","content":"1 + 1 = ?","options":["1","2","3","4"],"answer":"2","explanation":"Basic addition.","tags":["math"]}]}"#.into(),
      convert_user_template: "Example output:\n{example}\n\nConvert the following text into questions:\n{text}".into(),
    }
  }
}

/// Word export layout.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExportLayout {
  /// Body font size in half-points (24 = 12pt).
  pub font_size: usize,
  /// Optional centered title on the first page.
  pub title: Option<String>,
}

impl Default for ExportLayout {
  fn default() -> Self {
    Self { font_size: 24, title: None }
  }
}

/// Attempt to load `AppConfig` from TEACOO_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("TEACOO_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "teacoo", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "teacoo", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "teacoo", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}
