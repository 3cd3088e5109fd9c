//! Evaluation and quiz question structures.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of answer options a quiz question carries.
pub const QUESTION_OPTION_COUNT: usize = 4;

/// Kind of evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationType {
    #[default]
    Quiz,
    Assignment,
}

impl EvaluationType {
    /// Parse a stored type string, `None` for anything unknown.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "quiz" => Some(Self::Quiz),
            "assignment" => Some(Self::Assignment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Assignment => "assignment",
        }
    }
}

impl fmt::Display for EvaluationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,

    /// Question text
    pub question: String,

    /// Answer options, always `QUESTION_OPTION_COUNT` long after normalization
    pub options: Vec<String>,

    /// Zero-based index into `options`
    pub correct_answer: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A quiz or assignment attached to a module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: String,

    pub title: String,

    #[serde(rename = "type")]
    pub kind: EvaluationType,

    pub description: String,

    pub max_score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default)]
    pub questions: Vec<Question>,

    pub created_at: String,

    pub updated_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
