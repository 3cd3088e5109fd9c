// src/services/normalizer/evaluations.rs

//! Evaluation collection normalization.
//!
//! Unlike resources, a boolean entry under a known evaluation ID is rebuilt
//! into a stub record: consumers expect one entry per referenced evaluation.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::NormalizeContext;
use super::raw::{
    RawCollection, extra_fields, identifier, index, number, ordered_entries, text, timestamp,
};
use crate::models::{Evaluation, EvaluationType, QUESTION_OPTION_COUNT, Question};
use crate::utils::ids::{generate_id, is_positional_id, positional_index};

/// Score given to evaluations without one, and to rebuilt stubs.
pub const DEFAULT_SCORE: f64 = 100.0;

const KNOWN_FIELDS: &[&str] = &[
    "id",
    "title",
    "type",
    "description",
    "maxScore",
    "score",
    "questions",
    "createdAt",
    "updatedAt",
    "date",
    "moduleId",
];

/// Numeric option keys beyond this are treated as labels, not positions.
const MAX_OPTION_SLOTS: usize = 64;

const QUESTION_FIELDS: &[&str] = &["id", "question", "options", "correctAnswer", "explanation"];

/// Normalize a stored evaluation collection into a mapping keyed by evaluation ID.
pub fn normalize_evaluation_collection(
    raw: Option<&Value>,
    ctx: &NormalizeContext,
) -> BTreeMap<String, Evaluation> {
    let mut evaluations = BTreeMap::new();
    for (key, value) in RawCollection::classify(raw).entries() {
        let evaluation = match (key, value) {
            (_, Value::Object(obj)) => complete_evaluation(key, obj, ctx),
            (Some(key), Value::Bool(_)) => {
                log::debug!("Rebuilding placeholder evaluation {}", key);
                let mut stub = complete_evaluation(Some(key), &Map::new(), ctx);
                stub.score = Some(DEFAULT_SCORE);
                stub
            }
            _ => continue,
        };
        evaluations.insert(evaluation.id.clone(), evaluation);
    }
    evaluations
}

fn complete_evaluation(
    key: Option<&str>,
    obj: &Map<String, Value>,
    ctx: &NormalizeContext,
) -> Evaluation {
    let id = identifier(obj, "id")
        .or_else(|| key.map(str::to_string))
        .unwrap_or_else(|| generate_id("evaluation"));
    let kind = text(obj, "type")
        .and_then(|t| EvaluationType::parse(&t))
        .unwrap_or_default();
    let created_at = timestamp(obj, "createdAt").unwrap_or_else(|| ctx.now.clone());
    let updated_at = timestamp(obj, "updatedAt").unwrap_or_else(|| created_at.clone());

    Evaluation {
        id,
        title: text(obj, "title").unwrap_or_else(|| "Évaluation sans titre".to_string()),
        description: text(obj, "description")
            .unwrap_or_else(|| format!("Évaluation de type {}", kind)),
        kind,
        max_score: number(obj, "maxScore").unwrap_or(DEFAULT_SCORE),
        score: number(obj, "score"),
        questions: normalize_questions(obj.get("questions")),
        created_at,
        updated_at,
        date: timestamp(obj, "date"),
        module_id: ctx.module_id.clone().or_else(|| text(obj, "moduleId")),
        extra: extra_fields(obj, KNOWN_FIELDS),
    }
}

/// Questions as an ordered sequence; non-object entries are dropped.
pub fn normalize_questions(raw: Option<&Value>) -> Vec<Question> {
    RawCollection::classify(raw)
        .entries()
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Object(obj) => Some(complete_question(key, obj)),
            _ => None,
        })
        .collect()
}

fn complete_question(key: Option<&str>, obj: &Map<String, Value>) -> Question {
    // Numeric keys are array positions, not identities
    let id = identifier(obj, "id")
        .or_else(|| key.filter(|k| !is_positional_id(k)).map(str::to_string))
        .unwrap_or_else(|| generate_id("question"));

    let options = collect_options(obj.get("options"));
    let correct_answer = index(obj, "correctAnswer")
        .and_then(|i| usize::try_from(i).ok())
        .filter(|i| *i < options.len())
        .unwrap_or(0);

    Question {
        id,
        question: text(obj, "question").unwrap_or_default(),
        options,
        correct_answer,
        explanation: text(obj, "explanation"),
        extra: extra_fields(obj, QUESTION_FIELDS),
    }
}

/// Options keep their stored positions, since `correctAnswer` indexes them.
///
/// Holes become empty options; the list is padded to four entries.
fn collect_options(raw: Option<&Value>) -> Vec<String> {
    let mut options: Vec<String> = match RawCollection::classify(raw) {
        RawCollection::Sequence(items) => items.iter().map(option_text).collect(),
        RawCollection::Mapping(map) => {
            let mut slots: Vec<String> = Vec::new();
            let mut unkeyed: Vec<String> = Vec::new();
            for (key, value) in ordered_entries(map) {
                match positional_index(key).filter(|i| *i < MAX_OPTION_SLOTS) {
                    Some(i) => {
                        if slots.len() <= i {
                            slots.resize(i + 1, String::new());
                        }
                        slots[i] = option_text(value);
                    }
                    None => unkeyed.push(option_text(value)),
                }
            }
            slots.extend(unkeyed);
            slots
        }
        RawCollection::Absent | RawCollection::BooleanPlaceholder(_) => Vec::new(),
    };
    if options.len() < QUESTION_OPTION_COUNT {
        options.resize(QUESTION_OPTION_COUNT, String::new());
    }
    options
}

fn option_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
