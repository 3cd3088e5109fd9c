//! Course module data structure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Evaluation, Resource};

/// A module of a course, with its resources and evaluations normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Stable `module_<ms>_<rand>` ID, or a positional digit string in un-migrated data
    pub id: String,

    pub course_id: String,

    pub title: String,

    pub description: String,

    /// Zero-based display position
    pub order: u32,

    pub status: String,

    #[serde(default)]
    pub resources: Vec<Resource>,

    /// Evaluations keyed by evaluation ID
    #[serde(default)]
    pub evaluations: BTreeMap<String, Evaluation>,

    pub created_at: String,

    pub updated_at: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Module {
    /// Evaluations as an ordered sequence (creation time, then ID).
    pub fn evaluations_in_order(&self) -> Vec<&Evaluation> {
        let mut evaluations: Vec<&Evaluation> = self.evaluations.values().collect();
        evaluations.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        evaluations
    }

    /// Short `id (title)` label used in diagnostics.
    pub fn label(&self) -> String {
        format!("{} ({})", self.id, self.title)
    }
}

/// Input for creating a module from an instructor form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDraft {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvaluationType;

    fn evaluation(id: &str, created_at: &str) -> Evaluation {
        Evaluation {
            id: id.to_string(),
            title: id.to_uppercase(),
            kind: EvaluationType::Quiz,
            description: String::new(),
            max_score: 100.0,
            score: None,
            questions: Vec::new(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
            date: None,
            module_id: Some("m1".to_string()),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_evaluations_in_creation_order() {
        let evaluations = [
            evaluation("e_b", "2024-01-02T00:00:00.000Z"),
            evaluation("e_a", "2024-01-03T00:00:00.000Z"),
            evaluation("e_c", "2024-01-02T00:00:00.000Z"),
        ];
        let module = Module {
            id: "m1".to_string(),
            course_id: "c1".to_string(),
            title: "Intro".to_string(),
            description: String::new(),
            order: 0,
            status: "active".to_string(),
            resources: Vec::new(),
            evaluations: evaluations
                .into_iter()
                .map(|e| (e.id.clone(), e))
                .collect(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
            extra: Map::new(),
        };

        let ids: Vec<&str> = module
            .evaluations_in_order()
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["e_b", "e_c", "e_a"]);
        assert_eq!(module.label(), "m1 (Intro)");
    }
}
