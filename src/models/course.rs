//! Course data structure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Module;

/// Numeric position string -> stable module ID, one table per migrated course.
pub type ModuleIdMapping = BTreeMap<String, String>;

/// A course with its modules keyed by module ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,

    pub title: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialite_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discipline_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<String>,

    #[serde(default)]
    pub modules: BTreeMap<String, Module>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub module_id_mapping: ModuleIdMapping,

    #[serde(default)]
    pub archived: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_reason: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Course {
    /// Modules sorted by `order`, ties broken by ID.
    pub fn modules_in_order(&self) -> Vec<&Module> {
        let mut modules: Vec<&Module> = self.modules.values().collect();
        modules.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        modules
    }

    /// Number of modules in the course.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}
