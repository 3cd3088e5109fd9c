// src/services/normalizer/mod.rs

//! Schema normalizer.
//!
//! Turns course, module, resource and evaluation records of any historical
//! shape into the canonical models. The functions here are pure and never
//! fail: missing or malformed fields degrade to defaults, and normalizing an
//! already-normalized record yields an equal record.
//!
//! Stored shapes handled:
//! - collections as arrays, as ID-keyed objects, or as `ID -> true` placeholders
//! - modules keyed by position (`"0"`, `"1"`) or by stable ID
//! - timestamps as ISO strings or epoch milliseconds

mod evaluations;
mod raw;
mod resources;

use serde_json::{Map, Value};

use crate::models::{Course, Module, ModuleIdMapping};
use crate::utils::ids::is_positional_id;
use crate::utils::now_timestamp;

pub use evaluations::{DEFAULT_SCORE, normalize_evaluation_collection, normalize_questions};
pub use raw::{RawCollection, ordered_entries};
pub use resources::normalize_resource_collection;

use raw::{extra_fields, identifier, index, text, timestamp};

const MODULE_FIELDS: &[&str] = &[
    "id",
    "courseId",
    "title",
    "description",
    "order",
    "status",
    "resources",
    "evaluations",
    "createdAt",
    "updatedAt",
];

const COURSE_FIELDS: &[&str] = &[
    "id",
    "title",
    "description",
    "specialiteId",
    "disciplineId",
    "instructorId",
    "modules",
    "moduleIdMapping",
    "archived",
    "archivedAt",
    "archivedBy",
    "archivedReason",
];

/// Back-references and clock used while normalizing.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    /// Attached to every resource/module when set
    pub course_id: Option<String>,
    /// Attached to every resource/evaluation when set
    pub module_id: Option<String>,
    /// Timestamp used for missing `createdAt`
    pub now: String,
}

impl NormalizeContext {
    pub fn new() -> Self {
        Self::at(now_timestamp())
    }

    /// Context with a fixed clock.
    pub fn at(now: impl Into<String>) -> Self {
        Self {
            course_id: None,
            module_id: None,
            now: now.into(),
        }
    }

    pub fn for_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    pub fn for_module(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }
}

impl Default for NormalizeContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Module entries of a stored `modules` field, in enumeration order.
///
/// Array entries are keyed by their index. Entries that are not objects
/// (holes, placeholders) are skipped.
pub fn enumerate_modules(raw: Option<&Value>) -> Vec<(String, &Map<String, Value>)> {
    match RawCollection::classify(raw) {
        RawCollection::Sequence(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.as_object().map(|obj| (i.to_string(), obj)))
            .collect(),
        RawCollection::Mapping(map) => ordered_entries(map)
            .into_iter()
            .filter_map(|(key, item)| item.as_object().map(|obj| (key.to_string(), obj)))
            .collect(),
        RawCollection::Absent | RawCollection::BooleanPlaceholder(_) => Vec::new(),
    }
}

/// Normalize one stored module.
///
/// `key` is where the module is stored; `position` is its enumeration index,
/// used when no `order` is stored. A stable key wins over the stored `id`
/// field, a positional key yields to a stable `id` field.
pub fn normalize_module(
    key: &str,
    obj: &Map<String, Value>,
    position: usize,
    ctx: &NormalizeContext,
) -> Module {
    let id = if is_positional_id(key) {
        identifier(obj, "id")
            .filter(|id| !is_positional_id(id))
            .unwrap_or_else(|| key.to_string())
    } else {
        key.to_string()
    };
    let course_id = ctx
        .course_id
        .clone()
        .or_else(|| text(obj, "courseId"))
        .unwrap_or_default();
    let order = index(obj, "order")
        .and_then(|o| u32::try_from(o).ok())
        .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX));
    let created_at = timestamp(obj, "createdAt").unwrap_or_else(|| ctx.now.clone());
    let updated_at = timestamp(obj, "updatedAt").unwrap_or_else(|| created_at.clone());

    let mut item_ctx = ctx.clone().for_module(id.clone());
    if !course_id.is_empty() {
        item_ctx.course_id = Some(course_id.clone());
    }

    Module {
        title: text(obj, "title").unwrap_or_else(|| "Module sans titre".to_string()),
        description: text(obj, "description").unwrap_or_default(),
        order,
        status: text(obj, "status").unwrap_or_else(|| "active".to_string()),
        resources: normalize_resource_collection(obj.get("resources"), &item_ctx),
        evaluations: normalize_evaluation_collection(obj.get("evaluations"), &item_ctx),
        created_at,
        updated_at,
        extra: extra_fields(obj, MODULE_FIELDS),
        id,
        course_id,
    }
}

/// Read a stored `moduleIdMapping`.
///
/// The store returns objects with dense numeric keys as arrays, so both
/// shapes are accepted.
pub fn normalize_id_mapping(raw: Option<&Value>) -> ModuleIdMapping {
    match RawCollection::classify(raw) {
        RawCollection::Sequence(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_str().map(|id| (i.to_string(), id.to_string())))
            .collect(),
        RawCollection::Mapping(map) => map
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|id| (k.clone(), id.to_string())))
            .collect(),
        RawCollection::Absent | RawCollection::BooleanPlaceholder(_) => ModuleIdMapping::new(),
    }
}

/// Normalize a stored course record, modules included.
///
/// Returns `None` when the stored value is not a record at all. Modules are
/// keyed by their normalized ID; they are not re-keyed or re-ordered here
/// (see the migrator for that).
pub fn normalize_course(course_id: &str, raw: &Value, ctx: &NormalizeContext) -> Option<Course> {
    let obj = raw.as_object()?;
    let ctx = ctx.clone().for_course(course_id);

    let mut modules = std::collections::BTreeMap::new();
    for (position, (key, module_obj)) in enumerate_modules(obj.get("modules")).into_iter().enumerate()
    {
        let module = normalize_module(&key, module_obj, position, &ctx);
        if modules.contains_key(&module.id) {
            log::warn!(
                "Course {}: duplicate module ID {} at key {}, keeping the first",
                course_id,
                module.id,
                key
            );
            continue;
        }
        modules.insert(module.id.clone(), module);
    }

    Some(Course {
        id: course_id.to_string(),
        title: text(obj, "title").unwrap_or_else(|| "Cours sans titre".to_string()),
        description: text(obj, "description").unwrap_or_default(),
        specialite_id: identifier(obj, "specialiteId"),
        discipline_id: identifier(obj, "disciplineId"),
        instructor_id: identifier(obj, "instructorId"),
        modules,
        module_id_mapping: normalize_id_mapping(obj.get("moduleIdMapping")),
        archived: obj.get("archived").and_then(Value::as_bool).unwrap_or(false),
        archived_at: timestamp(obj, "archivedAt"),
        archived_by: text(obj, "archivedBy"),
        archived_reason: text(obj, "archivedReason"),
        extra: extra_fields(obj, COURSE_FIELDS),
    })
}
