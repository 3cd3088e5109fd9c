// src/services/normalizer/resources.rs

//! Resource collection normalization.

use serde_json::{Map, Value};

use super::NormalizeContext;
use super::raw::{RawCollection, extra_fields, identifier, text, timestamp};
use crate::models::{Resource, ResourceType};
use crate::utils::ids::generate_id;

const KNOWN_FIELDS: &[&str] = &[
    "id",
    "title",
    "type",
    "description",
    "url",
    "createdAt",
    "updatedAt",
    "moduleId",
    "courseId",
];

/// Normalize a stored resource collection into an ordered sequence.
///
/// Boolean placeholder entries carry no content and are dropped.
pub fn normalize_resource_collection(raw: Option<&Value>, ctx: &NormalizeContext) -> Vec<Resource> {
    RawCollection::classify(raw)
        .entries()
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Object(obj) => Some(complete_resource(key, obj, ctx)),
            Value::Bool(_) => {
                log::debug!("Dropping placeholder resource entry {:?}", key);
                None
            }
            _ => None,
        })
        .collect()
}

/// Fill the gaps of one stored resource; stored values win over defaults.
fn complete_resource(key: Option<&str>, obj: &Map<String, Value>, ctx: &NormalizeContext) -> Resource {
    let id = identifier(obj, "id")
        .or_else(|| key.map(str::to_string))
        .unwrap_or_else(|| generate_id("resource"));
    let kind = text(obj, "type")
        .and_then(|t| ResourceType::parse(&t))
        .unwrap_or_default();
    let created_at = timestamp(obj, "createdAt").unwrap_or_else(|| ctx.now.clone());
    let updated_at = timestamp(obj, "updatedAt").unwrap_or_else(|| created_at.clone());

    Resource {
        id,
        title: text(obj, "title").unwrap_or_else(|| "Ressource sans titre".to_string()),
        description: text(obj, "description")
            .unwrap_or_else(|| format!("Ressource de type {}", kind)),
        kind,
        url: text(obj, "url").unwrap_or_default(),
        created_at,
        updated_at,
        module_id: ctx.module_id.clone().or_else(|| text(obj, "moduleId")),
        course_id: ctx.course_id.clone().or_else(|| text(obj, "courseId")),
        extra: extra_fields(obj, KNOWN_FIELDS),
    }
}
