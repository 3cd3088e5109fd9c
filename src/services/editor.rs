// src/services/editor.rs

//! Guarded course edits.
//!
//! Both operations check the actor against the course's instructor before
//! touching the store, and surface `Permission`/`Validation` errors to the
//! caller instead of logging them.

use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{Actor, Course, Module, ModuleDraft};
use crate::services::normalizer::{NormalizeContext, normalize_course, normalize_module};
use crate::storage::{DualWriteStore, Namespace, paths};
use crate::utils::ids::generate_id;
use crate::utils::now_timestamp;

/// Mutating course operations on behalf of an actor.
#[derive(Clone)]
pub struct CourseEditor {
    store: DualWriteStore,
}

impl CourseEditor {
    pub fn new(store: DualWriteStore) -> Self {
        Self { store }
    }

    /// Append a new module at the end of a course.
    ///
    /// The module gets a stable ID and an `order` past every stored one, so it
    /// sorts last even when stored orders have gaps. The course's
    /// `moduleIdMapping` is extended with `N -> id`, N being that sorted position.
    pub async fn add_module(
        &self,
        actor: &Actor,
        course_id: &str,
        draft: &ModuleDraft,
    ) -> Result<Module> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("module title must not be empty"));
        }

        let (namespace, raw, course) = self.load(course_id).await?;
        self.authorize(actor, &course)?;
        if course.archived {
            return Err(AppError::validation(format!(
                "course {} is archived",
                course_id
            )));
        }

        let id = generate_id("module");
        let position = course.module_count();
        let order = course
            .modules
            .values()
            .map(|m| m.order.saturating_add(1))
            .max()
            .unwrap_or(0);
        let now = now_timestamp();

        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::String(title.to_string()));
        fields.insert(
            "description".to_string(),
            Value::String(draft.description.trim().to_string()),
        );
        if let Some(status) = draft.status.as_deref().filter(|s| !s.trim().is_empty()) {
            fields.insert("status".to_string(), Value::String(status.trim().to_string()));
        }
        fields.insert("order".to_string(), Value::from(order));
        fields.insert("createdAt".to_string(), Value::String(now.clone()));

        let ctx = NormalizeContext::at(now.clone()).for_course(course_id);
        let module = normalize_module(&id, &fields, position, &ctx);

        if namespace == Namespace::Legacy {
            log::info!("Promoting legacy course {} before adding a module", course_id);
            self.store.set(&paths::course(course_id), &raw).await?;
        }

        let mut update = Map::new();
        update.insert(format!("modules/{}", id), serde_json::to_value(&module)?);
        update.insert(
            format!("moduleIdMapping/{}", position),
            Value::String(id.clone()),
        );
        update.insert("updatedAt".to_string(), Value::String(now));
        self.store.update(&paths::course(course_id), &update).await?;

        log::info!(
            "{} added module {} to course {} at position {} (order {})",
            actor.user_id,
            id,
            course_id,
            position,
            order
        );
        Ok(module)
    }

    /// Soft-delete a course. Archiving an archived course is a no-op.
    pub async fn archive_course(
        &self,
        actor: &Actor,
        course_id: &str,
        reason: Option<&str>,
    ) -> Result<Course> {
        let (namespace, raw, mut course) = self.load(course_id).await?;
        self.authorize(actor, &course)?;

        if course.archived {
            log::debug!("Course {} already archived", course_id);
            return Ok(course);
        }

        let now = now_timestamp();
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());

        let mut fields = Map::new();
        fields.insert("archived".to_string(), Value::Bool(true));
        fields.insert("archivedAt".to_string(), Value::String(now.clone()));
        fields.insert(
            "archivedBy".to_string(),
            Value::String(actor.user_id.clone()),
        );
        if let Some(reason) = reason {
            fields.insert("archivedReason".to_string(), Value::String(reason.to_string()));
        }

        let course_path = paths::course(course_id);
        match namespace {
            Namespace::Primary => self.store.update(&course_path, &fields).await?,
            Namespace::Legacy => {
                let mut record = raw.as_object().cloned().unwrap_or_default();
                record.extend(fields);
                self.store.set(&course_path, &Value::Object(record)).await?
            }
        }

        log::info!("{} archived course {}", actor.user_id, course_id);
        course.archived = true;
        course.archived_at = Some(now);
        course.archived_by = Some(actor.user_id.clone());
        course.archived_reason = reason.map(str::to_string);
        Ok(course)
    }

    async fn load(&self, course_id: &str) -> Result<(Namespace, Value, Course)> {
        let (namespace, raw) = self
            .store
            .read_first(&paths::course(course_id))
            .await?
            .ok_or_else(|| AppError::not_found("course", course_id))?;
        let course = normalize_course(course_id, &raw, &NormalizeContext::new())
            .ok_or_else(|| AppError::not_found("course", course_id))?;
        Ok((namespace, raw, course))
    }

    fn authorize(&self, actor: &Actor, course: &Course) -> Result<()> {
        if actor.can_edit(course.instructor_id.as_deref()) {
            Ok(())
        } else {
            Err(AppError::permission(format!(
                "{} may not modify course {}",
                actor.user_id, course.id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NamespaceConfig, Role};
    use crate::storage::{MemoryStore, TreeStore};
    use serde_json::json;
    use std::sync::Arc;

    fn editor(tree: Value) -> (Arc<MemoryStore>, CourseEditor) {
        let memory = Arc::new(MemoryStore::from_value(tree));
        let store = DualWriteStore::new(memory.clone(), &NamespaceConfig::default());
        (memory, CourseEditor::new(store))
    }

    fn course_tree() -> Value {
        json!({"elearning": {"courses": {"c1": {
            "title": "Rust",
            "instructorId": "prof_1",
            "modules": {"module_1_a": {"title": "Intro", "order": 0}},
            "moduleIdMapping": {"0": "module_1_a"}
        }}}})
    }

    fn draft(title: &str) -> ModuleDraft {
        ModuleDraft {
            title: title.to_string(),
            ..ModuleDraft::default()
        }
    }

    #[tokio::test]
    async fn test_add_module_appends_and_extends_mapping() {
        let (memory, editor) = editor(course_tree());
        let owner = Actor::new("prof_1", Role::Instructor);

        let module = editor
            .add_module(&owner, "c1", &draft("  Ownership "))
            .await
            .unwrap();
        assert!(module.id.starts_with("module_"));
        assert_eq!(module.title, "Ownership");
        assert_eq!(module.order, 1);
        assert_eq!(module.status, "active");

        for namespace in ["elearning", "Elearning"] {
            let mapped = memory
                .get(&format!("{}/courses/c1/moduleIdMapping/1", namespace))
                .await
                .unwrap();
            assert_eq!(mapped, Some(json!(module.id)));
        }
        let stored = memory
            .get(&format!("elearning/courses/c1/modules/{}", module.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["order"], 1);
        assert_eq!(
            memory.get("elearning/courses/c1/moduleIdMapping/0").await.unwrap(),
            Some(json!("module_1_a"))
        );
    }

    #[tokio::test]
    async fn test_add_module_after_sparse_orders_sorts_last() {
        let (memory, editor) = editor(json!({"elearning": {"courses": {"c1": {
            "modules": {
                "module_1_a": {"title": "A", "order": 0},
                "module_1_b": {"title": "B", "order": 5}
            }
        }}}}));

        let module = editor
            .add_module(&Actor::system(), "c1", &draft("C"))
            .await
            .unwrap();
        assert_eq!(module.order, 6);

        let mapped = memory
            .get("elearning/courses/c1/moduleIdMapping/2")
            .await
            .unwrap();
        assert_eq!(mapped, Some(json!(module.id)));

        let raw = memory.get("elearning/courses/c1").await.unwrap().unwrap();
        let course = normalize_course("c1", &raw, &NormalizeContext::new()).unwrap();
        let last = course.modules_in_order()[2].id.clone();
        assert_eq!(last, module.id);
        assert_eq!(course.module_id_mapping["2"], last);
    }

    #[tokio::test]
    async fn test_add_module_rejects_empty_title() {
        let (_, editor) = editor(course_tree());
        let err = editor
            .add_module(&Actor::system(), "c1", &draft("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_module_rejects_other_instructor() {
        let (memory, editor) = editor(course_tree());
        let before = memory.snapshot().await;

        let err = editor
            .add_module(&Actor::new("someone", Role::Instructor), "c1", &draft("X"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));
        assert_eq!(memory.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_add_module_unknown_course() {
        let (_, editor) = editor(json!({}));
        let err = editor
            .add_module(&Actor::system(), "nope", &draft("X"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_archive_course_is_soft_and_idempotent() {
        let (memory, editor) = editor(course_tree());
        let admin = Actor::new("root", Role::Admin);

        let archived = editor
            .archive_course(&admin, "c1", Some("obsolete"))
            .await
            .unwrap();
        assert!(archived.archived);
        assert_eq!(archived.archived_by.as_deref(), Some("root"));

        let stored = memory.get("elearning/courses/c1").await.unwrap().unwrap();
        assert_eq!(stored["archived"], true);
        assert_eq!(stored["archivedReason"], "obsolete");
        assert_eq!(stored["title"], "Rust");
        assert!(stored["modules"]["module_1_a"].is_object());

        let first_stamp = stored["archivedAt"].clone();
        editor.archive_course(&admin, "c1", None).await.unwrap();
        let again = memory.get("elearning/courses/c1").await.unwrap().unwrap();
        assert_eq!(again["archivedAt"], first_stamp);
    }

    #[tokio::test]
    async fn test_student_cannot_archive() {
        let (_, editor) = editor(course_tree());
        let err = editor
            .archive_course(&Actor::new("prof_1", Role::Student), "c1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));
    }
}
