// src/services/migrator.rs

//! Positional module ID migration.
//!
//! Legacy courses store modules as an array, or as an object keyed by
//! position (`"0"`, `"1"`). Migration re-keys every such module under a
//! stable `module_<ms>_<rand>` ID, rewrites `order` as a dense 0..N-1
//! sequence, normalizes nested resources/evaluations, and persists a
//! `moduleIdMapping` (position -> stable ID) so old positional links resolve.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{Actor, Course, Module, ModuleIdMapping};
use crate::services::normalizer::{
    NormalizeContext, RawCollection, enumerate_modules, normalize_course, normalize_id_mapping,
    normalize_module,
};
use crate::storage::{DualWriteStore, Namespace, paths, tree};
use crate::utils::ids::{generate_id, is_positional_id};

/// Outcome of migrating one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub course_id: String,
    /// Modules that moved to a new key
    pub fixed_module_count: usize,
    pub module_count: usize,
    /// Whether anything was persisted
    pub written: bool,
}

/// Canonical form of a course and whether the store differs from it.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Course with modules keyed by stable IDs and the derived mapping
    pub course: Course,
    pub fixed_module_count: usize,
    pub needs_write: bool,
}

/// Compute the migrated form of a stored course record.
///
/// Returns `None` when `raw` is not a course record.
pub fn plan_migration(course_id: &str, raw: &Value, ctx: &NormalizeContext) -> Option<MigrationPlan> {
    let obj = raw.as_object()?;
    let mut course = normalize_course(course_id, raw, ctx)?;
    let ctx = ctx.clone().for_course(course_id);

    let raw_modules = obj.get("modules");
    let entries = enumerate_modules(raw_modules);
    let positional = matches!(
        RawCollection::classify(raw_modules),
        RawCollection::Sequence(_)
    ) || entries.iter().any(|(key, _)| is_positional_id(key));

    let mut normalized: Vec<(String, Module)> = entries
        .iter()
        .enumerate()
        .map(|(position, (key, module_obj))| {
            (key.clone(), normalize_module(key, module_obj, position, &ctx))
        })
        .collect();

    // Positional data: enumeration order is authoritative and stored `order`
    // may be stale. Stable keys: keep the instructor's order, just densify.
    if !positional {
        normalized.sort_by(|(ka, a), (kb, b)| a.order.cmp(&b.order).then_with(|| ka.cmp(kb)));
    }

    let mut modules: BTreeMap<String, Module> = BTreeMap::new();
    let mut fixed_module_count = 0;
    for (position, (key, mut module)) in normalized.into_iter().enumerate() {
        if is_positional_id(&module.id) || modules.contains_key(&module.id) {
            rebind(&mut module, generate_id("module"));
        }
        if module.id != key {
            fixed_module_count += 1;
        }
        module.order = u32::try_from(position).unwrap_or(u32::MAX);
        modules.insert(module.id.clone(), module);
    }

    let mapping = id_mapping(&modules);
    let stored_modules = raw_modules.cloned().unwrap_or(Value::Null);
    let needs_write = match serde_json::to_value(&modules) {
        Ok(planned) => !tree::same_tree(&planned, &stored_modules),
        Err(_) => true,
    } || mapping != normalize_id_mapping(obj.get("moduleIdMapping"));

    course.modules = modules;
    course.module_id_mapping = mapping;

    Some(MigrationPlan {
        course,
        fixed_module_count,
        needs_write,
    })
}

/// Position -> stable ID, from modules sorted by `order`.
pub fn id_mapping(modules: &BTreeMap<String, Module>) -> ModuleIdMapping {
    let mut ordered: Vec<&Module> = modules.values().collect();
    ordered.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, module)| (i.to_string(), module.id.clone()))
        .collect()
}

/// Give a module a new ID and update the back-references of its children.
fn rebind(module: &mut Module, id: String) {
    for resource in &mut module.resources {
        resource.module_id = Some(id.clone());
    }
    for evaluation in module.evaluations.values_mut() {
        evaluation.module_id = Some(id.clone());
    }
    module.id = id;
}

/// Migrates courses in the store on behalf of an actor.
#[derive(Clone)]
pub struct ModuleMigrator {
    store: DualWriteStore,
    actor: Actor,
    dry_run: bool,
}

impl ModuleMigrator {
    pub fn new(store: DualWriteStore, actor: Actor) -> Self {
        Self {
            store,
            actor,
            dry_run: false,
        }
    }

    /// Compute plans without writing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn store(&self) -> &DualWriteStore {
        &self.store
    }

    /// Migrate the module IDs of one course and persist the result.
    ///
    /// Nothing is written when the stored course is already canonical.
    pub async fn migrate_module_ids(&self, course_id: &str) -> Result<MigrationResult> {
        let course_path = paths::course(course_id);
        let (namespace, raw) = self
            .store
            .read_first(&course_path)
            .await?
            .ok_or_else(|| AppError::not_found("course", course_id))?;

        let plan = plan_migration(course_id, &raw, &NormalizeContext::new()).ok_or_else(|| {
            AppError::not_found("course", format!("{} is not a course record", course_id))
        })?;

        let mut result = MigrationResult {
            course_id: course_id.to_string(),
            fixed_module_count: plan.fixed_module_count,
            module_count: plan.course.module_count(),
            written: false,
        };

        if !plan.needs_write {
            log::debug!("Course {} already canonical", course_id);
            return Ok(result);
        }

        if !self.actor.can_edit(plan.course.instructor_id.as_deref()) {
            return Err(AppError::permission(format!(
                "{} may not modify course {}",
                self.actor.user_id, course_id
            )));
        }

        if self.dry_run {
            log::info!(
                "[dry-run] Course {}: would re-key {} of {} modules",
                course_id,
                result.fixed_module_count,
                result.module_count
            );
            return Ok(result);
        }

        let mut fields = Map::new();
        fields.insert(
            "modules".to_string(),
            serde_json::to_value(&plan.course.modules)?,
        );
        fields.insert(
            "moduleIdMapping".to_string(),
            serde_json::to_value(&plan.course.module_id_mapping)?,
        );
        fields.insert(
            "updatedAt".to_string(),
            Value::String(crate::utils::now_timestamp()),
        );

        match namespace {
            Namespace::Primary => self.store.update(&course_path, &fields).await?,
            // Promote a legacy-only course as a whole record
            Namespace::Legacy => {
                let mut record = raw.as_object().cloned().unwrap_or_default();
                record.extend(fields);
                self.store.set(&course_path, &Value::Object(record)).await?
            }
        }

        log::info!(
            "Course {}: re-keyed {} of {} modules ({} namespace)",
            course_id,
            result.fixed_module_count,
            result.module_count,
            namespace
        );
        result.written = true;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NamespaceConfig, Role};
    use crate::storage::{MemoryStore, TreeStore};
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> NormalizeContext {
        NormalizeContext::at("2024-05-01T00:00:00.000Z")
    }

    fn migrator(tree: Value, actor: Actor) -> (Arc<MemoryStore>, ModuleMigrator) {
        let memory = Arc::new(MemoryStore::from_value(tree));
        let store = DualWriteStore::new(memory.clone(), &NamespaceConfig::default());
        (memory, ModuleMigrator::new(store, actor))
    }

    fn assert_dense_orders(course: &Course) {
        let mut orders: Vec<u32> = course.modules.values().map(|m| m.order).collect();
        orders.sort_unstable();
        let expected: Vec<u32> = (0..course.modules.len() as u32).collect();
        assert_eq!(orders, expected);
    }

    #[test]
    fn test_positional_object_is_rekeyed_with_mapping() {
        let raw = json!({"modules": {"0": {"title": "M1"}, "1": {"title": "M2"}}});
        let plan = plan_migration("c1", &raw, &ctx()).unwrap();

        assert_eq!(plan.fixed_module_count, 2);
        assert!(plan.needs_write);
        assert_eq!(plan.course.modules.len(), 2);
        for (key, module) in &plan.course.modules {
            assert!(!is_positional_id(key));
            assert!(key.starts_with("module_"));
            assert_eq!(&module.id, key);
        }

        let m1 = plan.course.modules.values().find(|m| m.title == "M1").unwrap();
        let m2 = plan.course.modules.values().find(|m| m.title == "M2").unwrap();
        assert_eq!(plan.course.module_id_mapping["0"], m1.id);
        assert_eq!(plan.course.module_id_mapping["1"], m2.id);
    }

    #[test]
    fn test_array_orders_come_from_position_not_stored_order() {
        let raw = json!({"modules": [
            {"title": "A", "order": 5},
            null,
            {"title": "B", "order": 5},
            {"title": "C", "order": 0}
        ]});
        let plan = plan_migration("c1", &raw, &ctx()).unwrap();

        assert_dense_orders(&plan.course);
        let ordered: Vec<&str> = plan
            .course
            .modules_in_order()
            .iter()
            .map(|m| m.title.as_str())
            .collect();
        assert_eq!(ordered, vec!["A", "B", "C"]);
        for module in plan.course.modules.values() {
            assert_eq!(
                plan.course.module_id_mapping[&module.order.to_string()],
                module.id
            );
        }
    }

    #[test]
    fn test_stable_id_field_is_reused_and_children_follow() {
        let raw = json!({"modules": [
            {"id": "module_1_keep", "title": "A", "resources": [{"title": "R"}]},
            {"id": "module_1_keep", "title": "Dup"}
        ]});
        let plan = plan_migration("c1", &raw, &ctx()).unwrap();

        assert!(plan.course.modules.contains_key("module_1_keep"));
        let dup = plan.course.modules.values().find(|m| m.title == "Dup").unwrap();
        assert_ne!(dup.id, "module_1_keep");
        assert!(dup.id.starts_with("module_"));

        let kept = &plan.course.modules["module_1_keep"];
        assert_eq!(kept.resources[0].module_id.as_deref(), Some("module_1_keep"));
    }

    #[test]
    fn test_stable_keys_keep_instructor_order() {
        let raw = json!({"modules": {
            "module_a": {"title": "Third", "order": 7},
            "module_b": {"title": "First", "order": 1},
            "module_c": {"title": "Second", "order": 3}
        }});
        let plan = plan_migration("c1", &raw, &ctx()).unwrap();

        assert_eq!(plan.fixed_module_count, 0);
        assert_eq!(plan.course.modules["module_b"].order, 0);
        assert_eq!(plan.course.modules["module_c"].order, 1);
        assert_eq!(plan.course.modules["module_a"].order, 2);
    }

    #[test]
    fn test_plan_of_written_course_needs_no_write() {
        let raw = json!({"title": "C", "modules": {"0": {"title": "M1"}, "1": {"title": "M2"}}});
        let plan = plan_migration("c1", &raw, &ctx()).unwrap();

        let mut stored = raw.as_object().unwrap().clone();
        stored.insert(
            "modules".to_string(),
            serde_json::to_value(&plan.course.modules).unwrap(),
        );
        stored.insert(
            "moduleIdMapping".to_string(),
            serde_json::to_value(&plan.course.module_id_mapping).unwrap(),
        );
        let stored = tree::prune(Value::Object(stored));

        let again = plan_migration("c1", &stored, &ctx()).unwrap();
        assert!(!again.needs_write);
        assert_eq!(again.fixed_module_count, 0);
        assert_eq!(again.course.modules, plan.course.modules);
    }

    #[tokio::test]
    async fn test_migrate_persists_to_both_namespaces() {
        let (memory, migrator) = migrator(
            json!({"elearning": {"courses": {"c1": {
                "title": "Rust",
                "modules": {"0": {"title": "M1"}, "1": {"title": "M2"}}
            }}}}),
            Actor::system(),
        );

        let result = migrator.migrate_module_ids("c1").await.unwrap();
        assert!(result.written);
        assert_eq!(result.fixed_module_count, 2);
        assert_eq!(result.module_count, 2);

        for namespace in ["elearning", "Elearning"] {
            let mapping = memory
                .get(&format!("{}/courses/c1/moduleIdMapping", namespace))
                .await
                .unwrap()
                .unwrap();
            let mapping = normalize_id_mapping(Some(&mapping));
            assert_eq!(mapping.len(), 2);
            let first = memory
                .get(&format!("{}/courses/c1/modules/{}", namespace, mapping["0"]))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(first["title"], "M1");
            assert_eq!(first["order"], 0);
        }
        assert_eq!(
            memory.get("elearning/courses/c1/title").await.unwrap(),
            Some(json!("Rust"))
        );

        let again = migrator.migrate_module_ids("c1").await.unwrap();
        assert!(!again.written);
        assert_eq!(again.fixed_module_count, 0);
    }

    #[tokio::test]
    async fn test_legacy_only_course_is_promoted_whole() {
        let (memory, migrator) = migrator(
            json!({"Elearning": {"courses": {"old": {
                "title": "Legacy", "instructorId": "u1",
                "modules": [{"title": "M1"}]
            }}}}),
            Actor::system(),
        );

        migrator.migrate_module_ids("old").await.unwrap();
        let promoted = memory.get("elearning/courses/old").await.unwrap().unwrap();
        assert_eq!(promoted["title"], "Legacy");
        assert_eq!(promoted["instructorId"], "u1");
        assert!(promoted["modules"].as_object().is_some());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let tree = json!({"elearning": {"courses": {"c1": {"modules": [{"title": "M1"}]}}}});
        let (memory, migrator) = migrator(tree.clone(), Actor::system());
        let migrator = migrator.dry_run(true);

        let result = migrator.migrate_module_ids("c1").await.unwrap();
        assert!(!result.written);
        assert_eq!(result.fixed_module_count, 1);
        assert_eq!(memory.snapshot().await, tree);
    }

    #[tokio::test]
    async fn test_foreign_instructor_is_rejected() {
        let (_, migrator) = migrator(
            json!({"elearning": {"courses": {"c1": {
                "instructorId": "owner",
                "modules": [{"title": "M1"}]
            }}}}),
            Actor::new("intruder", Role::Instructor),
        );

        let err = migrator.migrate_module_ids("c1").await.unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));
    }

    #[tokio::test]
    async fn test_missing_course_is_not_found() {
        let (_, migrator) = migrator(json!({}), Actor::system());
        let err = migrator.migrate_module_ids("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
