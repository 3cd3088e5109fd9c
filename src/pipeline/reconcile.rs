// src/pipeline/reconcile.rs

//! Bulk reconciliation of every course in the store.

use std::collections::BTreeSet;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Actor, Config};
use crate::services::ModuleMigrator;
use crate::storage::{DualWriteStore, paths};

/// One course that could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseFailure {
    pub course_id: String,
    pub error: String,
    /// Backend failure; a later run may succeed without a data fix
    pub retryable: bool,
}

/// Aggregated outcome of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub success_count: usize,
    pub failure_count: usize,
    pub fixed_module_count: usize,
    /// Courses actually written (0 on a dry run)
    pub rewritten_count: usize,
    pub failures: Vec<CourseFailure>,
}

impl ReconcileSummary {
    /// User-facing one-liner, e.g. `3 corrigés, 1 échecs`.
    pub fn message(&self) -> String {
        format!("{} corrigés, {} échecs", self.success_count, self.failure_count)
    }
}

/// Course IDs present in any namespace, sorted and de-duplicated.
pub async fn list_course_ids(store: &DualWriteStore) -> Result<Vec<String>> {
    let mut ids = BTreeSet::new();
    for namespace in store.namespaces() {
        ids.extend(store.keys(namespace, paths::COURSES).await?);
    }
    Ok(ids.into_iter().collect())
}

/// Migrate the given courses with at most `max_concurrent` in flight.
///
/// Per-course failures are counted, never propagated.
pub async fn reconcile_courses(
    migrator: &ModuleMigrator,
    course_ids: Vec<String>,
    max_concurrent: usize,
) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();

    let mut results = stream::iter(course_ids)
        .map(|course_id| async move {
            let result = migrator.migrate_module_ids(&course_id).await;
            (course_id, result)
        })
        .buffer_unordered(max_concurrent.max(1));

    while let Some((course_id, result)) = results.next().await {
        match result {
            Ok(outcome) => {
                summary.success_count += 1;
                summary.fixed_module_count += outcome.fixed_module_count;
                if outcome.written {
                    summary.rewritten_count += 1;
                }
            }
            Err(error) => {
                log::warn!("Course {} not reconciled: {}", course_id, error);
                summary.failure_count += 1;
                summary.failures.push(CourseFailure {
                    course_id,
                    error: error.to_string(),
                    retryable: error.is_store_failure(),
                });
            }
        }
    }

    summary.failures.sort_by(|a, b| a.course_id.cmp(&b.course_id));
    summary
}

/// Reconcile every course found in the store.
pub async fn reconcile_all_courses(
    migrator: &ModuleMigrator,
    max_concurrent: usize,
) -> Result<ReconcileSummary> {
    let course_ids = list_course_ids(migrator.store()).await?;
    log::info!("Reconciling {} courses", course_ids.len());
    Ok(reconcile_courses(migrator, course_ids, max_concurrent).await)
}

/// Run the reconciler with the configured concurrency and dry-run setting.
pub async fn run_reconcile(
    config: &Config,
    store: DualWriteStore,
    actor: Actor,
) -> Result<ReconcileSummary> {
    let start = Instant::now();
    let migrator = ModuleMigrator::new(store, actor).dry_run(config.reconcile.dry_run);

    let summary = reconcile_all_courses(&migrator, config.reconcile.max_concurrent).await?;

    log::info!(
        "{} ({} modules re-keyed, {} courses rewritten) in {:.1}s",
        summary.message(),
        summary.fixed_module_count,
        summary.rewritten_count,
        start.elapsed().as_secs_f64()
    );
    for failure in &summary.failures {
        let hint = if failure.retryable { " (retryable)" } else { "" };
        log::info!("  - {}: {}{}", failure.course_id, failure.error, hint);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::NamespaceConfig;
    use crate::storage::{MemoryStore, TreeStore};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn store(tree: Value) -> (Arc<MemoryStore>, DualWriteStore) {
        let memory = Arc::new(MemoryStore::from_value(tree));
        let store = DualWriteStore::new(memory.clone(), &NamespaceConfig::default());
        (memory, store)
    }

    #[tokio::test]
    async fn test_list_course_ids_unions_namespaces() {
        let (_, store) = store(json!({
            "elearning": {"courses": {"b": {"title": "B"}, "a": {"title": "A"}}},
            "Elearning": {"courses": {"a": {"title": "A"}, "c": {"title": "C"}}}
        }));
        assert_eq!(list_course_ids(&store).await.unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_reconcile_three_courses_one_failure() {
        let (memory, store) = store(json!({"elearning": {"courses": {
            "c1": {"modules": [{"title": "M1"}, {"title": "M2"}]},
            "c2": {"modules": {"module_1_a": {"title": "A", "order": 0}},
                   "moduleIdMapping": ["module_1_a"]},
            "c3": true
        }}}));
        let migrator = ModuleMigrator::new(store, Actor::system());

        let summary = reconcile_all_courses(&migrator, 2).await.unwrap();
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.failure_count, 1);
        assert_eq!(summary.fixed_module_count, 2);
        // c2 only gains defaulted fields but is still rewritten
        assert_eq!(summary.rewritten_count, 2);
        assert_eq!(summary.failures[0].course_id, "c3");
        assert!(!summary.failures[0].retryable);
        assert_eq!(summary.message(), "2 corrigés, 1 échecs");

        let keys = memory
            .child_keys("elearning/courses/c1/modules")
            .await
            .unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.starts_with("module_")));
    }

    #[tokio::test]
    async fn test_sparse_course_is_defaulted_not_failed() {
        let (_, store) = store(json!({"elearning": {"courses": {
            "c1": {"title": "Full", "modules": [{"title": "M1"}]},
            "c2": {"title": "Also full", "modules": {"0": {"title": "M1"}}},
            "c3": {"instructorId": "u9"}
        }}}));
        let migrator = ModuleMigrator::new(store, Actor::system());

        let summary = reconcile_all_courses(&migrator, 4).await.unwrap();
        assert_eq!(summary.success_count, 3);
        assert_eq!(summary.failure_count, 0);
        assert!(summary.failures.is_empty());
    }

    #[tokio::test]
    async fn test_missing_course_counts_as_failure() {
        let (_, store) = store(json!({}));
        let migrator = ModuleMigrator::new(store, Actor::system());

        let summary = reconcile_courses(&migrator, vec!["ghost".to_string()], 4).await;
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.failure_count, 1);
    }

    /// Fails every read of one course.
    struct UnreachableCourse(MemoryStore);

    #[async_trait::async_trait]
    impl TreeStore for UnreachableCourse {
        async fn get(&self, path: &str) -> Result<Option<Value>> {
            if path.ends_with("courses/down") {
                return Err(AppError::store(path, "503 Service Unavailable"));
            }
            self.0.get(path).await
        }
        async fn set(&self, path: &str, value: &Value) -> Result<()> {
            self.0.set(path, value).await
        }
        async fn update(&self, path: &str, fields: &serde_json::Map<String, Value>) -> Result<()> {
            self.0.update(path, fields).await
        }
        async fn remove(&self, path: &str) -> Result<()> {
            self.0.remove(path).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_isolated_and_retryable() {
        let backend = Arc::new(UnreachableCourse(MemoryStore::from_value(json!({
            "elearning": {"courses": {
                "down": {"title": "D"},
                "up": {"modules": [{"title": "M1"}]}
            }}
        }))));
        let store = DualWriteStore::new(backend, &NamespaceConfig::default());
        let migrator = ModuleMigrator::new(store, Actor::system());

        let summary = reconcile_all_courses(&migrator, 2).await.unwrap();
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failure_count, 1);
        assert_eq!(summary.failures[0].course_id, "down");
        assert!(summary.failures[0].retryable);
    }

    #[tokio::test]
    async fn test_run_reconcile_honours_dry_run() {
        let tree = json!({"elearning": {"courses": {"c1": {"modules": [{"title": "M1"}]}}}});
        let (memory, store) = store(tree.clone());
        let mut config = Config::default();
        config.reconcile.dry_run = true;

        let summary = run_reconcile(&config, store, Actor::system()).await.unwrap();
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.fixed_module_count, 1);
        assert_eq!(summary.rewritten_count, 0);
        assert_eq!(memory.snapshot().await, tree);
    }
}
