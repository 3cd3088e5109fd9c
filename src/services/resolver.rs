// src/services/resolver.rs

//! Module lookup across schema generations.
//!
//! A module reference from a URL is either a stable ID or, in links made
//! before migration, a zero-based position. Candidates are tried in order,
//! first in the primary namespace and then in the legacy one:
//!
//! 1. direct path `courses/<c>/modules/<m>`
//! 2. the course record's embedded `modules`
//! 3. for digit-only references: the course's `moduleIdMapping`, then the
//!    module at that position when sorted by `order`
//!
//! When nothing matches but the course has modules, its first module is
//! returned (`ResolvedVia::FirstAvailable`) so old "module 0" links keep
//! working after a restructuring. Only a course without any module yields
//! [`ModuleNotFound`].

use std::fmt;

use serde_json::Value;

use crate::error::AppError;
use crate::models::{Course, Module};
use crate::services::normalizer::{NormalizeContext, normalize_course, normalize_module};
use crate::storage::{DualWriteStore, Namespace, paths};
use crate::utils::ids::positional_index;

/// How a module reference was matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedVia {
    DirectPath,
    EmbeddedInCourse,
    IdMapping { mapped_id: String },
    Position { index: usize },
    FirstAvailable,
}

impl fmt::Display for ResolvedVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedVia::DirectPath => write!(f, "direct path"),
            ResolvedVia::EmbeddedInCourse => write!(f, "embedded in course"),
            ResolvedVia::IdMapping { mapped_id } => write!(f, "id mapping -> {}", mapped_id),
            ResolvedVia::Position { index } => write!(f, "position {}", index),
            ResolvedVia::FirstAvailable => write!(f, "first available module"),
        }
    }
}

/// A normalized module and where it was found.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub module: Module,
    pub namespace: Namespace,
    pub via: ResolvedVia,
}

/// Diagnostics for a reference that matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleNotFound {
    pub course_id: String,
    pub module_ref: String,
    /// Store paths read, in order
    pub attempted_paths: Vec<String>,
    /// Reads that failed, as `path: error`
    pub read_errors: Vec<String>,
    /// `id (title)` of every module seen in the course
    pub available_modules: Vec<String>,
}

impl ModuleNotFound {
    fn new(course_id: &str, module_ref: &str) -> Self {
        Self {
            course_id: course_id.to_string(),
            module_ref: module_ref.to_string(),
            ..Self::default()
        }
    }
}

impl fmt::Display for ModuleNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "module '{}' of course '{}'; tried [{}]",
            self.module_ref,
            self.course_id,
            self.attempted_paths.join(", ")
        )?;
        if !self.read_errors.is_empty() {
            write!(f, "; read errors [{}]", self.read_errors.join("; "))?;
        }
        write!(f, "; available [{}]", self.available_modules.join(", "))
    }
}

impl From<ModuleNotFound> for AppError {
    fn from(diagnostics: ModuleNotFound) -> Self {
        AppError::not_found("module", diagnostics)
    }
}

/// Whether `module_ref` names a single child of `modules`.
fn is_module_key(module_ref: &str) -> bool {
    !module_ref.trim().is_empty() && !module_ref.contains('/')
}

/// Resolves module references against the store.
#[derive(Clone)]
pub struct ModuleResolver {
    store: DualWriteStore,
}

impl ModuleResolver {
    pub fn new(store: DualWriteStore) -> Self {
        Self { store }
    }

    /// Find and normalize the module `module_ref` of `course_id`.
    pub async fn resolve(
        &self,
        course_id: &str,
        module_ref: &str,
    ) -> std::result::Result<ResolvedModule, ModuleNotFound> {
        let ctx = NormalizeContext::new().for_course(course_id);
        let mut diagnostics = ModuleNotFound::new(course_id, module_ref);
        let mut fallback: Option<(Namespace, Course)> = None;

        // A reference that is not a single key can only reach the fallback
        let addressable = is_module_key(module_ref);
        if !addressable {
            log::warn!(
                "Module reference {:?} of course {} is not a module key",
                module_ref,
                course_id
            );
        }

        for namespace in self.store.namespaces() {
            // 1. Direct module path
            if addressable {
                let direct = paths::module(course_id, module_ref);
                if let Some(Value::Object(obj)) = self
                    .read_candidate(namespace, &direct, &mut diagnostics)
                    .await
                {
                    let position = positional_index(module_ref).unwrap_or(0);
                    return Ok(ResolvedModule {
                        module: normalize_module(module_ref, &obj, position, &ctx),
                        namespace,
                        via: ResolvedVia::DirectPath,
                    });
                }
            }

            // 2-3. Through the course record
            let course_path = paths::course(course_id);
            let Some(raw_course) = self
                .read_candidate(namespace, &course_path, &mut diagnostics)
                .await
            else {
                continue;
            };
            let Some(course) = normalize_course(course_id, &raw_course, &ctx) else {
                continue;
            };

            if let Some((module, via)) = addressable
                .then(|| Self::match_in_course(&course, module_ref))
                .flatten()
            {
                return Ok(ResolvedModule {
                    module,
                    namespace,
                    via,
                });
            }

            if diagnostics.available_modules.is_empty() {
                diagnostics.available_modules =
                    course.modules_in_order().iter().map(|m| m.label()).collect();
            }
            if fallback.is_none() && course.module_count() > 0 {
                fallback = Some((namespace, course));
            }
        }

        // 5. Legacy-link fallback
        if let Some((namespace, course)) = fallback {
            if let Some(first) = course.modules_in_order().first() {
                log::warn!(
                    "Module '{}' not found in course {}, falling back to first module {}",
                    module_ref,
                    course_id,
                    first.id
                );
                return Ok(ResolvedModule {
                    module: (*first).clone(),
                    namespace,
                    via: ResolvedVia::FirstAvailable,
                });
            }
        }

        log::warn!("Module lookup failed: {}", diagnostics);
        Err(diagnostics)
    }

    /// Embedded lookup, then the id mapping and position for digit-only references.
    fn match_in_course(course: &Course, module_ref: &str) -> Option<(Module, ResolvedVia)> {
        if let Some(module) = course.modules.get(module_ref) {
            return Some((module.clone(), ResolvedVia::EmbeddedInCourse));
        }

        let index = positional_index(module_ref)?;

        if let Some(mapped_id) = course.module_id_mapping.get(module_ref) {
            if let Some(module) = course.modules.get(mapped_id) {
                return Some((
                    module.clone(),
                    ResolvedVia::IdMapping {
                        mapped_id: mapped_id.clone(),
                    },
                ));
            }
        }

        course
            .modules_in_order()
            .get(index)
            .map(|module| ((*module).clone(), ResolvedVia::Position { index }))
    }

    /// Read one candidate path, recording it; read failures are recorded and skipped.
    async fn read_candidate(
        &self,
        namespace: Namespace,
        relative: &str,
        diagnostics: &mut ModuleNotFound,
    ) -> Option<Value> {
        let path = self.store.full_path(namespace, relative)?;
        diagnostics.attempted_paths.push(path.clone());
        match self.store.read(namespace, relative).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Read of {} failed: {}", path, e);
                diagnostics.read_errors.push(format!("{}: {}", path, e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NamespaceConfig;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn resolver(tree: Value) -> ModuleResolver {
        let store = DualWriteStore::new(
            Arc::new(MemoryStore::from_value(tree)),
            &NamespaceConfig::default(),
        );
        ModuleResolver::new(store)
    }

    #[tokio::test]
    async fn test_direct_path_hit() {
        let resolver = resolver(json!({"elearning": {"courses": {"c1": {"modules": {
            "module_1_a": {"title": "Intro", "order": 0, "resources": {"r1": true}}
        }}}}}));

        let found = resolver.resolve("c1", "module_1_a").await.unwrap();
        assert_eq!(found.via, ResolvedVia::DirectPath);
        assert_eq!(found.namespace, Namespace::Primary);
        assert_eq!(found.module.title, "Intro");
        assert_eq!(found.module.course_id, "c1");
        assert!(found.module.resources.is_empty());
    }

    #[tokio::test]
    async fn test_embedded_lookup_by_id_field_in_array() {
        let resolver = resolver(json!({"elearning": {"courses": {"c1": {"modules": [
            {"id": "module_1_a", "title": "A", "order": 0},
            {"id": "module_2_b", "title": "B", "order": 1}
        ]}}}}));

        let found = resolver.resolve("c1", "module_2_b").await.unwrap();
        assert_eq!(found.via, ResolvedVia::EmbeddedInCourse);
        assert_eq!(found.module.title, "B");
    }

    #[tokio::test]
    async fn test_numeric_reference_uses_id_mapping() {
        let resolver = resolver(json!({"elearning": {"courses": {"c1": {
            "modules": {
                "module_1_a": {"title": "A", "order": 0},
                "module_2_b": {"title": "B", "order": 1}
            },
            "moduleIdMapping": ["module_1_a", "module_2_b"]
        }}}}));

        let found = resolver.resolve("c1", "1").await.unwrap();
        assert_eq!(
            found.via,
            ResolvedVia::IdMapping {
                mapped_id: "module_2_b".to_string()
            }
        );
        assert_eq!(found.module.id, "module_2_b");
    }

    #[tokio::test]
    async fn test_numeric_reference_falls_back_to_position() {
        let resolver = resolver(json!({"elearning": {"courses": {"c1": {"modules": {
            "module_z": {"title": "Second", "order": 1},
            "module_a": {"title": "Third", "order": 2},
            "module_m": {"title": "First", "order": 0}
        }}}}}));

        let found = resolver.resolve("c1", "1").await.unwrap();
        assert_eq!(found.via, ResolvedVia::Position { index: 1 });
        assert_eq!(found.module.title, "Second");
    }

    #[tokio::test]
    async fn test_legacy_namespace_searched_second() {
        let resolver = resolver(json!({
            "elearning": {"courses": {}},
            "Elearning": {"courses": {"c1": {"modules": {
                "module_1_a": {"title": "Old", "order": 0}
            }}}}
        }));

        let found = resolver.resolve("c1", "module_1_a").await.unwrap();
        assert_eq!(found.namespace, Namespace::Legacy);
        assert_eq!(found.module.title, "Old");
    }

    #[tokio::test]
    async fn test_unknown_reference_falls_back_to_first_module() {
        let resolver = resolver(json!({"elearning": {"courses": {"c1": {"modules": {
            "module_b": {"title": "B", "order": 1},
            "module_a": {"title": "A", "order": 0}
        }}}}}));

        let found = resolver.resolve("c1", "7").await.unwrap();
        assert_eq!(found.via, ResolvedVia::FirstAvailable);
        assert_eq!(found.module.id, "module_a");
    }

    fn two_module_course() -> Value {
        json!({"elearning": {"courses": {"c1": {"modules": {
            "module_a": {"title": "A", "order": 0, "evaluations": {
                "e1": {"title": "Quiz 1"}
            }},
            "module_b": {"title": "B", "order": 1}
        }}}}})
    }

    #[tokio::test]
    async fn test_empty_reference_falls_back_to_first_module() {
        let resolver = resolver(two_module_course());

        for module_ref in ["", "  ", "/"] {
            let found = resolver.resolve("c1", module_ref).await.unwrap();
            assert_eq!(found.via, ResolvedVia::FirstAvailable);
            assert_eq!(found.module.id, "module_a");
            assert!(found.module.extra.is_empty());
        }
    }

    #[tokio::test]
    async fn test_nested_path_reference_is_not_a_module() {
        let resolver = resolver(two_module_course());

        let found = resolver
            .resolve("c1", "module_a/evaluations/e1")
            .await
            .unwrap();
        assert_eq!(found.via, ResolvedVia::FirstAvailable);
        assert_eq!(found.module.id, "module_a");
        assert_eq!(found.module.title, "A");
    }

    #[tokio::test]
    async fn test_nested_path_reference_without_modules_is_not_found() {
        let resolver = resolver(json!({"elearning": {"courses": {"c1": {"title": "Empty"}}}}));

        let err = resolver.resolve("c1", "a/b").await.unwrap_err();
        assert_eq!(
            err.attempted_paths,
            vec!["elearning/courses/c1", "Elearning/courses/c1"]
        );
    }

    #[tokio::test]
    async fn test_not_found_carries_diagnostics() {
        let resolver = resolver(json!({"elearning": {"courses": {"c1": {"title": "Empty"}}}}));

        let err = resolver.resolve("c1", "module_x").await.unwrap_err();
        assert_eq!(err.course_id, "c1");
        assert_eq!(
            err.attempted_paths,
            vec![
                "elearning/courses/c1/modules/module_x",
                "elearning/courses/c1",
                "Elearning/courses/c1/modules/module_x",
                "Elearning/courses/c1",
            ]
        );
        assert!(err.available_modules.is_empty());

        let app_error: AppError = err.into();
        assert!(matches!(app_error, AppError::NotFound { .. }));
    }
}
