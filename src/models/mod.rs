// src/models/mod.rs

//! Domain models for the reconciler.
//!
//! Canonical, fully-populated records produced by the normalizer, plus
//! configuration and the acting-user type used by mutating operations.

mod actor;
mod config;
mod course;
mod evaluation;
mod module;
mod resource;

// Re-export all public types
pub use actor::{Actor, Role};
pub use config::{
    Config, LoggingConfig, NamespaceConfig, ReconcileConfig, StoreBackend, StoreConfig,
};
pub use course::{Course, ModuleIdMapping};
pub use evaluation::{Evaluation, EvaluationType, QUESTION_OPTION_COUNT, Question};
pub use module::{Module, ModuleDraft};
pub use resource::{Resource, ResourceType};
