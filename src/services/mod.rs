//! Service layer for the reconciler.
//!
//! This module contains the business logic for:
//! - Schema normalization (`normalizer`)
//! - Module lookup across schema generations (`ModuleResolver`)
//! - Positional ID migration (`ModuleMigrator`)
//! - Guarded course edits (`CourseEditor`)

mod editor;
mod migrator;
pub mod normalizer;
mod resolver;

pub use editor::CourseEditor;
pub use migrator::{MigrationPlan, MigrationResult, ModuleMigrator, id_mapping, plan_migration};
pub use resolver::{ModuleNotFound, ModuleResolver, ResolvedModule, ResolvedVia};
