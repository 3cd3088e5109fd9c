//! Pipeline entry points for maintenance runs.
//!
//! - `run_reconcile`: Migrate module IDs of every course in the store

pub mod reconcile;

pub use reconcile::{
    CourseFailure, ReconcileSummary, list_course_ids, reconcile_all_courses, reconcile_courses,
    run_reconcile,
};
