// src/lib.rs

//! Course Reconciler Library
//!
//! Normalizes, resolves and migrates e-learning course records stored in a
//! realtime JSON tree store.

pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
