//! Use cases (application services)
//!
//! Each use case represents a specific application operation.

pub mod run_engine;
