//! Core engine concepts

pub mod engine_state;
