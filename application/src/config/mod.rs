//! Application-level configuration.
//!
//! Settings that control how the engine loop behaves, independent of
//! where they were loaded from.

mod engine_settings;

pub use engine_settings::EngineSettings;
