//! Shared configuration library for artfill.
//!
//! This crate centralizes engine configuration (provider credentials,
//! storage root, HTTP tuning) and the per-run option set, with a single
//! loader and validation path so the engine never reads ambient state.

pub mod engine;
pub mod loader;
pub mod options;

pub use engine::{EngineConfig, ProviderKeys};
pub use loader::{ConfigError, load_engine_config};
pub use options::{LibrarySelection, RunOptions};
