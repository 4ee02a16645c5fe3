//! Tidyflow Engine Library
//!
//! Plan-then-apply cleaning for tabular, text/PDF and image data. Each
//! modality has a profiler, an op library and an orchestrator; plans come
//! from the planner adapter and run through the shared plan executor.
//! Used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// Planner adapter and fallback plans
pub mod planner;

/// Shared plan executor
pub mod executor;

/// Tabular (CSV) profiling, ops and orchestration
pub mod tabular;

/// Text and PDF profiling, ops and orchestration
pub mod text;

/// Image profiling, ops and orchestration
pub mod image;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
