//! kiln materializes a template tree into a new project directory.
//! Names and contents are rendered with merged values, the result is written
//! in one pass and hooks run afterwards; a failed run leaves nothing behind.

/// Command-line interface module for the kiln application
pub mod cli;

/// Run options and their environment defaults
pub mod config;

/// The composed inputs of a single run
pub mod context;

/// The output directory and its rollback
pub mod destination;

/// Error types and handling for the kiln application
pub mod error;

/// Post-generation hooks from the source's `hooks/` directory
pub mod hooks;

/// `.kilnignore` patterns excluding template entries
pub mod ignore;

/// Local and git template sources
pub mod loader;

/// Render planning and commit
pub mod processor;

/// Template rendering engine
pub mod renderer;

/// Pipeline orchestration and rollback
pub mod runner;

/// Values documents and the template context
pub mod values;
