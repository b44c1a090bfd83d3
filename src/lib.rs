//! Story Station core — streamed literary analysis with a local archive.
//!
//! Pipeline: uploaded text file → fixed analysis prompt → hosted generation
//! service (streaming) → fragments surfaced incrementally while the full text
//! accumulates → one immutable record in SQLite per file → on read, a
//! character-relationship graph recomputed from the stored text.
//!
//! The presentation layer (upload controls, history list, graph widget) is an
//! external collaborator. This crate exposes the pipeline, the record store,
//! and the relationship extractor behind plain Rust APIs; `src/main.rs` is a
//! thin CLI driver over them.

pub mod config;
pub mod db;
pub mod graph;
pub mod llm;
pub mod pipeline;
pub mod session;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries embedding the crate.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
