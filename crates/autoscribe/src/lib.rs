//! Debounced session transcript autosave.
//!
//! This crate watches a host application's session lifecycle events and
//! persists each root session's transcript to a markdown file once the
//! session goes idle or is deleted. Child ("subagent") sessions are
//! embedded into their root ancestor's file, never written standalone.
//! Events may arrive out of order across sessions — a child's creation can
//! precede its parent's — and flushes are idempotent overwrites, so
//! re-running one never duplicates or corrupts a file.
//!
//! # Main types
//!
//! - [`Autoscribe`] — The pipeline entry point: event dispatch and flushing.
//! - [`SessionRegistry`] / [`Session`] — In-memory session tracking with
//!   parent/child links and out-of-order adoption.
//! - [`FlushScheduler`] — Per-session debounce timers.
//! - [`MessageSource`] — Seam to the host's message-retrieval API.
//! - [`ImagePass`] — Inline-image extraction ahead of formatting.

/// Per-session debounce timers.
pub mod debounce;
/// Filename and topic string utilities.
pub mod filename;
/// Markdown rendering of transcripts.
pub mod format;
/// Inline-image extraction.
pub mod images;
/// Atomic dual-destination file writes.
pub mod persist;
/// Session registry and parent/child tracking.
pub mod registry;
/// Save orchestration and event dispatch.
pub mod save;
/// Message-retrieval seam.
pub mod source;

pub use autoscribe_core::{
    AutosaveConfig, AutoscribeError, AutoscribeResult, MessageData, PartData, Role, SessionEvent,
    ToolState,
};
pub use debounce::FlushScheduler;
pub use format::ChildTranscript;
pub use images::ImagePass;
pub use registry::{Session, SessionRegistry};
pub use save::Autoscribe;
pub use source::MessageSource;
