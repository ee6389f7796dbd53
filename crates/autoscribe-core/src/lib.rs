//! Core types for the autoscribe session transcript pipeline.
//!
//! This crate provides the foundational types shared by the autoscribe
//! crates: error handling, the message/part data model, host lifecycle
//! events, and configuration.
//!
//! # Main types
//!
//! - [`AutoscribeError`] — Unified error enum for all pipeline subsystems.
//! - [`AutoscribeResult`] — Convenience alias for `Result<T, AutoscribeError>`.
//! - [`SessionEvent`] — A lifecycle event from the host's event stream.
//! - [`MessageData`] / [`PartData`] — A transcript message and its typed parts.
//! - [`AutosaveConfig`] — Pipeline configuration with host-friendly defaults.

/// Pipeline configuration.
pub mod config;
/// Error enum and result alias.
pub mod error;
/// Host session lifecycle events.
pub mod event;
/// Message and part data model.
pub mod message;

pub use config::AutosaveConfig;
pub use error::{AutoscribeError, AutoscribeResult};
pub use event::SessionEvent;
pub use message::{MessageData, PartData, Role, ToolState};
