//! Core types and error definitions for the Hivemind swarm framework.
//!
//! This crate provides the foundational types shared across all Hivemind
//! crates: the wire-format message envelope, error handling, and the swarm
//! configuration.
//!
//! # Main types
//!
//! - [`HivemindError`] — Unified error enum for all Hivemind subsystems.
//! - [`HivemindResult`] — Convenience alias for `Result<T, HivemindError>`.
//! - [`MessageType`] — Closed enumeration of message kinds on the wire.
//! - [`Message`] — The unit of communication between swarm agents.
//! - [`Priority`] / [`Metadata`] — Advisory message metadata.
//! - [`SwarmConfig`] — Timeouts, namespaces, and worker roles.

/// Swarm configuration with per-field defaults.
pub mod config;
/// Unified error type.
pub mod error;
/// Message envelope and wire codec.
pub mod message;

pub use config::SwarmConfig;
pub use error::{HivemindError, HivemindResult};
pub use message::{Message, MessageType, Metadata, Priority};
