//! Core control loop and session management for redscout.
//!
//! This crate owns the ordering and cleanup guarantees of one
//! assessment session:
//! - `Conversation`: append-only transcript scoped to a session id
//! - `Orchestrator`: the reason / review / execute state machine
//! - `ReviewGate`: the optional synchronous human checkpoint
//! - `Config`: explicit configuration, constructed once and passed by
//!   reference
//!
//! Tool semantics live in `redscout-tools`, reasoning backends in
//! `redscout-provider`, and the isolation boundary in
//! `redscout-sandbox`; this crate only sequences them.

pub mod config;
pub mod conversation;
pub mod error;
pub mod gate;
pub mod orchestrator;

pub use config::{AgentConfig, Config};
pub use conversation::Conversation;
pub use error::{ConfigError, CoreError, CoreResult};
pub use gate::{ConsoleGate, GateDecision, ReviewGate, ScriptedGate};
pub use orchestrator::{Orchestrator, RunOutcome, RunReport};
