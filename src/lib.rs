//! Client for the SportSight highlight service.
//!
//! The [`workflow`] module holds the upload -> run -> results state machine,
//! [`orchestrator`] drives it against a [`service::HighlightService`], and the CLI/TUI layers
//! render the [`model::WorkflowEvent`]s it emits.

pub mod cli;
pub mod download;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod render;
pub mod service;
#[cfg(feature = "tui")]
pub mod tui;
pub mod workflow;
