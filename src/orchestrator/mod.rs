//! Application-level orchestration.
//!
//! This module owns the workflow lifecycle: it turns UI commands into service calls and call
//! outcomes into events. UI/CLI layers call into this module to keep responsibilities separated.

mod controller;

pub use controller::run_controller;
