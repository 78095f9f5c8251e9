//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `ProgramEngine` which acts as the primary entry
//! point for the program payment lifecycle: registration, administrative
//! transitions, payment reconciliation, and the periodic sweeps.

pub mod engine;
