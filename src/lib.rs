//! Installment payment tracking for educational programs.
//!
//! A learner registers a program with a cost, duration, and payment cadence;
//! an administrator approves it; the learner pays on schedule through a
//! payment gateway; missed deadlines freeze the program until a new payment
//! is made. The [`application::engine::ProgramEngine`] is the entry point;
//! storage, gateway, notifications, and authorization are ports with
//! adapters under [`infrastructure`].

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
