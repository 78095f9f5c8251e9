//! Outward-facing interfaces beyond the library API: operator-oriented
//! exports for the CLI.

pub mod csv;
