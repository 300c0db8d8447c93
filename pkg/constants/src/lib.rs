//! Centralized constants for the sleeper project.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod schedule;
pub mod state;
