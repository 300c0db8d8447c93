//! Persistent state store and watch stream for the sleeper controllers.

pub mod client;
pub mod watch;
