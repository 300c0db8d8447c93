//! Resource types shared across the sleeper controllers.

pub mod config;
pub mod deployment;
pub mod selector;
pub mod sleepschedule;
pub mod validate;
