//! Periodic telemetry polling and evaluation.

pub mod scheduler;
pub mod worker;
