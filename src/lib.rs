//! Solar Watch - soiling detection and telemetry API for a ThingSpeak solar tracker
//!
//! This library exposes the core modules for testing and reuse.

pub mod alerts;
pub mod common;
pub mod config;
pub mod detector;
pub mod entity;
pub mod error;
pub mod monitor;
pub mod routes;
pub mod store;
pub mod telemetry;
