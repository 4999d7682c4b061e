//! Business permit application lifecycle with an HTTP adapter.

pub mod config;
pub mod error;
pub mod permits;
pub mod telemetry;
