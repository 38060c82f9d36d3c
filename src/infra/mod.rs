//! Infrastructure adapters and runtime bootstrap.

pub mod blob;
pub mod error;
pub mod github;
pub mod local;
pub mod telemetry;
