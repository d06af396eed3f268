//! Transcodeflow - transcoding job queue
//!
//! This library crate exposes the submission endpoint, the broker clients and
//! the worker pool for integration testing.

pub mod broker;
pub mod config;
pub mod server;
pub mod shutdown;
pub mod telemetry;
pub mod worker;
