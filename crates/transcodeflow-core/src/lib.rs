//! transcodeflow-core: job model, ffmpeg argument construction, and errors.
//!
//! Everything in this crate is pure: no I/O, no async. The server validates
//! and serializes [`Job`]s, workers decode them and run
//! [`Job::build_command`], and both sides share the unified [`Error`].

pub mod error;
pub mod job;
pub mod result;

pub use error::{Error, Result};
pub use job::{AudioQuality, Job, QualityPreset, SimpleOptions};
pub use result::JobResult;
