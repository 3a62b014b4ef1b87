//! Procedural audio generation
//!
//! Generators here only produce samples; handing the buffers to an output
//! device is the mixer backend's job.
//!
//! - `formats` - output buffer formats and per-format sample behavior
//! - `wind` - pink-noise wind generator with a thread-safe control handle

pub mod formats;
pub mod wind;

pub use formats::{MixFormat, WindSample, SINT16_MAX, SINT16_MIN};
pub use wind::{WindConfig, WindControls, WindError, WindGenerator, WindTargets};
