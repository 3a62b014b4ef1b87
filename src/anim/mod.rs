//! Animation blending support
//!
//! Only the frame-level damping math lives here; skeleton and motion
//! blending are owned by the character system.

pub mod damping;

pub use damping::{lerp, DampingError, DampingResult, InterpolantCache};
