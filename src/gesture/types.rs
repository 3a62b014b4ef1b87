//! Core types for gestures

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Asset format version written by this crate
pub const GESTURE_VERSION: u32 = 2;

/// Longest string (in bytes) stored in a gesture asset
pub const MAX_STRING_LEN: usize = 255;

/// Most steps accepted when unpacking a gesture asset
pub const MAX_STEPS: usize = 255;

/// How long a gesture waits on animations before giving up and moving on
pub const DEFAULT_ANIM_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for gesture operations
#[derive(Debug, Error)]
pub enum GestureError {
    /// Asset bytes are truncated or inconsistent
    #[error("Malformed gesture asset at byte {offset}: {reason}")]
    MalformedAsset { offset: usize, reason: String },
    /// Asset was written by an unknown format version
    #[error("Unsupported gesture version {0} (expected {})", GESTURE_VERSION)]
    UnsupportedVersion(u32),
    /// A step refers to an asset that cannot be resolved
    #[error("Missing {kind} asset for step {step} ({name:?})")]
    MissingAsset {
        kind: &'static str,
        step: usize,
        name: String,
    },
    /// A string field does not fit the asset format
    #[error("{field} is {len} bytes long (max {})", MAX_STRING_LEN)]
    StringTooLong { field: &'static str, len: usize },
    /// More steps than an asset can hold
    #[error("Gesture has {0} steps (max {})", MAX_STEPS)]
    TooManySteps(usize),
    /// Writing the asset failed
    #[error("I/O error writing gesture: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gesture operations
pub type GestureResult<T> = Result<T, GestureError>;

/// Step type discriminant as stored in the asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StepType {
    Animation = 0,
    Sound = 1,
    Chat = 2,
    Wait = 3,
    /// End-of-steps marker
    Eof = 4,
}

impl StepType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(StepType::Animation),
            1 => Some(StepType::Sound),
            2 => Some(StepType::Chat),
            3 => Some(StepType::Wait),
            4 => Some(StepType::Eof),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Animation step flags
pub mod anim_flags {
    pub const NONE: u32 = 0;
    /// Stop the animation instead of starting it
    pub const STOP: u32 = 1 << 0;
}

/// Wait step flags
pub mod wait_flags {
    pub const NONE: u32 = 0;
    /// Wait a fixed number of seconds
    pub const TIME: u32 = 1 << 0;
    /// Wait until every animation the gesture started has stopped
    pub const ALL_ANIM: u32 = 1 << 1;
    /// Wait for the trigger key to be released (stored, not acted on)
    pub const KEY_RELEASE: u32 = 1 << 2;
}

/// Whether an animation request starts or stops the animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimRequest {
    Start,
    Stop,
}

/// Requests a playing gesture makes of the rest of the viewer.
///
/// All calls are fire-and-forget; animation start/stop confirmations come
/// back through the gesture's `animation_started`/`animation_stopped`.
pub trait StepEffects {
    fn request_animation(&mut self, asset_id: Uuid, request: AnimRequest);
    fn play_sound(&mut self, asset_id: Uuid);
    fn send_chat(&mut self, text: &str);
}

/// Handle for a gesture held by a `GestureManager`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GestureId(pub u32);

impl fmt::Display for GestureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gesture#{}", self.0)
    }
}

/// Notifications posted by the gesture manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    Started(GestureId),
    /// Played through to the end
    Finished(GestureId),
    /// Stopped early by the owner
    Stopped(GestureId),
}
