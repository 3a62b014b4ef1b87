//! Gestures: user-triggered macros of animations, sounds, chat and waits
//!
//! - `types` - error type, flags and the effects trait
//! - `codec` - little-endian field packer/unpacker
//! - `step` - the four step kinds and their records
//! - `player` - per-gesture playback state machine
//! - `multi` - a full gesture asset (bindings + steps + playback)
//! - `manager` - gesture library, trigger matching and event posting

pub mod codec;
pub mod manager;
pub mod multi;
pub mod player;
pub mod step;
pub mod types;

pub use manager::GestureManager;
pub use multi::MultiGesture;
pub use player::{GesturePlayback, PlaybackState};
pub use step::{AnimationStep, ChatStep, GestureStep, SoundStep, WaitStep};
pub use types::{
    anim_flags, wait_flags, AnimRequest, GestureError, GestureEvent, GestureId, GestureResult,
    StepEffects, StepType,
};
