//! A complete gesture: trigger bindings, steps and playback state

use std::fmt::Write as _;
use std::io::Write;
use std::time::Duration;

use uuid::Uuid;

use super::codec::{Packer, Unpacker, MAX_STRING_SIZE, U32_SIZE, U8_SIZE};
use super::player::{GesturePlayback, PlaybackState};
use super::step::GestureStep;
use super::types::{GestureError, GestureResult, StepEffects, StepType, GESTURE_VERSION, MAX_STEPS};

/// Fixed header plus the end marker
const FRAME_SIZE: usize = U32_SIZE + U8_SIZE + U32_SIZE + 2 * MAX_STRING_SIZE + U32_SIZE;

#[derive(Debug, Clone, Default)]
pub struct MultiGesture {
    /// Display name; not part of the asset
    pub name: String,
    /// Chat word that plays the gesture
    pub trigger: String,
    /// Text substituted for the trigger word in chat
    pub replace_text: String,
    pub key: u8,
    pub mask: u32,
    pub steps: Vec<GestureStep>,
    playback: GesturePlayback,
}

impl PartialEq for MultiGesture {
    fn eq(&self, other: &Self) -> bool {
        self.trigger == other.trigger
            && self.replace_text == other.replace_text
            && self.key == other.key
            && self.mask == other.mask
            && self.steps == other.steps
    }
}

impl MultiGesture {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_trigger(
        mut self,
        trigger: impl Into<String>,
        replace_text: impl Into<String>,
    ) -> Self {
        self.trigger = trigger.into();
        self.replace_text = replace_text.into();
        self
    }

    pub fn with_key(mut self, key: u8, mask: u32) -> Self {
        self.key = key;
        self.mask = mask;
        self
    }

    pub fn with_step(mut self, step: impl Into<GestureStep>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Upper bound on the size of [`serialize`](Self::serialize) output
    pub fn max_serial_size(&self) -> usize {
        FRAME_SIZE + self.steps.iter().map(GestureStep::max_serial_size).sum::<usize>()
    }

    /// Write the asset. Strings over 255 bytes or more than 255 steps are
    /// refused, since they would not load back unchanged.
    pub fn serialize<W: Write>(&self, out: W) -> GestureResult<usize> {
        if self.steps.len() > MAX_STEPS {
            return Err(GestureError::TooManySteps(self.steps.len()));
        }
        let mut packer = Packer::new(out);
        packer.pack_u32(GESTURE_VERSION)?;
        packer.pack_u8(self.key)?;
        packer.pack_u32(self.mask)?;
        packer.pack_string(&self.trigger, "trigger")?;
        packer.pack_string(&self.replace_text, "replacement text")?;
        for step in &self.steps {
            step.serialize(&mut packer)?;
        }
        packer.pack_u32(StepType::Eof.as_u32())?;
        Ok(packer.written())
    }

    pub fn serialize_to_vec(&self) -> GestureResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.max_serial_size());
        self.serialize(&mut buf)?;
        Ok(buf)
    }

    /// Decode a gesture asset
    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> GestureResult<Self> {
        let mut gesture = Self::new(name);
        gesture.load_bytes(data)?;
        Ok(gesture)
    }

    /// Replace this gesture's bindings and steps from an asset and reset
    /// playback. On failure the step list is left empty.
    pub fn load_bytes(&mut self, data: &[u8]) -> GestureResult<()> {
        self.playback.reset();
        self.steps.clear();
        let result = self.unpack(data);
        if result.is_err() {
            self.steps.clear();
        }
        result
    }

    fn unpack(&mut self, data: &[u8]) -> GestureResult<()> {
        let mut unpacker = Unpacker::new(data);
        let version = unpacker.unpack_u32("version")?;
        if version != GESTURE_VERSION {
            return Err(GestureError::UnsupportedVersion(version));
        }
        self.key = unpacker.unpack_u8("key")?;
        self.mask = unpacker.unpack_u32("mask")?;
        self.trigger = unpacker.unpack_string("trigger")?;
        self.replace_text = unpacker.unpack_string("replacement text")?;

        loop {
            let tag = unpacker.unpack_u32("step type")?;
            let step_type = StepType::from_u32(tag)
                .ok_or_else(|| unpacker.malformed(format!("unknown step type {}", tag)))?;
            let Some(step) = GestureStep::deserialize(step_type, &mut unpacker)? else {
                break;
            };
            if self.steps.len() == MAX_STEPS {
                return Err(unpacker.malformed(format!("more than {} steps", MAX_STEPS)));
            }
            self.steps.push(step);
        }

        if unpacker.remaining() > 0 {
            log::debug!(
                "Ignoring {} bytes after end of gesture '{}'",
                unpacker.remaining(),
                self.name
            );
        }
        Ok(())
    }

    pub fn playback(&self) -> &GesturePlayback {
        &self.playback
    }

    pub fn state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn set_anim_wait_timeout(&mut self, timeout: Option<Duration>) {
        self.playback.set_anim_wait_timeout(timeout);
    }

    pub fn trigger(&mut self) {
        log::debug!("Playing gesture '{}'", self.name);
        self.playback.trigger();
    }

    pub fn reset(&mut self) {
        self.playback.reset();
    }

    pub fn update(&mut self, elapsed: Duration, effects: &mut dyn StepEffects) -> PlaybackState {
        self.playback.update(&self.steps, elapsed, effects)
    }

    pub fn animation_started(&mut self, asset_id: Uuid) {
        self.playback.animation_started(asset_id);
    }

    pub fn animation_stopped(&mut self, asset_id: Uuid) {
        self.playback.animation_stopped(asset_id);
    }

    /// Multi-line description of bindings and steps
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "gesture '{}'", self.name);
        let _ = writeln!(out, "  trigger: {:?} -> {:?}", self.trigger, self.replace_text);
        let _ = writeln!(out, "  key: {} mask: {:#x}", self.key, self.mask);
        for (index, step) in self.steps.iter().enumerate() {
            let _ = writeln!(out, "  {:>3}. {}", index, step);
        }
        out
    }
}
