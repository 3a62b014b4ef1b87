//! Gesture steps and their record encoding

use std::fmt;
use std::io::Write;

use uuid::Uuid;

use super::codec::{Packer, Unpacker, F32_SIZE, MAX_STRING_SIZE, U32_SIZE, UUID_SIZE};
use super::types::{anim_flags, wait_flags, GestureResult, StepType};

/// Start or stop an animation
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationStep {
    pub name: String,
    pub asset_id: Uuid,
    pub flags: u32,
}

impl AnimationStep {
    pub fn new(name: impl Into<String>, asset_id: Uuid) -> Self {
        Self {
            name: name.into(),
            asset_id,
            flags: anim_flags::NONE,
        }
    }

    pub fn stopping(name: impl Into<String>, asset_id: Uuid) -> Self {
        Self {
            name: name.into(),
            asset_id,
            flags: anim_flags::STOP,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.flags & anim_flags::STOP != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundStep {
    pub name: String,
    pub asset_id: Uuid,
    pub flags: u32,
}

impl SoundStep {
    pub fn new(name: impl Into<String>, asset_id: Uuid) -> Self {
        Self {
            name: name.into(),
            asset_id,
            flags: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatStep {
    pub text: String,
    pub flags: u32,
}

impl ChatStep {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            flags: 0,
        }
    }
}

/// Pause playback for a time, for outstanding animations, or both
#[derive(Debug, Clone, PartialEq)]
pub struct WaitStep {
    pub seconds: f32,
    pub flags: u32,
}

impl WaitStep {
    pub fn timed(seconds: f32) -> Self {
        Self {
            seconds,
            flags: wait_flags::TIME,
        }
    }

    pub fn all_animations() -> Self {
        Self {
            seconds: 0.0,
            flags: wait_flags::ALL_ANIM,
        }
    }

    pub fn waits_for_time(&self) -> bool {
        self.flags & wait_flags::TIME != 0
    }

    pub fn waits_for_animations(&self) -> bool {
        self.flags & wait_flags::ALL_ANIM != 0
    }
}

/// One step of a gesture
#[derive(Debug, Clone, PartialEq)]
pub enum GestureStep {
    Animation(AnimationStep),
    Sound(SoundStep),
    Chat(ChatStep),
    Wait(WaitStep),
}

const ASSET_STEP_SIZE: usize = U32_SIZE + MAX_STRING_SIZE + UUID_SIZE + U32_SIZE;
const CHAT_STEP_SIZE: usize = U32_SIZE + MAX_STRING_SIZE + U32_SIZE;
const WAIT_STEP_SIZE: usize = U32_SIZE + F32_SIZE + U32_SIZE;

impl GestureStep {
    pub fn step_type(&self) -> StepType {
        match self {
            GestureStep::Animation(_) => StepType::Animation,
            GestureStep::Sound(_) => StepType::Sound,
            GestureStep::Chat(_) => StepType::Chat,
            GestureStep::Wait(_) => StepType::Wait,
        }
    }

    /// Upper bound on the bytes [`serialize`](Self::serialize) writes for
    /// this step, type tag included.
    pub fn max_serial_size(&self) -> usize {
        match self {
            GestureStep::Animation(_) | GestureStep::Sound(_) => ASSET_STEP_SIZE,
            GestureStep::Chat(_) => CHAT_STEP_SIZE,
            GestureStep::Wait(_) => WAIT_STEP_SIZE,
        }
    }

    /// Write the type tag followed by the step body
    pub fn serialize<W: Write>(&self, packer: &mut Packer<W>) -> GestureResult<()> {
        packer.pack_u32(self.step_type().as_u32())?;
        match self {
            GestureStep::Animation(step) => {
                packer.pack_string(&step.name, "animation name")?;
                packer.pack_uuid(&step.asset_id)?;
                packer.pack_u32(step.flags)?;
            }
            GestureStep::Sound(step) => {
                packer.pack_string(&step.name, "sound name")?;
                packer.pack_uuid(&step.asset_id)?;
                packer.pack_u32(step.flags)?;
            }
            GestureStep::Chat(step) => {
                packer.pack_string(&step.text, "chat text")?;
                packer.pack_u32(step.flags)?;
            }
            GestureStep::Wait(step) => {
                packer.pack_f32(step.seconds)?;
                packer.pack_u32(step.flags)?;
            }
        }
        Ok(())
    }

    /// Read the body of a step whose tag has already been consumed.
    ///
    /// Returns `None` for the end marker.
    pub fn deserialize(
        step_type: StepType,
        unpacker: &mut Unpacker<'_>,
    ) -> GestureResult<Option<Self>> {
        let step = match step_type {
            StepType::Animation => GestureStep::Animation(AnimationStep {
                name: unpacker.unpack_string("animation name")?,
                asset_id: unpacker.unpack_uuid("animation id")?,
                flags: unpacker.unpack_u32("animation flags")?,
            }),
            StepType::Sound => GestureStep::Sound(SoundStep {
                name: unpacker.unpack_string("sound name")?,
                asset_id: unpacker.unpack_uuid("sound id")?,
                flags: unpacker.unpack_u32("sound flags")?,
            }),
            StepType::Chat => GestureStep::Chat(ChatStep {
                text: unpacker.unpack_string("chat text")?,
                flags: unpacker.unpack_u32("chat flags")?,
            }),
            StepType::Wait => GestureStep::Wait(WaitStep {
                seconds: unpacker.unpack_f32("wait seconds")?,
                flags: unpacker.unpack_u32("wait flags")?,
            }),
            StepType::Eof => return Ok(None),
        };
        Ok(Some(step))
    }

    /// Human-readable one-line description
    pub fn label(&self) -> String {
        match self {
            GestureStep::Animation(step) if step.is_stop() => {
                format!("Stop Animation: {}", step.name)
            }
            GestureStep::Animation(step) => format!("Start Animation: {}", step.name),
            GestureStep::Sound(step) => format!("Sound: {}", step.name),
            GestureStep::Chat(step) => format!("Chat: {}", step.text),
            GestureStep::Wait(step) => match (step.waits_for_time(), step.waits_for_animations()) {
                (true, true) => format!("Wait: {:.2} seconds, then all animations", step.seconds),
                (true, false) => format!("Wait: {:.2} seconds", step.seconds),
                (false, true) => "Wait: all animations".to_string(),
                (false, false) => "Wait: none".to_string(),
            },
        }
    }
}

impl fmt::Display for GestureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<AnimationStep> for GestureStep {
    fn from(step: AnimationStep) -> Self {
        GestureStep::Animation(step)
    }
}

impl From<SoundStep> for GestureStep {
    fn from(step: SoundStep) -> Self {
        GestureStep::Sound(step)
    }
}

impl From<ChatStep> for GestureStep {
    fn from(step: ChatStep) -> Self {
        GestureStep::Chat(step)
    }
}

impl From<WaitStep> for GestureStep {
    fn from(step: WaitStep) -> Self {
        GestureStep::Wait(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::types::{GestureError, MAX_STRING_LEN};
    use rstest::rstest;

    fn wave() -> Uuid {
        Uuid::from_u128(0xA11CE)
    }

    fn packed(step: &GestureStep) -> Vec<u8> {
        let mut packer = Packer::new(Vec::new());
        step.serialize(&mut packer).unwrap();
        packer.into_inner()
    }

    fn unpacked(bytes: &[u8]) -> GestureResult<Option<GestureStep>> {
        let mut unpacker = Unpacker::new(bytes);
        let tag = unpacker.unpack_u32("step type")?;
        let step_type = StepType::from_u32(tag).unwrap();
        GestureStep::deserialize(step_type, &mut unpacker)
    }

    #[rstest]
    #[case(AnimationStep::new("wave", wave()).into(), "Start Animation: wave")]
    #[case(AnimationStep::stopping("wave", wave()).into(), "Stop Animation: wave")]
    #[case(SoundStep::new("chime", wave()).into(), "Sound: chime")]
    #[case(ChatStep::new("hello").into(), "Chat: hello")]
    #[case(WaitStep::timed(1.5).into(), "Wait: 1.50 seconds")]
    #[case(WaitStep::all_animations().into(), "Wait: all animations")]
    #[case(WaitStep { seconds: 0.25, flags: wait_flags::TIME | wait_flags::ALL_ANIM }.into(),
           "Wait: 0.25 seconds, then all animations")]
    #[case(WaitStep { seconds: 2.0, flags: wait_flags::NONE }.into(), "Wait: none")]
    fn test_labels(#[case] step: GestureStep, #[case] expected: &str) {
        assert_eq!(step.label(), expected);
        assert_eq!(step.to_string(), expected);
    }

    #[test]
    fn test_wait_record_layout() {
        let bytes = packed(&WaitStep::timed(1.0).into());
        assert_eq!(bytes.len(), WAIT_STEP_SIZE);
        assert_eq!(&bytes[..4], &[3, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[8..], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_animation_record_round_trip() {
        let step: GestureStep = AnimationStep::stopping("dance", wave()).into();
        let bytes = packed(&step);
        assert_eq!(bytes.len(), 4 + 2 + 5 + 16 + 4);
        assert_eq!(unpacked(&bytes).unwrap(), Some(step));
    }

    #[test]
    fn test_unknown_flag_bits_preserved() {
        let step: GestureStep = WaitStep {
            seconds: 0.5,
            flags: wait_flags::TIME | wait_flags::KEY_RELEASE,
        }
        .into();
        assert_eq!(unpacked(&packed(&step)).unwrap(), Some(step));
    }

    #[test]
    fn test_truncated_body_fails() {
        let bytes = packed(&ChatStep::new("hello there").into());
        for cut in 4..bytes.len() {
            assert!(unpacked(&bytes[..cut]).is_err(), "cut at {}", cut);
        }
    }

    #[test]
    fn test_end_marker() {
        let mut unpacker = Unpacker::new(&[]);
        assert_eq!(GestureStep::deserialize(StepType::Eof, &mut unpacker).unwrap(), None);
    }

    #[test]
    fn test_max_serial_size_covers_longest_strings() {
        let long = "x".repeat(MAX_STRING_LEN);
        let steps: Vec<GestureStep> = vec![
            AnimationStep::new(long.clone(), wave()).into(),
            SoundStep::new(long.clone(), wave()).into(),
            ChatStep::new(long).into(),
            WaitStep::timed(3.0).into(),
        ];
        for step in &steps {
            let bytes = packed(step);
            assert_eq!(bytes.len(), step.max_serial_size(), "{}", step.label());
            assert_eq!(unpacked(&bytes).unwrap().as_ref(), Some(step));
        }
        assert_eq!(steps[0].max_serial_size(), 281);
        assert_eq!(steps[2].max_serial_size(), 265);
    }

    #[test]
    fn test_over_long_name_refused() {
        let step: GestureStep = SoundStep::new("x".repeat(MAX_STRING_LEN + 1), wave()).into();
        let mut packer = Packer::new(Vec::new());
        let err = step.serialize(&mut packer).unwrap_err();
        assert!(matches!(
            err,
            GestureError::StringTooLong {
                field: "sound name",
                len: 256
            }
        ));
    }
}
