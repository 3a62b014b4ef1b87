// formats.rs - Output sample formats for generated audio

//! Output sample formats for generated audio.
//!
//! The mixer hands generators either 16-bit integer or 32-bit float
//! interleaved stereo buffers. Each sample type carries its own noise scaling
//! and clamp behavior through [`WindSample`].

use rand::Rng;

/// Maximum value for 16-bit signed integer
pub const SINT16_MAX: f32 = 32767.0;

/// Minimum value for 16-bit signed integer
pub const SINT16_MIN: f32 = -32768.0;

/// Mixer buffer format
///
/// Format is encoded as: bits 0-7 = bytes per channel, bits 8-15 = channels
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixFormat {
    #[default]
    Stereo16 = 0x00170202,
    StereoFloat32 = 0x00170204,
}

impl MixFormat {
    /// Extract bytes per channel from format
    pub fn bytes_per_channel(self) -> usize {
        ((self as u32) & 0xFF) as usize
    }

    /// Extract number of channels from format
    pub fn channels(self) -> usize {
        (((self as u32) >> 8) & 0xFF) as usize
    }

    /// Size of one interleaved frame in bytes
    pub fn frame_size(self) -> usize {
        self.bytes_per_channel() * self.channels()
    }

    /// Short name used in config files and on the command line
    pub fn name(self) -> &'static str {
        match self {
            MixFormat::Stereo16 => "s16",
            MixFormat::StereoFloat32 => "f32",
        }
    }

    /// Parse a short format name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "s16" | "int16" | "16" => Some(MixFormat::Stereo16),
            "f32" | "float" | "float32" => Some(MixFormat::StereoFloat32),
            _ => None,
        }
    }
}

/// A sample type the wind generator can write.
pub trait WindSample: Copy + Default + Send + 'static {
    /// One white-noise variate, zero-mean and uniform, scaled to this
    /// format's native range.
    fn noise<R: Rng + ?Sized>(rng: &mut R) -> f32;

    /// Split an interpolated mono sample into (left, right) using the
    /// right-channel pan gain. With `clip` set the result is hard-clamped to
    /// the 16-bit signed range.
    fn split_stereo(sample: f32, pan_right: f32, clip: bool) -> (Self, Self);
}

impl WindSample for i16 {
    fn noise<R: Rng + ?Sized>(rng: &mut R) -> f32 {
        // Legacy 16-bit-centered range: [S16_MIN/8, S16_MIN/8 + U16_MAX/8)
        rng.gen::<f32>() * (u16::MAX as f32 / 8.0) + SINT16_MIN / 8.0
    }

    fn split_stereo(sample: f32, pan_right: f32, clip: bool) -> (Self, Self) {
        let right = (sample * pan_right) as i32;
        let left = sample as i32 - right;
        if clip {
            (clamp_i16(left), clamp_i16(right))
        } else {
            // Integer store without clamping, as the mixer does for sub-unity gain
            (left as i16, right as i16)
        }
    }
}

impl WindSample for f32 {
    fn noise<R: Rng + ?Sized>(rng: &mut R) -> f32 {
        rng.gen::<f32>() - 0.5
    }

    fn split_stereo(sample: f32, pan_right: f32, clip: bool) -> (Self, Self) {
        let right = sample * pan_right;
        let left = sample - right;
        if clip {
            (
                left.clamp(SINT16_MIN, SINT16_MAX),
                right.clamp(SINT16_MIN, SINT16_MAX),
            )
        } else {
            (left, right)
        }
    }
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
