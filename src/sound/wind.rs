// wind.rs - Procedural wind noise generator

//! Procedural wind noise.
//!
//! White noise is pinked by three leaky integrators, band-limited by a
//! resonant two-pole low-pass centred on the wind frequency, then linearly
//! interpolated up to the output rate and split into stereo by a pan gain.
//!
//! The synthesis runs at `sample_rate / sub_samples`; each synthesized
//! ("outer") sample fills `sub_samples` output frames.
//!
//! Target parameters are written through a [`WindControls`] handle, which may
//! live on another thread. The generator reads one snapshot per
//! [`WindGenerator::generate`] call and slews its current values toward it.

use std::f32::consts::TAU;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use portable_atomic::AtomicF32;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use super::formats::{MixFormat, WindSample};

/// Default output sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default number of output frames per synthesized sample
pub const DEFAULT_SUB_SAMPLES: u32 = 2;

/// Default resonant filter bandwidth in Hz
pub const DEFAULT_FILTER_BANDWIDTH: f32 = 50.0;

/// Initial wind center frequency in Hz
pub const DEFAULT_FREQUENCY: f32 = 100.0;

/// Fraction of the remaining distance covered per synthesized sample when
/// slewing gain, pan and frequency toward their targets.
pub const SLEW_RATE: f32 = 0.001;

/// Relative frequency difference under which the filter coefficients are
/// computed once per call instead of once per sample.
pub const FREQ_SNAP_RATIO: f32 = 0.112;

/// Above this current gain, output is hard-clamped to the 16-bit range.
pub const CLIP_GAIN: f32 = 2.0;

// Pinking filter (three leaky integrators plus a direct term)
const PINK_POLES: [f32; 3] = [0.99765, 0.96300, 0.57000];
const PINK_INPUT_GAINS: [f32; 3] = [0.0990460, 0.2965164, 1.0526913];
const PINK_DIRECT_GAIN: f32 = 0.1848;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Fixed construction parameters of a generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindConfig {
    pub sample_rate: u32,
    pub sub_samples: u32,
    pub filter_bandwidth: f32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            sub_samples: DEFAULT_SUB_SAMPLES,
            filter_bandwidth: DEFAULT_FILTER_BANDWIDTH,
        }
    }
}

/// One read of the target parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindTargets {
    pub gain: f32,
    pub frequency: f32,
    pub pan_right: f32,
}

#[derive(Debug)]
struct ControlCells {
    gain: AtomicF32,
    frequency: AtomicF32,
    pan_right: AtomicF32,
}

/// Shared handle to a generator's target parameters.
///
/// Cloning yields another handle to the same cells. Each field is a
/// single-writer / single-reader atomic; a reader may observe a new gain with
/// an old pan within one call, which the slewing makes inaudible.
#[derive(Debug, Clone)]
pub struct WindControls {
    cells: Arc<ControlCells>,
}

impl Default for WindControls {
    fn default() -> Self {
        Self::new()
    }
}

impl WindControls {
    pub fn new() -> Self {
        Self {
            cells: Arc::new(ControlCells {
                gain: AtomicF32::new(0.0),
                frequency: AtomicF32::new(DEFAULT_FREQUENCY),
                pan_right: AtomicF32::new(0.5),
            }),
        }
    }

    pub fn set_gain(&self, gain: f32) {
        self.cells.gain.store(gain, Ordering::Release);
    }

    pub fn set_frequency(&self, frequency: f32) {
        self.cells.frequency.store(frequency, Ordering::Release);
    }

    /// Right-channel share in [0, 1]; left gets the remainder
    pub fn set_pan_right(&self, pan_right: f32) {
        self.cells
            .pan_right
            .store(pan_right.clamp(0.0, 1.0), Ordering::Release);
    }

    pub fn snapshot(&self) -> WindTargets {
        WindTargets {
            gain: self.cells.gain.load(Ordering::Acquire),
            frequency: self.cells.frequency.load(Ordering::Acquire),
            pan_right: self.cells.pan_right.load(Ordering::Acquire),
        }
    }
}

/// Wind noise generator, one per audio voice
#[derive(Debug)]
pub struct WindGenerator {
    controls: WindControls,
    config: WindConfig,
    /// Period of one synthesized sample (sub_samples / sample_rate)
    sample_period: f32,
    /// Resonant filter pole radius squared
    b2: f32,

    pink: [f32; 3],
    y0: f32,
    y1: f32,
    last_sample: f32,

    current_gain: f32,
    current_frequency: f32,
    current_pan_right: f32,

    rng: StdRng,
    scratch_s16: Vec<i16>,
    scratch_f32: Vec<f32>,
}

impl WindGenerator {
    /// Create a generator with default bandwidth and sub-sampling
    pub fn new(sample_rate: u32) -> Self {
        Self::with_config(WindConfig {
            sample_rate,
            ..WindConfig::default()
        })
    }

    pub fn with_config(config: WindConfig) -> Self {
        Self::build(config, StdRng::from_entropy())
    }

    /// Deterministic noise source, for tests and offline renders
    pub fn with_seed(config: WindConfig, seed: u64) -> Self {
        Self::build(config, StdRng::seed_from_u64(seed))
    }

    fn build(mut config: WindConfig, rng: StdRng) -> Self {
        config.sample_rate = config.sample_rate.max(1);
        config.sub_samples = config.sub_samples.max(1);

        let sample_period = config.sub_samples as f32 / config.sample_rate as f32;
        let b2 = (-TAU * config.filter_bandwidth * sample_period).exp();

        Self {
            controls: WindControls::new(),
            config,
            sample_period,
            b2,
            pink: [0.0; 3],
            y0: 0.0,
            y1: 0.0,
            last_sample: 0.0,
            current_gain: 0.0,
            current_frequency: DEFAULT_FREQUENCY,
            current_pan_right: 0.5,
            rng,
            scratch_s16: Vec::new(),
            scratch_f32: Vec::new(),
        }
    }

    /// Handle for writing target parameters, possibly from another thread
    pub fn controls(&self) -> WindControls {
        self.controls.clone()
    }

    pub fn config(&self) -> WindConfig {
        self.config
    }

    pub fn current_gain(&self) -> f32 {
        self.current_gain
    }

    pub fn current_frequency(&self) -> f32 {
        self.current_frequency
    }

    pub fn current_pan_right(&self) -> f32 {
        self.current_pan_right
    }

    /// Resonant low-pass coefficients `(a0, b0)` for a center frequency
    fn filter_coefficients(&self, frequency: f32) -> (f32, f32) {
        let b0 = -4.0 * self.b2 / (1.0 + self.b2) * (TAU * frequency * self.sample_period).cos();
        let a0 = (1.0 - self.b2) * (1.0 - (b0 * b0) / (4.0 * self.b2)).max(0.0).sqrt();
        (a0, b0)
    }

    /// Fill `frames` interleaved stereo frames of `buffer` and return it.
    ///
    /// Writes `2 * frames` values, or as many whole frames as the buffer
    /// holds if it is shorter.
    pub fn generate<'a, T: WindSample>(
        &mut self,
        buffer: &'a mut [T],
        frames: usize,
    ) -> &'a mut [T] {
        let frames = frames.min(buffer.len() / 2);
        if frames == 0 {
            return buffer;
        }

        let target = self.controls.snapshot();
        let clip = self.current_gain > CLIP_GAIN;

        let interp_freq = (target.frequency - self.current_frequency).abs()
            >= self.current_frequency * FREQ_SNAP_RATIO;
        let (mut a0, mut b0) = (0.0, 0.0);
        if !interp_freq {
            self.current_frequency = target.frequency;
            (a0, b0) = self.filter_coefficients(self.current_frequency);
        }

        let sub_samples = self.config.sub_samples;
        let mut cursor = 0;

        while cursor < frames {
            let white = T::noise(&mut self.rng);
            let mut pink = white * PINK_DIRECT_GAIN;
            for ((acc, pole), gain) in self.pink.iter_mut().zip(PINK_POLES).zip(PINK_INPUT_GAINS) {
                *acc = pole * *acc + white * gain;
                pink += *acc;
            }

            if interp_freq {
                self.current_frequency = slew(self.current_frequency, target.frequency);
                (a0, b0) = self.filter_coefficients(self.current_frequency);
            }

            let filtered = a0 * pink - b0 * self.y0 - self.b2 * self.y1;
            self.y1 = self.y0;
            self.y0 = filtered;

            self.current_gain = slew(self.current_gain, target.gain);
            self.current_pan_right = slew(self.current_pan_right, target.pan_right);

            let next_sample = filtered * self.current_gain;
            let delta = (next_sample - self.last_sample) / sub_samples as f32;

            for _ in 0..sub_samples {
                if cursor == frames {
                    break;
                }
                self.last_sample += delta;
                let (left, right) = T::split_stereo(self.last_sample, self.current_pan_right, clip);
                buffer[2 * cursor] = left;
                buffer[2 * cursor + 1] = right;
                cursor += 1;
            }
        }

        buffer
    }

    /// Fill an untyped little-endian mixer buffer. Returns the number of
    /// frames written.
    pub fn generate_bytes(
        &mut self,
        buffer: &mut [u8],
        format: MixFormat,
    ) -> Result<usize, WindError> {
        let frame_size = format.frame_size();
        if buffer.is_empty() {
            return Err(WindError::InvalidArgument("empty output buffer".to_string()));
        }
        if buffer.len() % frame_size != 0 {
            return Err(WindError::InvalidArgument(format!(
                "buffer of {} bytes is not a whole number of {}-byte frames",
                buffer.len(),
                frame_size
            )));
        }

        let frames = buffer.len() / frame_size;
        match format {
            MixFormat::Stereo16 => {
                let mut scratch = std::mem::take(&mut self.scratch_s16);
                scratch.resize(frames * 2, 0);
                self.generate(&mut scratch, frames);
                LittleEndian::write_i16_into(&scratch, buffer);
                self.scratch_s16 = scratch;
            }
            MixFormat::StereoFloat32 => {
                let mut scratch = std::mem::take(&mut self.scratch_f32);
                scratch.resize(frames * 2, 0.0);
                self.generate(&mut scratch, frames);
                LittleEndian::write_f32_into(&scratch, buffer);
                self.scratch_f32 = scratch;
            }
        }
        Ok(frames)
    }
}

#[inline]
fn slew(current: f32, target: f32) -> f32 {
    (1.0 - SLEW_RATE) * current + SLEW_RATE * target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> WindGenerator {
        WindGenerator::with_seed(WindConfig::default(), 42)
    }

    #[test]
    fn test_defaults() {
        let gen = WindGenerator::new(DEFAULT_SAMPLE_RATE);
        assert_eq!(gen.config(), WindConfig::default());
        assert_eq!(gen.current_gain(), 0.0);
        assert_eq!(gen.current_frequency(), DEFAULT_FREQUENCY);
        assert_eq!(gen.current_pan_right(), 0.5);

        let targets = gen.controls().snapshot();
        assert_eq!(targets.gain, 0.0);
        assert_eq!(targets.frequency, DEFAULT_FREQUENCY);
        assert_eq!(targets.pan_right, 0.5);
    }

    #[test]
    fn test_filter_pole_radius() {
        let gen = seeded();
        let expected = (-TAU * 50.0 * (2.0 / 44100.0)).exp();
        assert!((gen.b2 - expected).abs() < 1e-6);
        assert!(gen.b2 > 0.0 && gen.b2 < 1.0);
    }

    #[test]
    fn test_filter_coefficients_finite() {
        let gen = seeded();
        for freq in [0.0, 20.0, 100.0, 1000.0, 11025.0, 22050.0] {
            let (a0, b0) = gen.filter_coefficients(freq);
            assert!(a0.is_finite() && b0.is_finite(), "freq {}", freq);
            assert!(a0 >= 0.0);
        }
    }

    #[test]
    fn test_silent_at_zero_gain() {
        let mut gen = seeded();
        let mut buf = vec![1.0f32; 64];
        gen.generate(&mut buf, 32);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_zero_frames_is_noop() {
        let mut gen = seeded();
        gen.controls().set_gain(1.0);
        let mut buf = vec![7i16; 8];
        gen.generate(&mut buf, 0);
        assert!(buf.iter().all(|&s| s == 7));
        assert_eq!(gen.current_gain(), 0.0);
    }

    #[test]
    fn test_short_buffer_not_overrun() {
        let mut gen = seeded();
        gen.controls().set_gain(1.0);
        let mut buf = vec![0.0f32; 5];
        gen.generate(&mut buf, 100);
        // only two whole frames fit; the odd trailing slot is untouched
        assert_eq!(buf[4], 0.0);
    }

    #[test]
    fn test_gain_slews_not_jumps() {
        let mut gen = seeded();
        gen.controls().set_gain(1.0);
        let mut buf = vec![0.0f32; 4];
        gen.generate(&mut buf, 2);
        // one synthesized sample at 0.1%
        assert!((gen.current_gain() - SLEW_RATE).abs() < 1e-7);
    }

    #[test]
    fn test_small_frequency_change_snaps() {
        let mut gen = seeded();
        gen.controls().set_frequency(105.0);
        let mut buf = vec![0.0f32; 4];
        gen.generate(&mut buf, 2);
        assert_eq!(gen.current_frequency(), 105.0);
    }

    #[test]
    fn test_large_frequency_change_ramps() {
        let mut gen = seeded();
        gen.controls().set_frequency(400.0);
        let mut buf = vec![0.0f32; 20];
        gen.generate(&mut buf, 10);
        let freq = gen.current_frequency();
        assert!(freq > DEFAULT_FREQUENCY && freq < 400.0, "freq {}", freq);
    }

    #[test]
    fn test_pan_controls_clamped() {
        let controls = WindControls::new();
        controls.set_pan_right(3.0);
        assert_eq!(controls.snapshot().pan_right, 1.0);
        controls.set_pan_right(-1.0);
        assert_eq!(controls.snapshot().pan_right, 0.0);
    }

    #[test]
    fn test_full_right_pan_silences_left() {
        let mut gen = seeded();
        let controls = gen.controls();
        controls.set_gain(1.0);
        controls.set_pan_right(1.0);
        let mut buf = vec![0.0f32; 2 * 44100];
        gen.generate(&mut buf, 44100);
        // after the pan has settled, left carries only the residual share
        let tail = &buf[buf.len() - 200..];
        let left_peak = tail.iter().step_by(2).fold(0.0f32, |m, s| m.max(s.abs()));
        let right_peak = tail.iter().skip(1).step_by(2).fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(left_peak <= right_peak * 0.01 + 1e-6, "left {} right {}", left_peak, right_peak);
    }

    #[test]
    fn test_generate_bytes_s16() {
        let mut gen = seeded();
        gen.controls().set_gain(1.0);
        let mut bytes = vec![0u8; 4 * 128];
        let frames = gen.generate_bytes(&mut bytes, MixFormat::Stereo16).unwrap();
        assert_eq!(frames, 128);
    }

    #[test]
    fn test_generate_bytes_rejects_bad_buffers() {
        let mut gen = seeded();
        assert!(matches!(
            gen.generate_bytes(&mut [], MixFormat::Stereo16),
            Err(WindError::InvalidArgument(_))
        ));
        let mut odd = vec![0u8; 7];
        assert!(gen.generate_bytes(&mut odd, MixFormat::StereoFloat32).is_err());
    }

    #[test]
    fn test_generate_bytes_f32_matches_typed() {
        let config = WindConfig::default();
        let mut typed = WindGenerator::with_seed(config, 3);
        let mut raw = WindGenerator::with_seed(config, 3);
        typed.controls().set_gain(0.8);
        raw.controls().set_gain(0.8);

        let mut samples = vec![0.0f32; 2 * 64];
        typed.generate(&mut samples, 64);

        let mut bytes = vec![0u8; 8 * 64];
        raw.generate_bytes(&mut bytes, MixFormat::StereoFloat32).unwrap();

        let mut decoded = vec![0.0f32; 2 * 64];
        LittleEndian::read_f32_into(&bytes, &mut decoded);
        assert_eq!(samples, decoded);
    }
}
