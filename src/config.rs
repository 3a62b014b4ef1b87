use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::gesture::types::DEFAULT_ANIM_WAIT_TIMEOUT;
use crate::logging::LogLevel;
use crate::propfile::PropertyFile;
use crate::sound::wind::{
    WindConfig, DEFAULT_FILTER_BANDWIDTH, DEFAULT_SAMPLE_RATE, DEFAULT_SUB_SAMPLES,
};
use crate::sound::MixFormat;

/// Keys understood in the config file
pub const CONFIG_KEYS: [&str; 6] = [
    "sample_rate",
    "sub_samples",
    "filter_bandwidth",
    "sample_format",
    "anim_wait_timeout",
    "log_level",
];

/// Application options that can be set via CLI or config file
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub sample_rate: u32,
    pub sub_samples: u32,
    pub filter_bandwidth: f32,
    pub sample_format: MixFormat,
    /// `None` waits on gesture animations forever
    pub anim_wait_timeout: Option<Duration>,
    pub log_level: LogLevel,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            sub_samples: DEFAULT_SUB_SAMPLES,
            filter_bandwidth: DEFAULT_FILTER_BANDWIDTH,
            sample_format: MixFormat::default(),
            anim_wait_timeout: Some(DEFAULT_ANIM_WAIT_TIMEOUT),
            log_level: LogLevel::default(),
        }
    }
}

impl Options {
    /// Wind generator parameters from these options
    pub fn wind_config(&self) -> WindConfig {
        WindConfig {
            sample_rate: self.sample_rate,
            sub_samples: self.sub_samples,
            filter_bandwidth: self.filter_bandwidth,
        }
    }

    /// Apply settings from a parsed property file
    pub fn apply_properties(&mut self, props: &PropertyFile) -> Result<()> {
        for key in props.keys() {
            if !CONFIG_KEYS.contains(&key) {
                log::warn!("Ignoring unknown config key '{}'", key);
            }
        }

        if let Some(value) = props.get("sample_rate") {
            self.sample_rate = parse_sample_rate(value)?;
        }
        if let Some(value) = props.get("sub_samples") {
            self.sub_samples = parse_sub_samples(value)?;
        }
        if let Some(value) = props.get("filter_bandwidth") {
            self.filter_bandwidth = parse_bandwidth(value)?;
        }
        if let Some(value) = props.get("sample_format") {
            self.sample_format = parse_sample_format(value)?;
        }
        if let Some(value) = props.get("anim_wait_timeout") {
            self.anim_wait_timeout = parse_timeout(value)?;
        }
        if let Some(value) = props.get("log_level") {
            self.log_level = parse_log_level(value)?;
        }
        Ok(())
    }
}

/// Load configuration from a property file, or defaults when no path is given
pub fn load_config(path: Option<&Path>) -> Result<Options> {
    let mut options = Options::default();
    let Some(path) = path else {
        return Ok(options);
    };

    let props = PropertyFile::load(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    options
        .apply_properties(&props)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(options)
}

/// Parse an output sample rate in Hz
pub fn parse_sample_rate(s: &str) -> Result<u32> {
    let rate: u32 = s.trim().parse().context("Invalid sample rate")?;
    if !(8000..=192_000).contains(&rate) {
        anyhow::bail!("Sample rate out of range (8000 to 192000)");
    }
    Ok(rate)
}

/// Parse the number of output frames per synthesized sample
pub fn parse_sub_samples(s: &str) -> Result<u32> {
    let sub: u32 = s.trim().parse().context("Invalid sub-sample count")?;
    if sub == 0 || sub > 16 {
        anyhow::bail!("Sub-sample count out of range (1 to 16)");
    }
    Ok(sub)
}

/// Parse the resonant filter bandwidth in Hz
pub fn parse_bandwidth(s: &str) -> Result<f32> {
    let bw: f32 = s.trim().parse().context("Invalid filter bandwidth")?;
    if !bw.is_finite() || bw <= 0.0 {
        anyhow::bail!("Filter bandwidth must be positive");
    }
    Ok(bw)
}

pub fn parse_sample_format(s: &str) -> Result<MixFormat> {
    MixFormat::from_name(s.trim())
        .ok_or_else(|| anyhow::anyhow!("Invalid sample format: {}. Valid options: s16, f32", s))
}

/// Convert a count of seconds to a `Duration`, rejecting values it cannot hold
pub fn seconds_to_duration(secs: f32, what: &str) -> Result<Duration> {
    if secs.is_nan() || secs < 0.0 {
        anyhow::bail!("{} must be zero or positive", what);
    }
    Duration::try_from_secs_f32(secs)
        .with_context(|| format!("{} of {} seconds is too long", what, secs))
}

/// Parse an animation wait timeout in seconds; 0 disables the timeout
pub fn parse_timeout(s: &str) -> Result<Option<Duration>> {
    let secs: f32 = s.trim().parse().context("Invalid animation wait timeout")?;
    if secs == 0.0 {
        return Ok(None);
    }
    seconds_to_duration(secs, "Animation wait timeout").map(Some)
}

/// Parse a simulated playback limit in seconds
pub fn parse_play_limit(s: &str) -> Result<Duration> {
    let secs: f32 = s.trim().parse().context("Invalid playback limit")?;
    seconds_to_duration(secs, "Playback limit")
}

/// Parse a numeric log level (0-6)
pub fn parse_log_level(s: &str) -> Result<LogLevel> {
    let level: i32 = s.trim().parse().context("Invalid log level")?;
    if !(0..=6).contains(&level) {
        anyhow::bail!("Log level out of range (0 to 6)");
    }
    Ok(LogLevel::from_i32(level))
}
