use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{
    parse_log_level, parse_play_limit, parse_sample_format, parse_sample_rate, parse_timeout,
    Options,
};

/// Viewer audio and gesture tools
#[derive(Parser, Debug)]
#[command(name = "viewer")]
#[command(version)]
#[command(about = "Render wind noise and inspect or play gesture assets", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (0 = nothing .. 6 = everything)
    #[arg(short, long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Output sample rate in Hz
    #[arg(long, value_name = "HZ", global = true)]
    pub sample_rate: Option<String>,

    /// Output sample format (s16, f32)
    #[arg(short, long, value_name = "FORMAT", global = true)]
    pub format: Option<String>,

    /// Seconds a gesture waits on animations before moving on (0 = forever)
    #[arg(long, value_name = "SECONDS", global = true)]
    pub anim_timeout: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Render wind noise to a raw interleaved stereo PCM file
    Wind {
        /// Length of the render in seconds
        #[arg(long, default_value_t = 5.0)]
        seconds: f32,

        /// Target gain
        #[arg(long, default_value_t = 1.0)]
        gain: f32,

        /// Target center frequency in Hz
        #[arg(long, default_value_t = 100.0)]
        freq: f32,

        /// Right-channel share (0 = left, 1 = right)
        #[arg(long, default_value_t = 0.5)]
        pan: f32,

        /// Noise seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Print the bindings and steps of a gesture asset
    Dump {
        file: PathBuf,
    },

    /// Play a gesture asset against a simulated avatar
    Play {
        file: PathBuf,

        /// Simulated tick length in milliseconds
        #[arg(long, default_value_t = 50)]
        tick_ms: u64,

        /// Give up after this many simulated seconds
        #[arg(long, value_name = "SECONDS", default_value = "120", value_parser = parse_play_limit)]
        max_seconds: Duration,
    },

    /// Write a sample gesture asset
    Demo {
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        if let Some(ref level) = self.log_level {
            opts.log_level = parse_log_level(level).context("Invalid --log-level")?;
        }

        if let Some(ref rate) = self.sample_rate {
            opts.sample_rate = parse_sample_rate(rate).context("Invalid --sample-rate")?;
        }

        if let Some(ref format) = self.format {
            opts.sample_format = parse_sample_format(format)?;
        }

        if let Some(ref timeout) = self.anim_timeout {
            opts.anim_wait_timeout = parse_timeout(timeout).context("Invalid --anim-timeout")?;
        }

        Ok(opts)
    }
}
