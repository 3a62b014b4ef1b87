use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use uuid::Uuid;

use viewer_rust::anim::InterpolantCache;
use viewer_rust::cli::{Cli, Command};
use viewer_rust::config::{self, Options};
use viewer_rust::gesture::{
    AnimRequest, AnimationStep, ChatStep, GestureEvent, GestureManager, MultiGesture, SoundStep,
    StepEffects, WaitStep,
};
use viewer_rust::logging;
use viewer_rust::sound::{MixFormat, WindGenerator};

/// Frames rendered per wind buffer
const WIND_CHUNK_FRAMES: usize = 1024;

/// How long a simulated animation runs before it stops on its own
const SIM_ANIM_LENGTH: Duration = Duration::from_millis(1200);

/// Blend-in half-life for simulated animations, in seconds
const SIM_BLEND_HALF_LIFE: f32 = 0.15;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = config::load_config(cli.config.as_deref())?;
    let options = cli.merge_into_options(options)?;

    logging::init_logging(options.log_level);
    log::debug!("Options: {:?}", options);

    match &cli.command {
        Command::Wind {
            seconds,
            gain,
            freq,
            pan,
            seed,
            out,
        } => render_wind(&options, *seconds, *gain, *freq, *pan, *seed, out),
        Command::Dump { file } => dump_gesture(file),
        Command::Play {
            file,
            tick_ms,
            max_seconds,
        } => play_gesture(&options, file, *tick_ms, *max_seconds),
        Command::Demo { out } => write_demo(out),
    }
}

fn render_wind(
    options: &Options,
    seconds: f32,
    gain: f32,
    freq: f32,
    pan: f32,
    seed: Option<u64>,
    out: &Path,
) -> Result<()> {
    if !seconds.is_finite() || seconds <= 0.0 {
        anyhow::bail!("--seconds must be positive");
    }

    let config = options.wind_config();
    let mut generator = match seed {
        Some(seed) => WindGenerator::with_seed(config, seed),
        None => WindGenerator::with_config(config),
    };
    let controls = generator.controls();
    controls.set_gain(gain);
    controls.set_frequency(freq);
    controls.set_pan_right(pan);

    let format = options.sample_format;
    let total_frames = (seconds * options.sample_rate as f32).round() as usize;
    let file = File::create(out).with_context(|| format!("Failed to create {}", out.display()))?;
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; WIND_CHUNK_FRAMES * format.frame_size()];

    let mut written = 0;
    while written < total_frames {
        let frames = WIND_CHUNK_FRAMES.min(total_frames - written);
        let bytes = &mut buffer[..frames * format.frame_size()];
        generator.generate_bytes(bytes, format)?;
        writer.write_all(bytes)?;
        written += frames;
    }
    writer.flush()?;

    log::info!(
        "Wrote {} frames of {} stereo at {} Hz to {}",
        written,
        format.name(),
        options.sample_rate,
        out.display()
    );
    println!(
        "{}: {} frames, {} Hz, {} interleaved stereo (final gain {:.3})",
        out.display(),
        written,
        options.sample_rate,
        match format {
            MixFormat::Stereo16 => "16-bit",
            MixFormat::StereoFloat32 => "32-bit float",
        },
        generator.current_gain()
    );
    Ok(())
}

fn load_gesture(path: &Path) -> Result<MultiGesture> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gesture".to_string());
    MultiGesture::from_bytes(name, &data)
        .with_context(|| format!("Failed to load gesture {}", path.display()))
}

fn dump_gesture(path: &Path) -> Result<()> {
    let gesture = load_gesture(path)?;
    print!("{}", gesture.dump());
    Ok(())
}

/// Stand-in for the avatar: animations start on the tick after they are
/// requested and stop after a fixed run time.
struct SimulatedAvatar {
    clock: Duration,
    to_start: Vec<Uuid>,
    to_stop: Vec<Uuid>,
    /// Running animations: end time and blend weight
    running: HashMap<Uuid, (Duration, f32)>,
}

impl SimulatedAvatar {
    fn new() -> Self {
        Self {
            clock: Duration::ZERO,
            to_start: Vec::new(),
            to_stop: Vec::new(),
            running: HashMap::new(),
        }
    }

    /// Apply this tick's requests and report confirmations to the manager
    fn settle(&mut self, manager: &mut GestureManager, damping: &mut InterpolantCache) {
        for asset_id in self.to_start.drain(..) {
            self.running.insert(asset_id, (self.clock + SIM_ANIM_LENGTH, 0.0));
            manager.animation_started(asset_id);
        }

        let clock = self.clock;
        let mut finished: Vec<Uuid> = self
            .running
            .iter()
            .filter(|(_, (end, _))| *end <= clock)
            .map(|(id, _)| *id)
            .collect();
        finished.append(&mut self.to_stop);

        for asset_id in finished {
            if self.running.remove(&asset_id).is_some() {
                log::info!("animation {} stopped", asset_id);
            }
            manager.animation_stopped(asset_id);
        }

        for (asset_id, (_, weight)) in self.running.iter_mut() {
            *weight = damping.damp_toward(*weight, 1.0, SIM_BLEND_HALF_LIFE);
            log::trace!("animation {} weight {:.3}", asset_id, weight);
        }
    }
}

impl StepEffects for SimulatedAvatar {
    fn request_animation(&mut self, asset_id: Uuid, request: AnimRequest) {
        match request {
            AnimRequest::Start => {
                log::info!("start animation {}", asset_id);
                self.to_start.push(asset_id);
            }
            AnimRequest::Stop => {
                log::info!("stop animation {}", asset_id);
                self.to_stop.push(asset_id);
            }
        }
    }

    fn play_sound(&mut self, asset_id: Uuid) {
        println!("[{:>7.2}s] sound {}", self.clock.as_secs_f32(), asset_id);
    }

    fn send_chat(&mut self, text: &str) {
        println!("[{:>7.2}s] chat: {}", self.clock.as_secs_f32(), text);
    }
}

fn play_gesture(options: &Options, path: &Path, tick_ms: u64, limit: Duration) -> Result<()> {
    if tick_ms == 0 {
        anyhow::bail!("--tick-ms must be at least 1");
    }
    let gesture = load_gesture(path)?;
    let tick = Duration::from_millis(tick_ms);

    let mut manager = GestureManager::with_timeout(options.anim_wait_timeout);
    let events = manager.events();
    let id = manager.add(gesture);
    manager.play(id);

    let mut avatar = SimulatedAvatar::new();
    let mut damping = InterpolantCache::new();
    let mut done = false;

    while !done && avatar.clock <= limit {
        damping.refresh_with_delta(tick);
        manager.update(tick, &mut avatar);
        avatar.settle(&mut manager, &mut damping);

        for event in events.try_iter() {
            match event {
                GestureEvent::Started(id) => {
                    println!("[{:>7.2}s] {} started", avatar.clock.as_secs_f32(), id)
                }
                GestureEvent::Finished(id) | GestureEvent::Stopped(id) => {
                    println!("[{:>7.2}s] {} finished", avatar.clock.as_secs_f32(), id);
                    done = true;
                }
            }
        }
        avatar.clock += tick;
    }

    if !done {
        log::warn!("Gesture still playing after {:.1}s; stopping it", limit.as_secs_f32());
        manager.stop(id, &mut avatar);
    }
    Ok(())
}

fn demo_gesture() -> MultiGesture {
    let wave = Uuid::from_u128(0x6b7a_1c2e_0d4f_4a51_9e0b_3c57_a9d2_4f10);
    let chime = Uuid::from_u128(0x0f3e_88a0_5c1d_4b7e_a2f4_71c9_d06b_e835);
    MultiGesture::new("demo")
        .with_trigger("/wave", "Hi everyone!")
        .with_key(b'W', 0)
        .with_step(AnimationStep::new("hello", wave))
        .with_step(SoundStep::new("chime", chime))
        .with_step(WaitStep::timed(0.5))
        .with_step(ChatStep::new("waves"))
        .with_step(WaitStep::all_animations())
        .with_step(AnimationStep::stopping("hello", wave))
}

fn write_demo(out: &Path) -> Result<()> {
    let gesture = demo_gesture();
    let bytes = gesture.serialize_to_vec()?;
    fs::write(out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("{}: {} bytes, {} steps", out.display(), bytes.len(), gesture.steps.len());
    Ok(())
}
