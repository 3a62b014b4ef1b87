//! Gesture playback state machine
//!
//! A playing gesture runs steps back to back until it reaches one that has to
//! wait: on a timer, on the animations it started, or (after the last step)
//! on every outstanding animation before going idle. `update` is called once
//! per tick with the time since the previous tick.

use std::collections::BTreeSet;
use std::time::Duration;

use uuid::Uuid;

use super::step::{GestureStep, WaitStep};
use super::types::{AnimRequest, GestureError, StepEffects, DEFAULT_ANIM_WAIT_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    /// Running steps; never observed between ticks
    Advancing,
    WaitingAnimations,
    WaitingTimer,
    /// All steps ran; holding until started animations stop
    WaitingAtEnd,
}

impl PlaybackState {
    pub fn is_playing(self) -> bool {
        self != PlaybackState::Idle
    }
}

/// Runtime state of one gesture
#[derive(Debug, Clone)]
pub struct GesturePlayback {
    state: PlaybackState,
    current_step: usize,
    /// Time spent in the current wait
    wait_elapsed: Duration,
    anim_wait_timeout: Option<Duration>,
    requested: BTreeSet<Uuid>,
    playing: BTreeSet<Uuid>,
}

impl Default for GesturePlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl GesturePlayback {
    pub fn new() -> Self {
        Self::with_timeout(Some(DEFAULT_ANIM_WAIT_TIMEOUT))
    }

    /// `None` waits on animations forever
    pub fn with_timeout(anim_wait_timeout: Option<Duration>) -> Self {
        Self {
            state: PlaybackState::Idle,
            current_step: 0,
            wait_elapsed: Duration::ZERO,
            anim_wait_timeout,
            requested: BTreeSet::new(),
            playing: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn anim_wait_timeout(&self) -> Option<Duration> {
        self.anim_wait_timeout
    }

    pub fn set_anim_wait_timeout(&mut self, timeout: Option<Duration>) {
        self.anim_wait_timeout = timeout;
    }

    /// Animations asked for but not yet confirmed as started
    pub fn requested_animations(&self) -> impl Iterator<Item = &Uuid> {
        self.requested.iter()
    }

    pub fn playing_animations(&self) -> impl Iterator<Item = &Uuid> {
        self.playing.iter()
    }

    fn animations_done(&self) -> bool {
        self.requested.is_empty() && self.playing.is_empty()
    }

    fn wait_timed_out(&self) -> bool {
        matches!(self.anim_wait_timeout, Some(limit) if self.wait_elapsed >= limit)
    }

    fn enter(&mut self, state: PlaybackState) {
        self.state = state;
        self.wait_elapsed = Duration::ZERO;
    }

    fn advance(&mut self) {
        self.current_step += 1;
        self.state = PlaybackState::Advancing;
    }

    /// Start from the first step. A gesture that is already playing restarts.
    pub fn trigger(&mut self) {
        self.current_step = 0;
        self.requested.clear();
        self.playing.clear();
        self.enter(PlaybackState::Advancing);
    }

    /// Force idle without sending any stop requests
    pub fn reset(&mut self) {
        self.current_step = 0;
        self.requested.clear();
        self.playing.clear();
        self.enter(PlaybackState::Idle);
    }

    pub fn animation_started(&mut self, asset_id: Uuid) {
        if self.requested.remove(&asset_id) {
            self.playing.insert(asset_id);
        }
    }

    pub fn animation_stopped(&mut self, asset_id: Uuid) {
        self.requested.remove(&asset_id);
        self.playing.remove(&asset_id);
    }

    /// Run as far as possible and return the state to hold until next tick
    pub fn update(
        &mut self,
        steps: &[GestureStep],
        elapsed: Duration,
        effects: &mut dyn StepEffects,
    ) -> PlaybackState {
        if !self.is_playing() {
            return self.state;
        }
        self.wait_elapsed += elapsed;

        loop {
            match self.state {
                PlaybackState::Idle => break,
                PlaybackState::WaitingTimer => {
                    let wait = match steps.get(self.current_step) {
                        Some(GestureStep::Wait(wait)) => wait,
                        _ => {
                            // steps changed under us
                            self.advance();
                            continue;
                        }
                    };
                    if self.wait_elapsed.as_secs_f32() < wait.seconds {
                        break;
                    }
                    if wait.waits_for_animations() {
                        self.enter(PlaybackState::WaitingAnimations);
                    } else {
                        self.advance();
                    }
                }
                PlaybackState::WaitingAnimations => {
                    if self.animations_done() {
                        self.advance();
                    } else if self.wait_timed_out() {
                        log::info!(
                            "Waited {:.1}s for animations at step {}, continuing gesture",
                            self.wait_elapsed.as_secs_f32(),
                            self.current_step
                        );
                        self.advance();
                    } else {
                        break;
                    }
                }
                PlaybackState::WaitingAtEnd => {
                    if self.animations_done() {
                        self.enter(PlaybackState::Idle);
                    } else if self.wait_timed_out() {
                        log::info!(
                            "Waited {:.1}s for animations to stop, ending gesture",
                            self.wait_elapsed.as_secs_f32()
                        );
                        self.reset();
                    } else {
                        break;
                    }
                }
                PlaybackState::Advancing => match steps.get(self.current_step) {
                    Some(step) => self.run_step(step, effects),
                    None => self.enter(PlaybackState::WaitingAtEnd),
                },
            }
        }

        self.state
    }

    fn run_step(&mut self, step: &GestureStep, effects: &mut dyn StepEffects) {
        match step {
            GestureStep::Animation(anim) => {
                if anim.asset_id.is_nil() {
                    self.missing_asset("animation", &anim.name);
                } else if anim.is_stop() {
                    effects.request_animation(anim.asset_id, AnimRequest::Stop);
                    self.requested.remove(&anim.asset_id);
                } else {
                    effects.request_animation(anim.asset_id, AnimRequest::Start);
                    self.requested.insert(anim.asset_id);
                }
                self.advance();
            }
            GestureStep::Sound(sound) => {
                if sound.asset_id.is_nil() {
                    self.missing_asset("sound", &sound.name);
                } else {
                    effects.play_sound(sound.asset_id);
                }
                self.advance();
            }
            GestureStep::Chat(chat) => {
                if !chat.text.is_empty() {
                    effects.send_chat(&chat.text);
                }
                self.advance();
            }
            GestureStep::Wait(wait) => self.begin_wait(wait),
        }
    }

    fn begin_wait(&mut self, wait: &WaitStep) {
        if wait.waits_for_time() {
            self.enter(PlaybackState::WaitingTimer);
        } else if wait.waits_for_animations() {
            self.enter(PlaybackState::WaitingAnimations);
        } else {
            self.advance();
        }
    }

    fn missing_asset(&self, kind: &'static str, name: &str) {
        let err = GestureError::MissingAsset {
            kind,
            step: self.current_step,
            name: name.to_string(),
        };
        log::warn!("{}; skipping step", err);
    }
}
