//! Gesture library and playback driver
//!
//! Holds the loaded gestures, maps key bindings and chat triggers to them,
//! ticks every playing gesture and posts a [`GestureEvent`] when one starts,
//! finishes or is stopped.

use std::collections::BTreeMap;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, Sender};
use uuid::Uuid;

use super::multi::MultiGesture;
use super::player::PlaybackState;
use super::types::{AnimRequest, GestureEvent, GestureId, StepEffects, DEFAULT_ANIM_WAIT_TIMEOUT};

/// Key value meaning "no key bound"
pub const KEY_NONE: u8 = 0;

pub struct GestureManager {
    gestures: BTreeMap<GestureId, MultiGesture>,
    next_id: u32,
    anim_wait_timeout: Option<Duration>,
    events_tx: Sender<GestureEvent>,
    events_rx: Receiver<GestureEvent>,
}

impl Default for GestureManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureManager {
    pub fn new() -> Self {
        Self::with_timeout(Some(DEFAULT_ANIM_WAIT_TIMEOUT))
    }

    pub fn with_timeout(anim_wait_timeout: Option<Duration>) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            gestures: BTreeMap::new(),
            next_id: 1,
            anim_wait_timeout,
            events_tx,
            events_rx,
        }
    }

    /// Receiver for playback events. Every clone shares one queue.
    pub fn events(&self) -> Receiver<GestureEvent> {
        self.events_rx.clone()
    }

    fn post(&self, event: GestureEvent) {
        // the manager holds a receiver, so the channel never disconnects
        let _ = self.events_tx.send(event);
    }

    pub fn anim_wait_timeout(&self) -> Option<Duration> {
        self.anim_wait_timeout
    }

    /// Applies to loaded gestures and to those added later
    pub fn set_anim_wait_timeout(&mut self, timeout: Option<Duration>) {
        self.anim_wait_timeout = timeout;
        for gesture in self.gestures.values_mut() {
            gesture.set_anim_wait_timeout(timeout);
        }
    }

    pub fn add(&mut self, mut gesture: MultiGesture) -> GestureId {
        let id = GestureId(self.next_id);
        self.next_id += 1;
        gesture.set_anim_wait_timeout(self.anim_wait_timeout);
        log::debug!("Added {} '{}' with {} steps", id, gesture.name, gesture.steps.len());
        self.gestures.insert(id, gesture);
        id
    }

    /// Drop a gesture. A playing gesture is reset without stop requests;
    /// call [`stop`](Self::stop) first to end its animations.
    pub fn remove(&mut self, id: GestureId) -> Option<MultiGesture> {
        let mut gesture = self.gestures.remove(&id)?;
        gesture.reset();
        Some(gesture)
    }

    pub fn get(&self, id: GestureId) -> Option<&MultiGesture> {
        self.gestures.get(&id)
    }

    pub fn get_mut(&mut self, id: GestureId) -> Option<&mut MultiGesture> {
        self.gestures.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = GestureId> + '_ {
        self.gestures.keys().copied()
    }

    pub fn is_playing(&self, id: GestureId) -> bool {
        self.gestures.get(&id).is_some_and(MultiGesture::is_playing)
    }

    /// Start (or restart) a gesture. Returns false for an unknown id.
    pub fn play(&mut self, id: GestureId) -> bool {
        let Some(gesture) = self.gestures.get_mut(&id) else {
            log::warn!("Cannot play unknown {}", id);
            return false;
        };
        gesture.trigger();
        self.post(GestureEvent::Started(id));
        true
    }

    /// Stop a playing gesture, asking every animation it started to stop
    pub fn stop(&mut self, id: GestureId, effects: &mut dyn StepEffects) -> bool {
        let Some(gesture) = self.gestures.get_mut(&id) else {
            return false;
        };
        if !gesture.is_playing() {
            return false;
        }
        let playback = gesture.playback();
        let outstanding: Vec<Uuid> = playback
            .requested_animations()
            .chain(playback.playing_animations())
            .copied()
            .collect();
        for asset_id in outstanding {
            effects.request_animation(asset_id, AnimRequest::Stop);
        }
        gesture.reset();
        self.post(GestureEvent::Stopped(id));
        true
    }

    /// Play the first gesture bound to exactly this key and modifier mask
    pub fn trigger_by_key(&mut self, key: u8, mask: u32) -> bool {
        if key == KEY_NONE {
            return false;
        }
        let found = self
            .gestures
            .iter()
            .find(|(_, gesture)| gesture.key == key && gesture.mask == mask)
            .map(|(id, _)| *id);
        match found {
            Some(id) => self.play(id),
            None => false,
        }
    }

    fn find_trigger(&self, token: &str) -> Option<(GestureId, &MultiGesture)> {
        self.gestures
            .iter()
            .find(|(_, gesture)| !gesture.trigger.is_empty() && same_word(&gesture.trigger, token))
            .map(|(id, gesture)| (*id, gesture))
    }

    /// Play the gesture triggered by the first matching word of `text` and
    /// return the chat text with that word replaced.
    ///
    /// Only one gesture plays per call. A gesture with no replacement text
    /// removes its trigger word; otherwise the replacement is substituted
    /// unless it differs from the typed word only in case.
    pub fn trigger_and_revise(&mut self, text: &str) -> (bool, String) {
        let mut matched = None;
        let mut revised: Vec<String> = Vec::new();

        for token in text.split(' ').filter(|token| !token.is_empty()) {
            if matched.is_none() {
                if let Some((id, gesture)) = self.find_trigger(token) {
                    matched = Some(id);
                    let replacement = &gesture.replace_text;
                    if same_word(replacement, token) {
                        revised.push(token.to_string());
                    } else if !replacement.is_empty() {
                        revised.push(replacement.clone());
                    }
                    continue;
                }
            }
            revised.push(token.to_string());
        }

        match matched {
            Some(id) => {
                log::debug!("Chat text {:?} triggered {}", text, id);
                self.play(id);
                (true, revised.join(" "))
            }
            None => (false, revised.join(" ")),
        }
    }

    /// Tick every playing gesture; returns how many are still playing
    pub fn update(&mut self, elapsed: Duration, effects: &mut dyn StepEffects) -> usize {
        let mut finished = Vec::new();
        let mut playing = 0;
        for (id, gesture) in self.gestures.iter_mut() {
            if !gesture.is_playing() {
                continue;
            }
            if gesture.update(elapsed, effects) == PlaybackState::Idle {
                finished.push(*id);
            } else {
                playing += 1;
            }
        }
        for id in finished {
            log::debug!("{} finished", id);
            self.post(GestureEvent::Finished(id));
        }
        playing
    }

    pub fn animation_started(&mut self, asset_id: Uuid) {
        for gesture in self.gestures.values_mut().filter(|g| g.is_playing()) {
            gesture.animation_started(asset_id);
        }
    }

    pub fn animation_stopped(&mut self, asset_id: Uuid) {
        for gesture in self.gestures.values_mut().filter(|g| g.is_playing()) {
            gesture.animation_stopped(asset_id);
        }
    }
}

fn same_word(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::player::tests::Recorder;
    use crate::gesture::step::{AnimationStep, ChatStep, WaitStep};
    use rstest::rstest;

    const DANCE: Uuid = Uuid::from_u128(0xD);

    fn manager() -> (GestureManager, GestureId, GestureId) {
        let mut mgr = GestureManager::new();
        let hello = mgr.add(
            MultiGesture::new("hello")
                .with_trigger("/hi", "Hello there!")
                .with_key(b'H', 1)
                .with_step(ChatStep::new("waves")),
        );
        let dance = mgr.add(
            MultiGesture::new("dance")
                .with_trigger("/dance", "")
                .with_step(AnimationStep::new("dance", DANCE))
                .with_step(WaitStep::all_animations()),
        );
        (mgr, hello, dance)
    }

    #[rstest]
    #[case("/hi everyone", true, "Hello there! everyone")]
    #[case("well /HI", true, "well Hello there!")]
    #[case("/dance now", true, "now")]
    #[case("oh  /dance  ok", true, "oh ok")]
    #[case("nothing here", false, "nothing here")]
    #[case("", false, "")]
    fn test_trigger_and_revise(#[case] input: &str, #[case] found: bool, #[case] expected: &str) {
        let (mut mgr, _, _) = manager();
        assert_eq!(mgr.trigger_and_revise(input), (found, expected.to_string()));
    }

    #[test]
    fn test_only_first_trigger_plays() {
        let (mut mgr, hello, dance) = manager();
        let (found, text) = mgr.trigger_and_revise("/dance /hi");
        assert!(found);
        assert_eq!(text, "/hi");
        assert!(mgr.is_playing(dance));
        assert!(!mgr.is_playing(hello));
    }

    #[test]
    fn test_replacement_keeps_user_case() {
        let mut mgr = GestureManager::new();
        mgr.add(MultiGesture::new("lol").with_trigger("lol", "LOL"));
        assert_eq!(mgr.trigger_and_revise("lol"), (true, "lol".to_string()));
    }

    #[test]
    fn test_trigger_by_key() {
        let (mut mgr, hello, _) = manager();
        assert!(!mgr.trigger_by_key(b'H', 0));
        assert!(!mgr.trigger_by_key(KEY_NONE, 0));
        assert!(mgr.trigger_by_key(b'H', 1));
        assert!(mgr.is_playing(hello));
    }

    #[test]
    fn test_events() {
        let (mut mgr, hello, dance) = manager();
        let events = mgr.events();
        let mut fx = Recorder::default();

        mgr.play(hello);
        mgr.play(dance);
        assert_eq!(mgr.update(Duration::from_millis(50), &mut fx), 1);
        assert!(mgr.stop(dance, &mut fx));
        assert!(!mgr.stop(dance, &mut fx));

        let received: Vec<GestureEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                GestureEvent::Started(hello),
                GestureEvent::Started(dance),
                GestureEvent::Finished(hello),
                GestureEvent::Stopped(dance),
            ]
        );
        assert_eq!(fx.calls, vec!["Chat waves", "Start 13", "Stop 13"]);
    }

    #[test]
    fn test_animation_events_fan_out() {
        let (mut mgr, _, dance) = manager();
        let mut fx = Recorder::default();
        mgr.play(dance);
        mgr.update(Duration::ZERO, &mut fx);

        mgr.animation_started(DANCE);
        assert_eq!(mgr.update(Duration::ZERO, &mut fx), 1);
        mgr.animation_stopped(DANCE);
        assert_eq!(mgr.update(Duration::ZERO, &mut fx), 0);
        assert!(!mgr.is_playing(dance));
    }

    #[test]
    fn test_timeout_applies_to_added_gestures() {
        let mut mgr = GestureManager::with_timeout(None);
        let id = mgr.add(MultiGesture::new("x"));
        assert_eq!(mgr.get(id).unwrap().playback().anim_wait_timeout(), None);

        mgr.set_anim_wait_timeout(Some(Duration::from_secs(5)));
        assert_eq!(
            mgr.get(id).unwrap().playback().anim_wait_timeout(),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_remove_and_unknown_ids() {
        let (mut mgr, hello, _) = manager();
        mgr.play(hello);
        let removed = mgr.remove(hello).unwrap();
        assert!(!removed.is_playing());
        assert!(mgr.remove(hello).is_none());
        assert!(!mgr.play(hello));
        assert!(!mgr.is_playing(hello));
        assert_eq!(mgr.len(), 1);
    }
}
