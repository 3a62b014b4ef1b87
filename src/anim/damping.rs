//! Critical-damping interpolants for animation blending.
//!
//! Blenders ask for the per-frame factor that moves a value toward its target
//! with a given half-life. The factor depends only on the half-life and the
//! frame delta, so it is computed once per distinct half-life per frame and
//! cached.
//!
//! The cache belongs to whoever drives the frame loop and must be refreshed
//! exactly once per tick, before any blender reads from it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DampingError {
    #[error("Invalid time constant: {0}")]
    InvalidArgument(f32),
}

/// Result type for damping operations
pub type DampingResult<T> = Result<T, DampingError>;

#[derive(Debug, Clone, Copy)]
struct CachedInterpolant {
    generation: u64,
    value: f32,
}

/// Per-frame interpolant cache
#[derive(Debug)]
pub struct InterpolantCache {
    /// Seconds between the last two refreshes
    time_delta: f32,
    /// Bumped on every refresh; entries stamped with an older one are stale
    generation: u64,
    last_refresh: Instant,
    entries: HashMap<u32, CachedInterpolant>,
}

impl Default for InterpolantCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpolantCache {
    pub fn new() -> Self {
        Self {
            time_delta: 0.0,
            generation: 0,
            last_refresh: Instant::now(),
            entries: HashMap::new(),
        }
    }

    /// Start a new frame using wall-clock time elapsed since the previous
    /// refresh (or since construction).
    pub fn refresh(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refresh);
        self.last_refresh = now;
        self.apply_delta(elapsed.as_secs_f32());
    }

    /// Start a new frame with an explicit simulation delta
    pub fn refresh_with_delta(&mut self, delta: Duration) {
        self.last_refresh = Instant::now();
        self.apply_delta(delta.as_secs_f32());
    }

    fn apply_delta(&mut self, seconds: f32) {
        self.time_delta = seconds;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Seconds elapsed between the two most recent refreshes
    pub fn time_delta(&self) -> f32 {
        self.time_delta
    }

    /// Number of distinct time constants seen so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Blend factor for `time_constant` (a half-life, in seconds) this frame:
    /// `clamp(1 - 2^(-dt / time_constant), 0, 1)`.
    ///
    /// A time constant of zero snaps (returns 1) without touching the cache.
    /// Negative and NaN time constants are rejected.
    pub fn try_interpolant(&mut self, time_constant: f32, use_cache: bool) -> DampingResult<f32> {
        if time_constant.is_nan() || time_constant < 0.0 {
            return Err(DampingError::InvalidArgument(time_constant));
        }
        if time_constant == 0.0 {
            return Ok(1.0);
        }

        // -0.0 was handled above, so the bit pattern is a stable key
        let key = time_constant.to_bits();
        if use_cache {
            if let Some(cached) = self.entries.get(&key) {
                if cached.generation == self.generation {
                    return Ok(cached.value);
                }
            }
        }

        let value = compute_interpolant(self.time_delta, time_constant);
        if use_cache {
            self.entries.insert(
                key,
                CachedInterpolant {
                    generation: self.generation,
                    value,
                },
            );
        }
        Ok(value)
    }

    /// Like [`try_interpolant`](Self::try_interpolant), but an invalid time
    /// constant is logged and treated as a snap.
    pub fn interpolant(&mut self, time_constant: f32, use_cache: bool) -> f32 {
        match self.try_interpolant(time_constant, use_cache) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("{}; snapping to target", err);
                1.0
            }
        }
    }

    /// Move `current` toward `target` by this frame's interpolant
    pub fn damp_toward(&mut self, current: f32, target: f32, time_constant: f32) -> f32 {
        let t = self.interpolant(time_constant, true);
        lerp(current, target, t)
    }
}

fn compute_interpolant(time_delta: f32, time_constant: f32) -> f32 {
    let value = 1.0 - (-time_delta / time_constant).exp2();
    if value.is_nan() {
        return 1.0;
    }
    value.clamp(0.0, 1.0)
}

/// Linear interpolation from `a` to `b` by `t`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn cache_with_delta(seconds: f32) -> InterpolantCache {
        let mut cache = InterpolantCache::new();
        cache.refresh_with_delta(Duration::from_secs_f32(seconds));
        cache
    }

    #[test]
    fn test_zero_time_constant_snaps() {
        let mut cache = cache_with_delta(0.5);
        assert_eq!(cache.interpolant(0.0, true), 1.0);
        assert_eq!(cache.interpolant(0.0, false), 1.0);
        assert_eq!(cache.interpolant(-0.0, true), 1.0);
        assert!(cache.is_empty());
    }

    #[rstest]
    #[case(1.0, 1.0, 0.5)]
    #[case(2.0, 1.0, 0.75)]
    #[case(1.0, 2.0, 1.0 - 0.5f32.sqrt())]
    #[case(0.0, 1.0, 0.0)]
    fn test_interpolant_formula(#[case] dt: f32, #[case] tc: f32, #[case] expected: f32) {
        let mut cache = cache_with_delta(dt);
        let value = cache.interpolant(tc, true);
        assert!((value - expected).abs() < 1e-5, "dt={} tc={} got {}", dt, tc, value);
    }

    #[test]
    fn test_cache_entry_reused_within_frame() {
        let mut cache = cache_with_delta(0.1);
        let first = cache.interpolant(0.25, true);
        assert_eq!(cache.len(), 1);
        let second = cache.interpolant(0.25, true);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_refresh_invalidates_entries() {
        let mut cache = cache_with_delta(0.1);
        let before = cache.interpolant(0.25, true);

        cache.refresh_with_delta(Duration::from_secs_f32(0.2));
        let after = cache.interpolant(0.25, true);

        assert!(after > before);
        assert!((after - (1.0 - (-0.2f32 / 0.25).exp2())).abs() < 1e-6);
        // entries are recomputed, never dropped
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_uncached_lookup_does_not_store() {
        let mut cache = cache_with_delta(0.1);
        cache.interpolant(0.3, false);
        assert!(cache.is_empty());
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f32::NAN)]
    #[case(f32::NEG_INFINITY)]
    fn test_invalid_time_constant(#[case] tc: f32) {
        let mut cache = cache_with_delta(0.1);
        assert!(matches!(
            cache.try_interpolant(tc, true),
            Err(DampingError::InvalidArgument(_))
        ));
        assert_eq!(cache.interpolant(tc, true), 1.0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_infinite_time_constant_never_moves() {
        let mut cache = cache_with_delta(0.1);
        assert_eq!(cache.interpolant(f32::INFINITY, true), 0.0);
    }

    #[test]
    fn test_wall_clock_refresh_records_delta() {
        let mut cache = InterpolantCache::new();
        std::thread::sleep(Duration::from_millis(5));
        cache.refresh();
        assert!(cache.time_delta() >= 0.004);
    }

    #[test]
    fn test_damp_toward() {
        let mut cache = cache_with_delta(1.0);
        let value = cache.damp_toward(0.0, 10.0, 1.0);
        assert!((value - 5.0).abs() < 1e-5);
        assert_eq!(cache.damp_toward(3.0, 10.0, 0.0), 10.0);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.0), 0.0);
        assert_eq!(lerp(0.0, 10.0, 1.0), 10.0);
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
    }

    proptest! {
        #[test]
        fn prop_interpolant_in_unit_range(tc in 1e-4f32..100.0, dt in 0.0f32..100.0) {
            let mut cache = cache_with_delta(dt);
            let value = cache.interpolant(tc, true);
            prop_assert!((0.0..=1.0).contains(&value));
        }

        #[test]
        fn prop_interpolant_monotonic_in_delta(
            tc in 1e-3f32..10.0,
            dt in 0.0f32..10.0,
            extra in 0.0f32..10.0,
        ) {
            let mut short = cache_with_delta(dt);
            let mut long = cache_with_delta(dt + extra);
            prop_assert!(short.interpolant(tc, true) <= long.interpolant(tc, true));
        }

        #[test]
        fn prop_interpolant_matches_formula(tc in 1e-2f32..10.0, dt in 0.0f32..1.0) {
            let mut cache = cache_with_delta(dt);
            let delta = cache.time_delta();
            let expected = 1.0 - 2f32.powf(-delta / tc);
            prop_assert!((cache.interpolant(tc, false) - expected).abs() < 1e-5);
        }
    }
}
