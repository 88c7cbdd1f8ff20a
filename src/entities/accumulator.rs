//! Temporal accumulation buffers for motion trails and persistent glow.
//!
//! Each logical target (one effect instance, or effect x tracked object)
//! owns one [`AccumulatorState`]: an RGBA buffer at video resolution that
//! survives across frames.
//!
//! Per frame:
//!
//! ```text
//! frame 0 ──> reset ──> buffer = contribution
//! frame N ──> alpha *= decay ──> blend(contribution, mode) ──> composite onto target
//! ```
//!
//! Only alpha decays. Color channels are left alone because fresh
//! contributions overwrite color through their own alpha; the side effect is
//! that stale color can sit under near-zero alpha indefinitely. That is the
//! shipped look, kept as is.
//!
//! [`TrailBank`] maps target identity to state: created on first reference,
//! erased when the object goes away, reallocated when the video resolution
//! changes.

use std::hash::Hash;

use glam::IVec2;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::compositor::{blend, BlendMode};
use super::frame::{PixelFormat, RasterBuffer};

/// Smallest decay accepted; keeps the factor inside (0, 1]
pub const MIN_DECAY: f32 = 1e-3;

/// Clamp a decay factor into (0, 1]. Non-finite values mean "no decay".
pub fn clamp_decay(decay: f32) -> f32 {
    if decay.is_finite() {
        decay.clamp(MIN_DECAY, 1.0)
    } else {
        1.0
    }
}

/// Maps a user-facing trail length to a per-frame alpha decay factor.
///
/// Longer trails decay slower (factor closer to 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DecayPolicy {
    /// `base + length / range`
    Linear { base: f32, range: f32 },
    /// `length / range`
    Fraction { range: f32 },
}

impl DecayPolicy {
    /// Motion trail: 0.6 plus up to ~0.4 from a 1-99 length slider
    pub const TRAIL: DecayPolicy = DecayPolicy::Linear {
        base: 0.6,
        range: 250.0,
    };

    /// Glow trail: 1-100 length used as a plain percentage
    pub const GLOW: DecayPolicy = DecayPolicy::Fraction { range: 100.0 };

    pub fn decay(&self, length: f32) -> f32 {
        let raw = match *self {
            DecayPolicy::Linear { base, range } => base + length / range.max(f32::EPSILON),
            DecayPolicy::Fraction { range } => length / range.max(f32::EPSILON),
        };
        clamp_decay(raw)
    }
}

/// Persistent RGBA buffer plus the last frame it was updated on
#[derive(Debug, Clone)]
pub struct AccumulatorState {
    buffer: RasterBuffer,
    last_frame: Option<u64>,
}

impl AccumulatorState {
    /// Transparent buffer at `width x height`
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: RasterBuffer::new(width, height, PixelFormat::Rgba8),
            last_frame: None,
        }
    }

    pub fn buffer(&self) -> &RasterBuffer {
        &self.buffer
    }

    pub fn resolution(&self) -> (usize, usize) {
        self.buffer.resolution()
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    /// Zero the buffer and forget the frame history
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_frame = None;
    }

    /// Reallocate (and thereby reset) if the video resolution changed.
    ///
    /// Returns true when a reallocation happened.
    pub fn ensure_resolution(&mut self, width: usize, height: usize) -> bool {
        if self.buffer.resolution() == (width, height) {
            return false;
        }
        debug!(
            "Accumulator resolution {:?} -> {}x{}, reallocating",
            self.buffer.resolution(),
            width,
            height
        );
        *self = Self::new(width, height);
        true
    }

    /// Scale the alpha channel by `decay` (clamped into (0, 1]).
    ///
    /// Truncating to u8 means any factor below 1 strictly lowers every
    /// nonzero alpha, so an unfed buffer reaches exactly zero.
    pub fn decay(&mut self, decay: f32) {
        let decay = clamp_decay(decay);
        if decay >= 1.0 {
            return;
        }
        for px in self.buffer.data_mut().chunks_exact_mut(4) {
            px[3] = (px[3] as f32 * decay) as u8;
        }
    }

    /// Advance one frame: decay, blend `contribution` in with `mode`, return the buffer.
    ///
    /// At `frame_index == 0` the buffer is reset first and seeded with the
    /// contribution alone. Frames must arrive in increasing order.
    pub fn step(
        &mut self,
        frame_index: u64,
        contribution: &RasterBuffer,
        decay: f32,
        mode: BlendMode,
    ) -> &RasterBuffer {
        if frame_index == 0 {
            self.reset();
            if contribution.resolution() == self.buffer.resolution() {
                self.buffer = contribution.convert(PixelFormat::Rgba8);
            } else {
                blend(&mut self.buffer, contribution, IVec2::ZERO, mode);
            }
        } else {
            if let Some(last) = self.last_frame {
                if frame_index <= last {
                    warn!(
                        "Accumulator stepped out of order: frame {} after {}",
                        frame_index, last
                    );
                }
            }
            self.decay(decay);
            blend(&mut self.buffer, contribution, IVec2::ZERO, mode);
        }
        self.last_frame = Some(frame_index);
        &self.buffer
    }

    /// Decay without a contribution: the object is missing this frame, or
    /// several contributions follow through [`blend_in`](Self::blend_in).
    pub fn fade(&mut self, frame_index: u64, decay: f32) -> &RasterBuffer {
        if frame_index == 0 {
            self.reset();
        } else {
            self.decay(decay);
        }
        self.last_frame = Some(frame_index);
        &self.buffer
    }

    /// Blend one more contribution into the current frame (after [`fade`](Self::fade))
    pub fn blend_in(&mut self, contribution: &RasterBuffer, mode: BlendMode) {
        blend(&mut self.buffer, contribution, IVec2::ZERO, mode);
    }

    /// Blend the accumulated buffer onto `target` at the origin
    pub fn composite_onto(&self, target: &mut RasterBuffer, mode: BlendMode) {
        blend(target, &self.buffer, IVec2::ZERO, mode);
    }

    /// Sum of all alpha values (diagnostics, tests)
    pub fn total_alpha(&self) -> u64 {
        self.buffer
            .data()
            .chunks_exact(4)
            .map(|px| px[3] as u64)
            .sum()
    }
}

/// Accumulators keyed by target identity.
///
/// Never shares a state between keys. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct TrailBank<K: Hash + Eq> {
    states: IndexMap<K, AccumulatorState>,
}

impl<K: Hash + Eq + Copy + std::fmt::Debug> TrailBank<K> {
    pub fn new() -> Self {
        Self {
            states: IndexMap::new(),
        }
    }

    /// State for `key`, allocated lazily at `resolution` and reallocated if
    /// the stored one has a different size.
    pub fn get_or_create(&mut self, key: K, resolution: (usize, usize)) -> &mut AccumulatorState {
        let state = self.states.entry(key).or_insert_with(|| {
            debug!("TrailBank: new accumulator for {:?} at {:?}", key, resolution);
            AccumulatorState::new(resolution.0, resolution.1)
        });
        state.ensure_resolution(resolution.0, resolution.1);
        state
    }

    pub fn get(&self, key: &K) -> Option<&AccumulatorState> {
        self.states.get(key)
    }

    /// Drop state for a removed object
    pub fn remove(&mut self, key: &K) -> Option<AccumulatorState> {
        self.states.shift_remove(key)
    }

    /// Keep only keys for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.states.retain(|k, _| keep(k));
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(w: usize, h: usize, color: [u8; 3]) -> RasterBuffer {
        RasterBuffer::filled(w, h, PixelFormat::Rgba8, &[color[0], color[1], color[2], 255])
    }

    #[test]
    fn test_decay_policies_map_length_to_factor() {
        assert!((DecayPolicy::TRAIL.decay(50.0) - 0.8).abs() < 1e-6);
        assert!((DecayPolicy::TRAIL.decay(99.0) - 0.996).abs() < 1e-6);
        assert!(DecayPolicy::TRAIL.decay(1.0) < DecayPolicy::TRAIL.decay(99.0));
        assert!((DecayPolicy::GLOW.decay(50.0) - 0.5).abs() < 1e-6);
        assert_eq!(DecayPolicy::GLOW.decay(500.0), 1.0);
        assert_eq!(DecayPolicy::GLOW.decay(0.0), MIN_DECAY);
        assert_eq!(DecayPolicy::GLOW.decay(-3.0), MIN_DECAY);
        assert_eq!(clamp_decay(f32::NAN), 1.0);
    }

    #[test]
    fn test_decay_touches_alpha_only() {
        let mut acc = AccumulatorState::new(2, 2);
        acc.step(0, &opaque(2, 2, [10, 20, 30]), 1.0, BlendMode::Normal);
        acc.decay(0.5);
        assert_eq!(acc.buffer().pixel(1, 1), &[10, 20, 30, 127]);
    }

    #[test]
    fn test_transparent_feed_drains_to_zero() {
        let mut acc = AccumulatorState::new(4, 4);
        acc.step(0, &opaque(4, 4, [255, 0, 0]), 0.6, BlendMode::Normal);
        let empty = RasterBuffer::new(4, 4, PixelFormat::Rgba8);

        let mut prev = acc.total_alpha();
        let mut steps = 0;
        for frame in 1..=40u64 {
            acc.step(frame, &empty, 0.6, BlendMode::Normal);
            let total = acc.total_alpha();
            assert!(total <= prev);
            prev = total;
            steps += 1;
            if total == 0 {
                break;
            }
        }
        assert_eq!(acc.total_alpha(), 0);
        assert!(steps <= 40);
    }

    #[test]
    fn test_alpha_255_under_0_6_is_at_most_1_after_11_steps() {
        let bound = ((1.0f64 / 255.0).ln() / 0.6f64.ln()).ceil() as u64;
        assert_eq!(bound, 11);
        let mut acc = AccumulatorState::new(1, 1);
        acc.step(0, &opaque(1, 1, [0, 0, 0]), 0.6, BlendMode::Normal);
        let empty = RasterBuffer::new(1, 1, PixelFormat::Rgba8);
        for frame in 1..=bound {
            acc.step(frame, &empty, 0.6, BlendMode::Normal);
        }
        assert!(acc.buffer().pixel(0, 0)[3] <= 1);
    }

    #[test]
    fn test_decay_of_one_holds() {
        let mut acc = AccumulatorState::new(2, 1);
        acc.step(0, &opaque(2, 1, [1, 2, 3]), 1.0, BlendMode::Normal);
        let empty = RasterBuffer::new(2, 1, PixelFormat::Rgba8);
        for frame in 1..10 {
            acc.step(frame, &empty, 1.0, BlendMode::Normal);
        }
        assert_eq!(acc.total_alpha(), 2 * 255);
    }

    #[test]
    fn test_frame_zero_resets_to_contribution() {
        let mut acc = AccumulatorState::new(3, 3);
        acc.step(0, &opaque(3, 3, [200, 200, 200]), 0.9, BlendMode::Normal);
        acc.step(1, &opaque(3, 3, [10, 10, 10]), 0.9, BlendMode::Additive);

        let mut fresh = RasterBuffer::new(3, 3, PixelFormat::Rgba8);
        fresh.pixel_mut(1, 1).copy_from_slice(&[5, 6, 7, 90]);
        let out = acc.step(0, &fresh, 0.9, BlendMode::Screen).clone();
        assert_eq!(out, fresh);
        assert_eq!(acc.last_frame(), Some(0));
    }

    #[test]
    fn test_stale_color_survives_under_zero_alpha() {
        let mut acc = AccumulatorState::new(1, 1);
        acc.step(0, &opaque(1, 1, [90, 10, 10]), 0.5, BlendMode::Normal);
        for frame in 1..20 {
            acc.fade(frame, 0.5);
        }
        assert_eq!(acc.buffer().pixel(0, 0), &[90, 10, 10, 0]);
    }

    #[test]
    fn test_fade_then_blend_in_matches_step() {
        let contribution = opaque(2, 2, [40, 50, 60]);
        let mut a = AccumulatorState::new(2, 2);
        let mut b = AccumulatorState::new(2, 2);
        a.step(0, &opaque(2, 2, [1, 1, 1]), 0.7, BlendMode::Normal);
        b.step(0, &opaque(2, 2, [1, 1, 1]), 0.7, BlendMode::Normal);

        a.step(1, &contribution, 0.7, BlendMode::Screen);
        b.fade(1, 0.7);
        b.blend_in(&contribution, BlendMode::Screen);
        assert_eq!(a.buffer(), b.buffer());
    }

    #[test]
    fn test_bank_reallocates_on_resolution_change() {
        let mut bank: TrailBank<u32> = TrailBank::new();
        bank.get_or_create(7, (4, 4)).step(0, &opaque(4, 4, [1, 1, 1]), 0.5, BlendMode::Normal);
        assert_eq!(bank.get(&7).map(|s| s.total_alpha()), Some(16 * 255));

        let state = bank.get_or_create(7, (8, 2));
        assert_eq!(state.resolution(), (8, 2));
        assert_eq!(state.total_alpha(), 0);
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn test_bank_keys_are_independent_and_removable() {
        let mut bank: TrailBank<u32> = TrailBank::new();
        bank.get_or_create(1, (2, 2)).step(0, &opaque(2, 2, [9, 9, 9]), 0.5, BlendMode::Normal);
        bank.get_or_create(2, (2, 2));
        assert_eq!(bank.get(&2).map(|s| s.total_alpha()), Some(0));

        bank.retain(|k| *k != 1);
        assert!(bank.get(&1).is_none());
        assert!(bank.remove(&2).is_some());
        assert!(bank.is_empty());
    }
}
