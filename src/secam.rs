//! SECAM "color fire": streaks of chroma that ignite on luma edges.
//!
//! A real SECAM receiver demodulates Cb and Cr on alternate lines from an
//! FM subcarrier.  A sharp luma transition leaks into the discriminator and
//! the chroma channel rings for a while afterwards, painting a bright red or
//! blue streak to the right of the edge that fades out slowly.
//!
//! The scan walks one chroma row left to right and carries a tiny state
//! machine between blocks:
//!
//!   - **Dormant**: no streak; a block may ignite if the luma step from
//!     its left neighbour, scaled by a random draw, beats a jittered
//!     threshold and the last ignition lies far enough to the left.
//!   - **Burning**: a streak started at `ignition`; every block adds
//!     `fire ≈ 1/gain` to the selected channel until the value drops below
//!     zero, which returns the row to dormant.
//!
//! State is local to a row, so rows are scanned in parallel.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::constants::{
    BLUE_PROBABILITY, CHROMA_BLOCK_H, CHROMA_BLOCK_W, FIRE_BASE, FIRE_SPREAD, MIN_STEP,
    STEP_SPREAD,
};
use crate::picture::{clamp_component, YccPicture};

/// Chroma plane a streak writes into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Channel {
    Cb,
    #[default]
    Cr,
}

/// Per-row scan state.  Fresh for every row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Block where the current streak started.
    ignition: Option<usize>,
    channel: Channel,
}

/// Intensity added `gain` blocks into a streak, for a uniform draw in `[0, 1)`.
#[inline]
pub fn fire_intensity(gain: f64, draw: f64) -> f64 {
    (FIRE_BASE + draw * FIRE_SPREAD) / (gain + 1.0) - 1.0
}

/// Mean luma of the 4×2 block at `(cx, cy)`.
fn block_mean(luma: &[u8], width: usize, cx: usize, cy: usize) -> f64 {
    let x0 = cx * CHROMA_BLOCK_W;
    let sum: u32 = (0..CHROMA_BLOCK_H)
        .map(|line| {
            let row = &luma[(cy * CHROMA_BLOCK_H + line) * width..][..width];
            row[x0..x0 + CHROMA_BLOCK_W].iter().map(|&v| v as u32).sum::<u32>()
        })
        .sum();
    sum as f64 / (CHROMA_BLOCK_W * CHROMA_BLOCK_H) as f64
}

/// Luma step into block `(cx, cy)` from its left neighbour, divided by 256.
///
/// Brightening steps are positive.  Block 0 has no neighbour and reports 0.
pub fn edge_delta(luma: &[u8], width: usize, cx: usize, cy: usize) -> f64 {
    if cx == 0 {
        return 0.0;
    }
    (block_mean(luma, width, cx, cy) - block_mean(luma, width, cx - 1, cy)) / 256.0
}

/// Tunables of the color fire scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SecamEffect {
    /// Weight of the edge-independent random trigger term.
    pub random_factor: f64,
    /// Ignition threshold, jittered by ±50% per block.
    pub threshold: f64,
}

impl SecamEffect {
    pub fn new(random_factor: f64, threshold: f64) -> Self {
        Self {
            random_factor,
            threshold,
        }
    }

    /// Advance the state machine by one block.
    ///
    /// Returns the channel and amount of fire to add, or `None` when the
    /// block stays untouched.  Block 0 always resets the state.
    pub fn step(
        &self,
        state: &mut ScanState,
        cx: usize,
        delta: f64,
        rng: &mut impl Rng,
    ) -> Option<(Channel, f64)> {
        if cx == 0 {
            *state = ScanState::default();
            return None;
        }

        let gain = match state.ignition {
            Some(at) => (cx - at) as f64,
            None => 1.5 * MIN_STEP,
        };
        let step = MIN_STEP + rng.random::<f64>() * (MIN_STEP * STEP_SPREAD);
        let threshold = self.threshold + (rng.random::<f64>() * self.threshold - self.threshold * 0.5);

        let trigger = delta * rng.random::<f64>() + self.random_factor * rng.random::<f64>();
        if trigger > threshold && gain > step {
            state.ignition = Some(cx);
            state.channel = if rng.random::<f64>() <= BLUE_PROBABILITY {
                Channel::Cb
            } else {
                Channel::Cr
            };
        }

        state.ignition?;

        let fire = fire_intensity(gain, rng.random::<f64>());
        if fire < 0.0 {
            // Faded out.
            state.ignition = None;
            return None;
        }
        Some((state.channel, fire))
    }

    /// Scan chroma row `cy`, reading edges from `luma` and adding fire to
    /// the row's Cb or Cr samples.
    pub fn scan_row(
        &self,
        luma: &[u8],
        width: usize,
        cy: usize,
        cb_row: &mut [u8],
        cr_row: &mut [u8],
        rng: &mut impl Rng,
    ) {
        let mut state = ScanState::default();
        for cx in 0..cb_row.len() {
            let delta = edge_delta(luma, width, cx, cy);
            if let Some((channel, fire)) = self.step(&mut state, cx, delta, rng) {
                let sample = match channel {
                    Channel::Cb => &mut cb_row[cx],
                    Channel::Cr => &mut cr_row[cx],
                };
                *sample = clamp_component(*sample as f64 + fire);
            }
        }
    }

    /// Build a neutral overlay the size of `reference` and burn streaks into
    /// its chroma, using the reference luma for edge detection.
    ///
    /// Each row gets its own RNG seeded from `rng`, so the result only
    /// depends on the state of `rng`, not on thread scheduling.
    pub fn render_overlay(&self, reference: &YccPicture, rng: &mut impl Rng) -> YccPicture {
        let mut overlay = reference.clone();
        overlay.reset();

        let width = reference.width();
        let cw = reference.chroma_width();
        let seeds: Vec<u64> = (0..reference.chroma_height()).map(|_| rng.random()).collect();
        let luma = reference.luma();
        let (cb, cr) = overlay.chroma_mut();

        cb.par_chunks_mut(cw)
            .zip(cr.par_chunks_mut(cw))
            .zip(seeds.par_iter())
            .enumerate()
            .for_each(|(cy, ((cb_row, cr_row), &seed))| {
                let mut row_rng = StdRng::seed_from_u64(seed);
                self.scan_row(luma, width, cy, cb_row, cr_row, &mut row_rng);
            });

        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::merge;
    use crate::constants::{DEFAULT_RANDOM_FACTOR, DEFAULT_THRESHOLD};

    fn effect() -> SecamEffect {
        SecamEffect::new(DEFAULT_RANDOM_FACTOR, DEFAULT_THRESHOLD)
    }

    /// Picture whose luma is `level(x)` on every line.
    fn columns(width: usize, height: usize, level: impl Fn(usize) -> u8) -> YccPicture {
        let mut p = YccPicture::new(width, height).unwrap();
        for row in p.luma_mut().chunks_mut(width) {
            for (x, v) in row.iter_mut().enumerate() {
                *v = level(x);
            }
        }
        p
    }

    /// Dark and bright blocks alternating, so every odd block brightens.
    fn alternating(width: usize, height: usize) -> YccPicture {
        columns(width, height, |x| if (x / CHROMA_BLOCK_W) % 2 == 1 { 235 } else { 16 })
    }

    #[test]
    fn test_edge_delta() {
        let p = columns(64, 2, |x| if x < 40 { 16 } else { 235 });
        assert_eq!(edge_delta(p.luma(), 64, 0, 0), 0.0);
        assert_eq!(edge_delta(p.luma(), 64, 9, 0), 0.0);
        assert!((edge_delta(p.luma(), 64, 10, 0) - 219.0 / 256.0).abs() < 1e-12);
        assert_eq!(edge_delta(p.luma(), 64, 11, 0), 0.0);

        let p = alternating(16, 2);
        assert!(edge_delta(p.luma(), 16, 1, 0) > 0.0);
        assert!((edge_delta(p.luma(), 16, 2, 0) + 219.0 / 256.0).abs() < 1e-12);
    }

    #[test]
    fn test_fire_decays_with_gain() {
        for draw in [0.0, 0.25, 0.5, 0.999] {
            let mut prev = f64::INFINITY;
            for gain in 0..600 {
                let fire = fire_intensity(gain as f64, draw);
                assert!(fire < prev, "fire not decreasing at gain {}", gain);
                prev = fire;
            }
            assert!(prev < 0.0);
        }
    }

    #[test]
    fn test_first_block_resets_and_never_fires() {
        let mut rng = StdRng::seed_from_u64(1);
        let fx = SecamEffect::new(100.0, 0.0);
        let mut state = ScanState {
            ignition: Some(3),
            channel: Channel::Cb,
        };
        assert_eq!(fx.step(&mut state, 0, 1.0, &mut rng), None);
        assert_eq!(state, ScanState::default());
    }

    #[test]
    fn test_first_column_untouched_by_overlay() {
        let mut rng = StdRng::seed_from_u64(2);
        let p = alternating(64, 32);
        let fx = SecamEffect::new(1.0, 0.001);
        for _ in 0..8 {
            let overlay = fx.render_overlay(&p, &mut rng);
            for cy in 0..overlay.chroma_height() {
                let i = cy * overlay.chroma_width();
                assert_eq!(overlay.cb()[i], 128);
                assert_eq!(overlay.cr()[i], 128);
            }
        }
    }

    #[test]
    fn test_streak_extinguishes() {
        let mut rng = StdRng::seed_from_u64(3);
        let fx = SecamEffect::new(0.0, DEFAULT_THRESHOLD);
        let mut state = ScanState {
            ignition: Some(1),
            channel: Channel::Cr,
        };
        assert_eq!(fx.step(&mut state, 600, 0.0, &mut rng), None);
        assert_eq!(state.ignition, None);
    }

    #[test]
    fn test_flat_gray_never_ignites() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut p = YccPicture::new(64, 32).unwrap();
        let before = p.clone();
        let overlay = effect().render_overlay(&p, &mut rng);
        assert_eq!(overlay, before);
        merge(&mut p, &overlay).unwrap();
        assert_eq!(p, before);
    }

    #[test]
    fn test_one_channel_per_block() {
        let mut rng = StdRng::seed_from_u64(5);
        let p = alternating(256, 64);
        let overlay = effect().render_overlay(&p, &mut rng);
        let mut touched = 0;
        for (&cb, &cr) in overlay.cb().iter().zip(overlay.cr()) {
            assert!(cb == 128 || cr == 128, "both channels fired: cb={} cr={}", cb, cr);
            if cb != 128 || cr != 128 {
                assert!(cb >= 128 && cr >= 128);
                touched += 1;
            }
        }
        assert!(touched > 0);
        assert!(overlay.luma().iter().all(|&v| v == 128));
    }

    #[test]
    fn test_brightening_step_ignites_at_the_edge() {
        // Dark left part, bright from x = 40 on: the only step is into block 10.
        const EDGE: usize = 10;
        let p = columns(256, 512, |x| if x < EDGE * CHROMA_BLOCK_W { 16 } else { 235 });

        for seed in 0..5u64 {
            let mut rng = StdRng::seed_from_u64(0x5ECA_3000 + seed);
            let overlay = effect().render_overlay(&p, &mut rng);
            let cw = overlay.chroma_width();

            let mut ignited = 0;
            for cy in 0..overlay.chroma_height() {
                let row = |plane: &[u8], cx: usize| plane[cy * cw + cx];
                let lit = |cx: usize| row(overlay.cb(), cx).max(row(overlay.cr(), cx));

                let Some(first) = (0..cw).find(|&cx| lit(cx) != 128) else {
                    continue;
                };
                // Flat regions cannot beat the threshold with this random factor.
                assert_eq!(first, EDGE, "seed {} row {} ignited at block {}", seed, cy, first);
                ignited += 1;

                // Nothing re-ignites past the edge, so the tail follows the
                // 1/gain envelope to the right border.
                for cx in EDGE + 1..cw {
                    let gain = (cx - EDGE) as f64;
                    let fire = lit(cx) as f64 - 128.0;
                    let hi = fire_intensity(gain, 1.0);
                    let lo = fire_intensity(gain, 0.0);
                    assert!(fire <= hi.min(127.0) + 0.5, "row {} gain {}: {}", cy, gain, fire);
                    assert!(fire >= lo.min(127.0) - 0.5, "row {} gain {}: {}", cy, gain, fire);
                }
                assert!(lit(EDGE + 1) > lit(EDGE + 6));
            }
            assert!(ignited > 0, "seed {}: no row ignited at the edge", seed);
        }
    }

    #[test]
    fn test_overlay_is_reproducible() {
        let p = alternating(128, 16);
        let a = effect().render_overlay(&p, &mut StdRng::seed_from_u64(9));
        let b = effect().render_overlay(&p, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
