//! 1D value noise over a cyclic lattice, and the grain pass built on it.

use rand::Rng;
use rayon::prelude::*;

use crate::constants::{
    CB_NOISE_ROW_OFFSET, CHROMA_NOISE_SCALE, CR_NOISE_ROW_OFFSET, LATTICE_SIZE,
    LUMA_NOISE_OFFSET, LUMA_NOISE_RATIO, LUMA_NOISE_ROW_OFFSET, LUMA_NOISE_SCALE,
};
use crate::picture::{clamp_component, YccPicture};

/// Fixed table of uniform random values in `[0, 1)`.
///
/// Built once per run and then only read, so it can be shared across
/// worker threads.  Amplitude and frequency scale are passed to every
/// sample call; the lattice holds no tunables.
#[derive(Clone, Debug)]
pub struct NoiseLattice {
    values: [f64; LATTICE_SIZE],
}

impl NoiseLattice {
    pub fn new(rng: &mut impl Rng) -> Self {
        let mut values = [0.0; LATTICE_SIZE];
        for v in values.iter_mut() {
            *v = rng.random::<f64>();
        }
        Self { values }
    }

    /// Smoothstep-interpolated value noise at `x`, in `[0, amplitude]`.
    pub fn sample(&self, x: f64, amplitude: f64, scale: f64) -> f64 {
        let xs = x * scale;
        let floor = xs.floor();
        let frac = xs - floor;
        let smooth = frac * frac * (3.0 - 2.0 * frac);
        let i = (floor as i64).rem_euclid(LATTICE_SIZE as i64) as usize;
        let lo = self.values[i];
        let hi = self.values[(i + 1) % LATTICE_SIZE];
        (lo * (1.0 - smooth) + hi * smooth) * amplitude
    }

    /// Zero-centred variant: `sample(..) - amplitude / 2`.
    fn centered(&self, x: f64, amplitude: f64, scale: f64) -> f64 {
        self.sample(x, amplitude, scale) - amplitude * 0.5
    }
}

/// Add analog grain to a picture in place.
///
/// Chroma receives noise of the given amplitude per block; luma receives
/// a finer, weaker noise.  An amplitude of zero leaves the picture as is.
pub fn apply_grain(picture: &mut YccPicture, lattice: &NoiseLattice, amplitude: f64) {
    if amplitude <= 0.0 {
        return;
    }
    let width = picture.width();
    let cw = picture.chroma_width();
    let luma_amplitude = amplitude * LUMA_NOISE_RATIO;

    let [luma, cb, cr] = picture.all_planes_mut();

    luma.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_offset = LUMA_NOISE_OFFSET + LUMA_NOISE_ROW_OFFSET * y as f64;
        for (x, v) in row.iter_mut().enumerate() {
            let n = lattice.centered(x as f64 + row_offset, luma_amplitude, LUMA_NOISE_SCALE);
            *v = clamp_component(*v as f64 + n);
        }
    });

    cb.par_chunks_mut(cw)
        .zip(cr.par_chunks_mut(cw))
        .enumerate()
        .for_each(|(cy, (cb_row, cr_row))| {
            let cy = cy as f64;
            for (cx, (b, r)) in cb_row.iter_mut().zip(cr_row.iter_mut()).enumerate() {
                let cx = cx as f64;
                let nb = lattice.centered(cx + CB_NOISE_ROW_OFFSET * cy, amplitude, CHROMA_NOISE_SCALE);
                let nr = lattice.centered(cx + CR_NOISE_ROW_OFFSET * cy, amplitude, CHROMA_NOISE_SCALE);
                *b = clamp_component(*b as f64 + nb);
                *r = clamp_component(*r as f64 + nr);
            }
        });
}
