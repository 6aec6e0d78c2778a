//! Chroma-subsampled YCbCr picture and its conversion to and from RGB24.
//!
//! Luma is stored at full resolution.  Cb and Cr carry one sample per 4×2
//! luma block, which is roughly the bandwidth ratio of a SECAM chroma
//! subcarrier against the luma channel:
//!
//! ```text
//!   luma   x: 0 1 2 3 | 4 5 6 7 | ...
//!   chroma cx:   0    |    1    | ...
//! ```
//!
//! Encoding samples chroma at the block anchor pixel `(cx*4, cy*2)`;
//! decoding reconstructs per-pixel chroma with bilinear interpolation
//! between neighbouring blocks.

use rayon::prelude::*;

use crate::constants::{
    B_FROM_CB, B_OFFSET, CB_FROM_RGB, CHROMA_BLOCK_H, CHROMA_BLOCK_W, CR_FROM_RGB, G_FROM_CB,
    G_FROM_CR, G_OFFSET, NEUTRAL, RGB_FROM_Y, R_FROM_CR, R_OFFSET, Y_FROM_RGB, Y_OFFSET,
};
use crate::error::{Result, SecamError};

/// Round to the nearest integer and saturate into a byte.
#[inline]
pub fn clamp_component(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Weighted sum of an RGB triple with coefficients pre-scaled by 256.
#[inline]
fn weigh(coeffs: &[f64; 3], px: &[u8]) -> f64 {
    (coeffs[0] * px[0] as f64 + coeffs[1] * px[1] as f64 + coeffs[2] * px[2] as f64) / 256.0
}

/// Check the 4×2 block alignment a picture needs.
pub fn validate_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 || width % CHROMA_BLOCK_W != 0 || height % CHROMA_BLOCK_H != 0 {
        return Err(SecamError::InvalidDimensions { width, height });
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YccPicture {
    width: usize,
    height: usize,
    luma: Vec<u8>,
    cb: Vec<u8>,
    cr: Vec<u8>,
}

impl YccPicture {
    /// Allocate a neutral picture (every plane at 128).
    pub fn new(width: usize, height: usize) -> Result<Self> {
        validate_dimensions(width, height)?;
        let chroma_len = (width / CHROMA_BLOCK_W) * (height / CHROMA_BLOCK_H);
        Ok(Self {
            width,
            height,
            luma: vec![NEUTRAL; width * height],
            cb: vec![NEUTRAL; chroma_len],
            cr: vec![NEUTRAL; chroma_len],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn chroma_width(&self) -> usize {
        self.width / CHROMA_BLOCK_W
    }

    pub fn chroma_height(&self) -> usize {
        self.height / CHROMA_BLOCK_H
    }

    pub fn luma(&self) -> &[u8] {
        &self.luma
    }

    pub fn cb(&self) -> &[u8] {
        &self.cb
    }

    pub fn cr(&self) -> &[u8] {
        &self.cr
    }

    pub fn luma_mut(&mut self) -> &mut [u8] {
        &mut self.luma
    }

    /// Mutable access to both chroma planes at once.
    pub fn chroma_mut(&mut self) -> (&mut [u8], &mut [u8]) {
        (&mut self.cb, &mut self.cr)
    }

    /// Mutable access to all three planes.
    pub fn all_planes_mut(&mut self) -> [&mut [u8]; 3] {
        [&mut self.luma, &mut self.cb, &mut self.cr]
    }

    /// Return every plane to the neutral value.
    pub fn reset(&mut self) {
        self.luma.fill(NEUTRAL);
        self.cb.fill(NEUTRAL);
        self.cr.fill(NEUTRAL);
    }

    /// Make `self` an independent copy of `src`.
    ///
    /// Planes are only reallocated when the dimensions differ.
    pub fn copy_from(&mut self, src: &YccPicture) {
        if self.dimensions() == src.dimensions() {
            self.luma.copy_from_slice(&src.luma);
            self.cb.copy_from_slice(&src.cb);
            self.cr.copy_from_slice(&src.cr);
        } else {
            self.width = src.width;
            self.height = src.height;
            self.luma = src.luma.clone();
            self.cb = src.cb.clone();
            self.cr = src.cr.clone();
        }
    }

    /// Encode an RGB24 buffer (`width * height * 3` bytes).
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Result<Self> {
        let mut picture = Self::new(width, height)?;
        let expected = width * height * 3;
        if rgb.len() != expected {
            return Err(SecamError::BufferLength {
                expected,
                actual: rgb.len(),
            });
        }

        picture
            .luma
            .par_chunks_mut(width)
            .zip(rgb.par_chunks(width * 3))
            .for_each(|(row, src)| {
                for (y, px) in row.iter_mut().zip(src.chunks_exact(3)) {
                    *y = clamp_component(Y_OFFSET + weigh(&Y_FROM_RGB, px));
                }
            });

        // Nearest-sample subsampling: each block takes its anchor pixel.
        let cw = picture.chroma_width();
        for (i, (cb, cr)) in picture.cb.iter_mut().zip(picture.cr.iter_mut()).enumerate() {
            let (cx, cy) = (i % cw, i / cw);
            let offset = (cy * CHROMA_BLOCK_H * width + cx * CHROMA_BLOCK_W) * 3;
            let px = &rgb[offset..offset + 3];
            *cb = clamp_component(f64::from(NEUTRAL) + weigh(&CB_FROM_RGB, px));
            *cr = clamp_component(f64::from(NEUTRAL) + weigh(&CR_FROM_RGB, px));
        }

        Ok(picture)
    }

    /// Bilinear chroma reconstruction around block `(cx, cy)`.
    #[inline]
    fn interpolate(&self, plane: &[u8], cx: usize, cy: usize, s: f64, t: f64) -> f64 {
        let cw = self.chroma_width();
        let cx1 = (cx + 1).min(cw - 1);
        let cy1 = (cy + 1).min(self.chroma_height() - 1);
        let at = |x: usize, y: usize| plane[y * cw + x] as f64;
        let top = lerp(at(cx, cy), at(cx1, cy), s);
        let bottom = lerp(at(cx, cy1), at(cx1, cy1), s);
        lerp(top, bottom, t)
    }

    /// Decode into an RGB24 buffer of `width * height * 3` bytes.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = vec![0u8; self.width * self.height * 3];
        rgb.par_chunks_mut(self.width * 3)
            .enumerate()
            .for_each(|(y, row)| {
                let cy = y / CHROMA_BLOCK_H;
                let t = (y % CHROMA_BLOCK_H) as f64 / CHROMA_BLOCK_H as f64;
                for (x, px) in row.chunks_exact_mut(3).enumerate() {
                    let cx = x / CHROMA_BLOCK_W;
                    let s = (x % CHROMA_BLOCK_W) as f64 / CHROMA_BLOCK_W as f64;
                    let cb = self.interpolate(&self.cb, cx, cy, s, t);
                    let cr = self.interpolate(&self.cr, cx, cy, s, t);
                    let luma = RGB_FROM_Y * self.luma[y * self.width + x] as f64 / 256.0;

                    px[0] = clamp_component(luma + R_FROM_CR * cr / 256.0 + R_OFFSET);
                    px[1] = clamp_component(
                        luma + G_FROM_CB * cb / 256.0 + G_FROM_CR * cr / 256.0 + G_OFFSET,
                    );
                    px[2] = clamp_component(luma + B_FROM_CB * cb / 256.0 + B_OFFSET);
                }
            });
        rgb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_rgb(width: usize, height: usize, color: [u8; 3]) -> Vec<u8> {
        color.iter().copied().cycle().take(width * height * 3).collect()
    }

    #[test]
    fn test_clamp_is_idempotent_and_bounded() {
        for v in [-1000.0, -0.6, -0.4, 0.0, 12.49, 12.5, 127.7, 254.6, 255.0, 300.0, 1e9] {
            let once = clamp_component(v);
            assert_eq!(clamp_component(once as f64), once);
        }
        assert_eq!(clamp_component(-3.0), 0);
        assert_eq!(clamp_component(255.4), 255);
        assert_eq!(clamp_component(99.5), 100);
    }

    #[test]
    fn test_new_is_neutral() {
        let p = YccPicture::new(16, 4).unwrap();
        assert_eq!(p.luma().len(), 64);
        assert_eq!(p.cb().len(), 4 * 2);
        assert_eq!(p.cr().len(), 4 * 2);
        assert!(p.luma().iter().chain(p.cb()).chain(p.cr()).all(|&v| v == 128));
    }

    #[test]
    fn test_new_rejects_unaligned_dimensions() {
        assert!(matches!(
            YccPicture::new(10, 4),
            Err(SecamError::InvalidDimensions { width: 10, height: 4 })
        ));
        assert!(YccPicture::new(8, 3).is_err());
        assert!(YccPicture::new(0, 2).is_err());
    }

    #[test]
    fn test_from_rgb_rejects_short_buffer() {
        let rgb = vec![0u8; 8 * 2 * 3 - 1];
        assert!(matches!(
            YccPicture::from_rgb(&rgb, 8, 2),
            Err(SecamError::BufferLength { expected: 48, actual: 47 })
        ));
    }

    #[test]
    fn test_flat_roundtrip_within_two_levels() {
        let colors = [
            [128, 128, 128],
            [255, 255, 255],
            [0, 0, 0],
            [255, 0, 0],
            [0, 0, 255],
            [30, 200, 90],
            [17, 64, 220],
            [240, 180, 20],
        ];
        for color in colors {
            let rgb = flat_rgb(16, 8, color);
            let back = YccPicture::from_rgb(&rgb, 16, 8).unwrap().to_rgb();
            for px in back.chunks_exact(3) {
                for c in 0..3 {
                    let diff = (px[c] as i32 - color[c] as i32).abs();
                    assert!(diff <= 2, "{:?} decoded as {:?}", color, px);
                }
            }
        }
    }

    #[test]
    fn test_chroma_samples_block_anchor() {
        // Block (1, 0) anchor at pixel (4, 0) is red; the rest of the block is blue.
        let (w, h) = (8, 2);
        let mut rgb = flat_rgb(w, h, [0, 0, 255]);
        rgb[4 * 3..4 * 3 + 3].copy_from_slice(&[255, 0, 0]);
        let p = YccPicture::from_rgb(&rgb, w, h).unwrap();
        let red = YccPicture::from_rgb(&flat_rgb(4, 2, [255, 0, 0]), 4, 2).unwrap();
        let blue = YccPicture::from_rgb(&flat_rgb(4, 2, [0, 0, 255]), 4, 2).unwrap();
        assert_eq!(p.cb()[1], red.cb()[0]);
        assert_eq!(p.cr()[1], red.cr()[0]);
        assert_eq!(p.cb()[0], blue.cb()[0]);
    }

    #[test]
    fn test_decode_interpolates_between_blocks() {
        let mut p = YccPicture::new(8, 2).unwrap();
        p.chroma_mut().1.copy_from_slice(&[128, 228]);
        let rgb = p.to_rgb();
        // Red rises across block 0 towards block 1 and stays flat on the last block.
        let reds: Vec<u8> = rgb.chunks_exact(3).take(8).map(|px| px[0]).collect();
        for pair in reds[..5].windows(2) {
            assert!(pair[0] < pair[1], "{:?}", reds);
        }
        assert!(reds[4..].iter().all(|&r| r == reds[4]));
    }

    #[test]
    fn test_reset_and_copy_from() {
        let rgb = flat_rgb(8, 4, [10, 200, 30]);
        let source = YccPicture::from_rgb(&rgb, 8, 4).unwrap();

        let mut same = YccPicture::new(8, 4).unwrap();
        same.copy_from(&source);
        assert_eq!(same, source);

        let mut other = YccPicture::new(16, 2).unwrap();
        other.copy_from(&source);
        assert_eq!(other, source);

        other.reset();
        assert_eq!(other, YccPicture::new(8, 4).unwrap());
        assert_ne!(source, other);
    }
}
