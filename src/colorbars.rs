//! SECAM color bar test pattern, built directly in YCbCr.

use crate::error::Result;
use crate::picture::YccPicture;

const BAR_COUNT: usize = 8;

/// (Cb, Cr) per bar: gray, yellow, cyan, green, magenta, red, blue, black.
const BAR_CHROMA: [(u8, u8); BAR_COUNT] = [
    (128, 128),
    (64, 128),
    (255, 0),
    (0, 0),
    (255, 255),
    (64, 255),
    (255, 64),
    (128, 128),
];

/// Generate 8 vertical bars with luma stepping down from 255 by 32 per bar.
///
/// `width` must be a multiple of 4 and `height` a multiple of 2.
pub fn generate(width: usize, height: usize) -> Result<YccPicture> {
    let mut picture = YccPicture::new(width, height)?;
    let cw = picture.chroma_width();

    let luma = picture.luma_mut();
    for row in luma.chunks_exact_mut(width) {
        for (x, v) in row.iter_mut().enumerate() {
            let bar = x * BAR_COUNT / width;
            *v = ((BAR_COUNT - bar) * 32).min(255) as u8;
        }
    }

    let (cb, cr) = picture.chroma_mut();
    for (i, (b, r)) in cb.iter_mut().zip(cr.iter_mut()).enumerate() {
        let bar = (i % cw) * BAR_COUNT / cw;
        (*b, *r) = BAR_CHROMA[bar];
    }

    Ok(picture)
}
