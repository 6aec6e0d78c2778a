//! Blend an overlay of deltas-from-neutral into a base picture.

use crate::constants::NEUTRAL;
use crate::error::{Result, SecamError};
use crate::picture::YccPicture;

/// `base[i] = clamp(base[i] + overlay[i] - 128)` on all three planes.
///
/// A neutral overlay leaves `base` unchanged.  Pictures of different size
/// are rejected and `base` is left untouched.
pub fn merge(base: &mut YccPicture, overlay: &YccPicture) -> Result<()> {
    if base.dimensions() != overlay.dimensions() {
        return Err(SecamError::SizeMismatch {
            base: base.dimensions(),
            overlay: overlay.dimensions(),
        });
    }

    let sources = [overlay.luma(), overlay.cb(), overlay.cr()];
    for (dst, src) in base.all_planes_mut().into_iter().zip(sources) {
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = (*d as i16 + s as i16 - NEUTRAL as i16).clamp(0, 255) as u8;
        }
    }
    Ok(())
}
