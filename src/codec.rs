//! Image file decode/encode around RGB24 buffers.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError, ImageFormat, RgbImage};

use crate::constants::JPEG_QUALITY;
use crate::error::{Result, SecamError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Bmp,
    Tga,
}

impl OutputFormat {
    /// Parse an extension or `--format` token, case-insensitively.
    pub fn from_token(token: &str) -> Result<Self> {
        match token.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "bmp" => Ok(Self::Bmp),
            "tga" => Ok(Self::Tga),
            _ => Err(SecamError::UnknownFormat(token.to_string())),
        }
    }

    /// Pick the format from an explicit override, else from the extension of `path`.
    pub fn resolve(path: &Path, forced: Option<&str>) -> Result<Self> {
        if let Some(token) = forced {
            return Self::from_token(token);
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| SecamError::UnknownFormat(path.display().to_string()))?;
        Self::from_token(ext)
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tga => ImageFormat::Tga,
        }
    }
}

/// Decode any supported image into RGB8.
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| SecamError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Encode an RGB24 buffer.  JPEG is written at maximum quality.
pub fn save_rgb(
    path: &Path,
    rgb: &[u8],
    width: usize,
    height: usize,
    format: OutputFormat,
) -> Result<()> {
    let encode_err = |source: ImageError| SecamError::Encode {
        path: path.to_path_buf(),
        source,
    };
    let (w, h) = (width as u32, height as u32);

    match format {
        OutputFormat::Jpeg => {
            let file = File::create(path).map_err(|e| encode_err(ImageError::IoError(e)))?;
            let mut writer = BufWriter::new(file);
            JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
                .write_image(rgb, w, h, ExtendedColorType::Rgb8)
                .map_err(encode_err)
        }
        other => image::save_buffer_with_format(
            path,
            rgb,
            w,
            h,
            ExtendedColorType::Rgb8,
            other.image_format(),
        )
        .map_err(encode_err),
    }
}

/// `dir/base.ext` → `dir/base-N.ext` for multi-frame output.
pub fn numbered_path(path: &Path, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}-{}", stem, index),
    };
    path.with_file_name(name)
}
