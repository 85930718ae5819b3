use image::{codecs::jpeg::JpegEncoder, DynamicImage};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::PickOptions;

/// Errors from the edit step
#[derive(Debug, Error)]
pub enum EditError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    InvalidAspect(String),
}

/// Get the cache directory for edited picks
/// Returns ~/.cache/slot-gallery/edits on Linux
pub fn default_edit_cache_dir() -> Option<PathBuf> {
    let mut path = dirs::cache_dir().or_else(dirs::home_dir)?;

    path.push("slot-gallery");
    path.push("edits");
    Some(path)
}

/// Largest centred rectangle with the given aspect that fits the image
///
/// Returns (x, y, width, height).
pub fn aspect_crop(width: u32, height: u32, aspect: (u32, u32)) -> (u32, u32, u32, u32) {
    let (aw, ah) = (u64::from(aspect.0), u64::from(aspect.1));
    let (w, h) = (u64::from(width), u64::from(height));

    // Compare w/h against aw/ah without floats
    let (crop_w, crop_h) = if w * ah > h * aw {
        // Too wide: keep full height
        ((h * aw / ah).max(1), h)
    } else {
        // Too tall (or exact): keep full width
        (w, (w * ah / aw).max(1))
    };

    let x = (w - crop_w) / 2;
    let y = (h - crop_h) / 2;
    (x as u32, y as u32, crop_w as u32, crop_h as u32)
}

/// Crop a picked image to `options.aspect` and save it as JPEG
///
/// The edited copy keeps the source's file stem so the upload name still
/// follows what the user picked. Returns the path of the copy.
pub fn edit_image(source: &Path, options: &PickOptions, out_dir: &Path) -> Result<PathBuf, EditError> {
    if options.aspect.0 == 0 || options.aspect.1 == 0 {
        return Err(EditError::InvalidAspect(format!(
            "aspect {}:{} has a zero side",
            options.aspect.0, options.aspect.1
        )));
    }

    let img = image::open(source)?;
    let (x, y, w, h) = aspect_crop(img.width(), img.height(), options.aspect);
    let cropped = img.crop_imm(x, y, w, h);

    fs::create_dir_all(out_dir)?;
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "pick".to_string());
    let out_path = out_dir.join(format!("{stem}.jpg"));

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(cropped.to_rgb8());
    let quality = (options.quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
    let writer = BufWriter::new(File::create(&out_path)?);
    rgb.write_with_encoder(JpegEncoder::new_with_quality(writer, quality))?;

    debug!(
        "📸 Edited pick {}x{} -> {}x{} at q{}: {}",
        img.width(),
        img.height(),
        w,
        h,
        quality,
        out_path.display()
    );
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};

    #[test]
    fn test_aspect_crop_wide_image() {
        // 1600x900 (16:9) cropped to 4:3 keeps full height
        assert_eq!(aspect_crop(1600, 900, (4, 3)), (200, 0, 1200, 900));
    }

    #[test]
    fn test_aspect_crop_tall_image() {
        // 900x1600 cropped to 4:3 keeps full width
        assert_eq!(aspect_crop(900, 1600, (4, 3)), (0, 462, 900, 675));
    }

    #[test]
    fn test_aspect_crop_exact_fit() {
        assert_eq!(aspect_crop(800, 600, (4, 3)), (0, 0, 800, 600));
    }

    #[test]
    fn test_edit_image_writes_cropped_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("sunset.png");
        RgbaImage::new(160, 90)
            .save_with_format(&source, ImageFormat::Png)
            .unwrap();

        let out = edit_image(&source, &PickOptions::default(), &dir.path().join("edits")).unwrap();

        assert_eq!(out.file_name().unwrap(), "sunset.jpg");
        let edited = image::open(&out).unwrap();
        assert_eq!((edited.width(), edited.height()), (120, 90));
    }

    #[test]
    fn test_edit_image_rejects_zero_aspect() {
        let dir = tempfile::tempdir().unwrap();
        let options = PickOptions {
            aspect: (0, 3),
            ..PickOptions::default()
        };
        assert!(matches!(
            edit_image(&dir.path().join("x.png"), &options, dir.path()),
            Err(EditError::InvalidAspect(_))
        ));
    }

    #[test]
    fn test_edit_image_unreadable_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.jpg");
        std::fs::write(&source, b"not an image").unwrap();

        assert!(edit_image(&source, &PickOptions::default(), dir.path()).is_err());
    }
}
