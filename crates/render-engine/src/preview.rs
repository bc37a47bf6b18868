//! Live preview of rendered frames.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::RgbImage;
use laprender_common::error::{LaprenderError, LaprenderResult};

/// Somewhere to mirror frames while they are rendered.
pub trait PreviewSurface: Send {
    fn show(&mut self, frame: &RgbImage) -> LaprenderResult<()>;
}

/// Preview that discards frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPreview;

impl PreviewSurface for NullPreview {
    fn show(&mut self, _frame: &RgbImage) -> LaprenderResult<()> {
        Ok(())
    }
}

/// Preview written to a PNG file, overwritten in place at most once per
/// `min_interval`. Any image viewer that reloads on change can follow it.
#[derive(Debug)]
pub struct PngPreview {
    path: PathBuf,
    min_interval: Duration,
    last: Option<Instant>,
}

impl PngPreview {
    pub fn new(path: impl Into<PathBuf>, min_interval: Duration) -> Self {
        Self {
            path: path.into(),
            min_interval,
            last: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreviewSurface for PngPreview {
    fn show(&mut self, frame: &RgbImage) -> LaprenderResult<()> {
        let now = Instant::now();
        if self
            .last
            .is_some_and(|last| now.duration_since(last) < self.min_interval)
        {
            return Ok(());
        }
        self.last = Some(now);
        // Write next to the target and rename so viewers never see a torn file.
        let tmp = self.path.with_extension("tmp.png");
        frame
            .save(&tmp)
            .map_err(|e| LaprenderError::render(format!("Failed to write preview: {e}")))?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_preview_throttles() {
        let dir = std::env::temp_dir().join(format!("laprender-preview-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("preview.png");
        let mut preview = PngPreview::new(&path, Duration::from_secs(3600));

        preview.show(&RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]))).unwrap();
        preview.show(&RgbImage::from_pixel(4, 4, image::Rgb([200, 0, 0]))).unwrap();

        let written = image::open(&path).unwrap().to_rgb8();
        assert_eq!(written.get_pixel(0, 0), &image::Rgb([10, 20, 30]));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
