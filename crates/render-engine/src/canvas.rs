//! Drawing surface consumed by the overlays.
//!
//! Overlays decide what goes where; a [`Canvas`] decides how it rasterizes.
//! Colors carry their own alpha and are blended onto whatever is below.

use std::path::Path;
use std::sync::{Arc, Once};

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut, draw_polygon_mut, Blend,
    Canvas as PixelCanvas,
};
use imageproc::point::Point;
use laprender_common::error::{LaprenderError, LaprenderResult};
use rusttype::{point, Font, Scale};

/// RGBA color.
pub type Color = Rgba<u8>;

/// `color` with its alpha replaced by `alpha` in `[0, 1]`.
pub fn with_alpha(color: Color, alpha: f32) -> Color {
    let Rgba([r, g, b, _]) = color;
    Rgba([r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8])
}

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Drawing primitives used by the overlay renderers.
pub trait Canvas {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color);

    fn circle(&mut self, center: (f32, f32), radius: f32, color: Color, filled: bool);

    fn rounded_rect(&mut self, rect: Rect, radius: f32, color: Color);

    /// Draw `text` with its top-left corner at `origin`, `px` pixels tall.
    fn text(&mut self, text: &str, origin: (f32, f32), px: f32, color: Color);
}

/// Load a TrueType/OpenType font for overlay text.
pub fn load_font(path: &Path) -> LaprenderResult<Font<'static>> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LaprenderError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LaprenderError::Io(e)
        }
    })?;
    Font::try_from_vec(bytes)
        .ok_or_else(|| LaprenderError::render(format!("Unreadable font file {}", path.display())))
}

static MISSING_FONT: Once = Once::new();

/// Canvas rasterizing onto an RGBA copy of a video frame.
pub struct RasterCanvas {
    target: Blend<RgbaImage>,
    font: Option<Arc<Font<'static>>>,
}

impl RasterCanvas {
    pub fn new(frame: &RgbImage, font: Option<Arc<Font<'static>>>) -> Self {
        let rgba = RgbaImage::from_fn(frame.width(), frame.height(), |x, y| {
            let Rgb([r, g, b]) = *frame.get_pixel(x, y);
            Rgba([r, g, b, 255])
        });
        Self {
            target: Blend(rgba),
            font,
        }
    }

    /// Flatten back to an RGB frame.
    pub fn finish(self) -> RgbImage {
        let rgba = self.target.0;
        RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let Rgba([r, g, b, _]) = *rgba.get_pixel(x, y);
            Rgb([r, g, b])
        })
    }

    fn put(&mut self, x: i32, y: i32, color: Color) {
        let (w, h) = self.target.dimensions();
        if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h && color[3] > 0 {
            self.target.draw_pixel(x as u32, y as u32, color);
        }
    }
}

impl Canvas for RasterCanvas {
    fn size(&self) -> (u32, u32) {
        self.target.dimensions()
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = (dx * dx + dy * dy).sqrt();
        if width <= 1.5 || length < 0.5 {
            draw_line_segment_mut(&mut self.target, from, to, color);
            return;
        }
        let (nx, ny) = (-dy / length * width / 2.0, dx / length * width / 2.0);
        let corners = [
            Point::new((from.0 + nx).round() as i32, (from.1 + ny).round() as i32),
            Point::new((to.0 + nx).round() as i32, (to.1 + ny).round() as i32),
            Point::new((to.0 - nx).round() as i32, (to.1 - ny).round() as i32),
            Point::new((from.0 - nx).round() as i32, (from.1 - ny).round() as i32),
        ];
        if corners[0] == corners[3] {
            draw_line_segment_mut(&mut self.target, from, to, color);
        } else {
            draw_polygon_mut(&mut self.target, &corners, color);
        }
    }

    fn circle(&mut self, center: (f32, f32), radius: f32, color: Color, filled: bool) {
        let c = (center.0.round() as i32, center.1.round() as i32);
        let r = radius.round().max(1.0) as i32;
        if filled {
            draw_filled_circle_mut(&mut self.target, c, r, color);
        } else {
            draw_hollow_circle_mut(&mut self.target, c, r, color);
        }
    }

    fn rounded_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        let radius = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
        let (x0, y0) = (rect.x.round() as i32, rect.y.round() as i32);
        let (x1, y1) = (
            (rect.x + rect.width).round() as i32,
            (rect.y + rect.height).round() as i32,
        );
        for y in y0..y1 {
            for x in x0..x1 {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let cx = px.clamp(rect.x + radius, rect.x + rect.width - radius);
                let cy = py.clamp(rect.y + radius, rect.y + rect.height - radius);
                if (px - cx).powi(2) + (py - cy).powi(2) <= radius * radius {
                    self.put(x, y, color);
                }
            }
        }
    }

    fn text(&mut self, text: &str, origin: (f32, f32), px: f32, color: Color) {
        let Some(font) = self.font.clone() else {
            MISSING_FONT.call_once(|| {
                tracing::warn!("No overlay font configured; text is not drawn");
            });
            return;
        };
        let scale = Scale::uniform(px);
        let ascent = font.v_metrics(scale).ascent;
        for glyph in font.layout(text, scale, point(origin.0, origin.1 + ascent)) {
            let Some(bounds) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let alpha = (color[3] as f32 * coverage).round() as u8;
                let Rgba([r, g, b, _]) = color;
                self.put(
                    bounds.min.x + gx as i32,
                    bounds.min.y + gy as i32,
                    Rgba([r, g, b, alpha]),
                );
            });
        }
    }
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Color,
    },
    Circle {
        center: (f32, f32),
        radius: f32,
        color: Color,
        filled: bool,
    },
    RoundedRect {
        rect: Rect,
        color: Color,
    },
    Text {
        text: String,
        origin: (f32, f32),
        color: Color,
    },
}

/// Canvas that records calls instead of drawing; used to check what an
/// overlay draws and in which order.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    pub width: u32,
    pub height: u32,
    pub calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: Vec::new(),
        }
    }

    /// All recorded text, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), _width: f32, color: Color) {
        self.calls.push(DrawCall::Line { from, to, color });
    }

    fn circle(&mut self, center: (f32, f32), radius: f32, color: Color, filled: bool) {
        self.calls.push(DrawCall::Circle {
            center,
            radius,
            color,
            filled,
        });
    }

    fn rounded_rect(&mut self, rect: Rect, _radius: f32, color: Color) {
        self.calls.push(DrawCall::RoundedRect { rect, color });
    }

    fn text(&mut self, text: &str, origin: (f32, f32), _px: f32, color: Color) {
        self.calls.push(DrawCall::Text {
            text: text.to_string(),
            origin,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translucent_fill_blends() {
        let frame = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let mut canvas = RasterCanvas::new(&frame, None);
        canvas.rounded_rect(
            Rect {
                x: 0.0,
                y: 0.0,
                width: 20.0,
                height: 20.0,
            },
            4.0,
            with_alpha(Rgba([255, 255, 255, 255]), 0.5),
        );
        let out = canvas.finish();
        let center = out.get_pixel(10, 10)[0];
        assert!((120..=135).contains(&center), "got {center}");
        // Rounded corner stays untouched.
        assert_eq!(out.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_drawing_outside_frame_is_clipped() {
        let frame = RgbImage::new(10, 10);
        let mut canvas = RasterCanvas::new(&frame, None);
        canvas.circle((-50.0, -50.0), 5.0, Rgba([255, 0, 0, 255]), true);
        canvas.line((-20.0, 5.0), (30.0, 5.0), 3.0, Rgba([0, 255, 0, 255]));
        canvas.text("no font", (0.0, 0.0), 12.0, Rgba([255, 255, 255, 255]));
        let out = canvas.finish();
        assert_eq!(out.get_pixel(5, 5)[1], 255);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_recording_canvas_keeps_order() {
        let mut canvas = RecordingCanvas::new(100, 50);
        canvas.text("a", (0.0, 0.0), 10.0, Rgba([0, 0, 0, 255]));
        canvas.circle((1.0, 1.0), 2.0, Rgba([0, 0, 0, 255]), true);
        canvas.text("b", (0.0, 0.0), 10.0, Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.texts(), vec!["a", "b"]);
        assert_eq!(canvas.calls.len(), 3);
        assert_eq!(canvas.size(), (100, 50));
    }
}
