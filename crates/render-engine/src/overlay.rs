//! Telemetry overlays drawn on top of lap footage.
//!
//! Positions are laid out for 1080p and scaled by frame height.

use std::sync::Arc;

use image::{Rgba, RgbImage};
use laprender_common::config::{OverlayConfig, OverlayStyle};
use laprender_processing_core::{ProgressComparison, Side};
use laprender_telemetry::{format_lap_time, GpsBounds, Lap, MapProjection, MapRect, Trend};
use rusttype::Font;

use crate::canvas::{with_alpha, Canvas, Color, RasterCanvas, Rect};

pub const WHITE: Color = Rgba([255, 255, 255, 255]);
pub const TOP_COLOR: Color = Rgba([255, 255, 100, 255]);
pub const BOTTOM_COLOR: Color = Rgba([255, 150, 100, 255]);

/// Seconds an annotation stays on screen; the last second fades out.
pub const ANNOTATION_SECS: f64 = 3.0;
const FADE_SECS: f64 = 1.0;

const CORNER_G_THRESHOLD: f64 = 0.6;
const BRAKING_G_THRESHOLD: f64 = -0.3;

/// Everything an overlay needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct OverlayContext<'a> {
    pub lap: &'a Lap,

    /// Lap-relative seconds, already clamped to the lap.
    pub elapsed_secs: f64,

    /// False on bookend footage before or after the lap.
    pub mid_lap: bool,

    /// Fastest lap of the session, for the leaderboard.
    pub fastest: Option<&'a Lap>,

    pub track_name: Option<&'a str>,
}

/// A way of drawing telemetry over a frame.
pub trait OverlayRenderer: Send + Sync {
    fn render(&self, canvas: &mut dyn Canvas, ctx: &OverlayContext<'_>);
}

/// Render `overlay` over a copy of `frame`.
pub fn compose(
    overlay: &dyn OverlayRenderer,
    frame: &RgbImage,
    ctx: &OverlayContext<'_>,
    font: Option<Arc<Font<'static>>>,
) -> RgbImage {
    let mut canvas = RasterCanvas::new(frame, font);
    overlay.render(&mut canvas, ctx);
    canvas.finish()
}

/// Overlay selected by configuration.
pub fn overlay_for(config: &OverlayConfig) -> Arc<dyn OverlayRenderer> {
    match config.style {
        OverlayStyle::Basic => Arc::new(BasicOverlay),
        OverlayStyle::Track => Arc::new(TrackOverlay {
            watermark: config.watermark.clone(),
            show_map: config.show_map,
        }),
    }
}

/// Opacity of an annotation `age` seconds after its marker.
pub fn annotation_alpha(age: f64) -> f32 {
    if !(0.0..ANNOTATION_SECS).contains(&age) {
        return 0.0;
    }
    let fade_start = ANNOTATION_SECS - FADE_SECS;
    if age < fade_start {
        1.0
    } else {
        ((ANNOTATION_SECS - age) / FADE_SECS) as f32
    }
}

/// `Lap Time: MM:SS.mmm`
pub fn lap_clock(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor();
    format!("Lap Time: {:02}:{:06.3}", minutes as u32, seconds - minutes * 60.0)
}

fn scale_of(canvas: &dyn Canvas) -> f32 {
    canvas.size().1 as f32 / 1080.0
}

/// Plain text readout.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicOverlay;

impl OverlayRenderer for BasicOverlay {
    fn render(&self, canvas: &mut dyn Canvas, ctx: &OverlayContext<'_>) {
        let s = scale_of(canvas);
        let t = ctx.elapsed_secs;
        let lines = [
            lap_clock(t),
            format!("{:6.0} MPH", ctx.lap.speed_at(t)),
            format!("Lat G: {:+.2}", ctx.lap.lat_g_at(t)),
            format!("Lin G: {:+.2}", ctx.lap.lin_g_at(t)),
        ];
        for (i, line) in lines.iter().enumerate() {
            canvas.text(line, (40.0 * s, (40.0 + 60.0 * i as f32) * s), 48.0 * s, WHITE);
        }
    }
}

/// Full track-day overlay: clock, speed, g-meter, annotations, map, leaderboard.
#[derive(Debug, Clone)]
pub struct TrackOverlay {
    pub watermark: String,
    pub show_map: bool,
}

impl OverlayRenderer for TrackOverlay {
    fn render(&self, canvas: &mut dyn Canvas, ctx: &OverlayContext<'_>) {
        let (w, h) = canvas.size();
        let s = scale_of(canvas);
        let t = ctx.elapsed_secs;
        let lap = ctx.lap;

        canvas.text(
            &self.watermark,
            (20.0 * s, h as f32 - 50.0 * s),
            28.0 * s,
            with_alpha(WHITE, 0.6),
        );
        canvas.text(&lap_clock(t), (200.0 * s, 100.0 * s), 56.0 * s, WHITE);
        canvas.text(
            &format!("{:6.0} MPH", lap.speed_at(t)),
            (900.0 * s, 100.0 * s),
            56.0 * s,
            WHITE,
        );

        draw_g_meter(canvas, lap.lat_g_at(t), lap.lin_g_at(t), s);
        if ctx.mid_lap {
            draw_annotations(canvas, lap, t, s);
        }

        let map = map_rect(w, s);
        if self.show_map {
            let projection = MapProjection::fit(lap.gps_bounds(), map);
            draw_track_outline(canvas, lap, &projection, 3.0 * s);
            draw_marker(canvas, lap, t, &projection, 10.0 * s, TOP_COLOR);
        }
        if let Some(name) = ctx.track_name {
            canvas.text(name, (map.x, map.y - 50.0 * s), 36.0 * s, WHITE);
        }
        if let Some(fastest) = ctx.fastest {
            draw_leaderboard(canvas, lap, fastest, (map.x, map.y + map.height + 30.0 * s), s);
        }
    }
}

/// Mini-map area in the top-right corner.
pub fn map_rect(frame_width: u32, s: f32) -> MapRect {
    MapRect {
        x: frame_width as f32 - 350.0 * s,
        y: 150.0 * s,
        width: 300.0 * s,
        height: 300.0 * s,
    }
}

/// Translucent g-meter in the bottom-left corner with a ball at the current g.
fn draw_g_meter(canvas: &mut dyn Canvas, lat_g: f64, lin_g: f64, s: f32) {
    let (_, h) = canvas.size();
    let radius = 75.0 * s;
    let center = (radius + 5.0 * s, h as f32 - (radius + 35.0 * s));

    canvas.circle(center, radius, with_alpha(WHITE, 0.2), true);
    canvas.circle(center, radius * 0.65, with_alpha(WHITE, 0.5), false);
    canvas.circle(center, radius * 0.3, with_alpha(WHITE, 0.5), false);
    let cross = with_alpha(WHITE, 0.5);
    canvas.line(
        (center.0 - radius, center.1),
        (center.0 + radius, center.1),
        1.0,
        cross,
    );
    canvas.line(
        (center.0, center.1 - radius),
        (center.0, center.1 + radius),
        1.0,
        cross,
    );

    let ball = (
        center.0 + radius * (-lat_g / 2.0) as f32,
        center.1 + radius * (lin_g / 2.0) as f32,
    );
    canvas.circle(ball, 8.0 * s, TOP_COLOR, true);
    let total = (lat_g * lat_g + lin_g * lin_g).sqrt();
    canvas.text(
        &format!("{total:6.2}g"),
        (center.0 + radius + 10.0 * s, center.1 - 15.0 * s),
        32.0 * s,
        WHITE,
    );
}

/// Apex/straight speed, peak cornering g, and peak braking g.
fn draw_annotations(canvas: &mut dyn Canvas, lap: &Lap, t: f64, s: f32) {
    let px = 40.0 * s;
    if let Some(change) = lap.nearest_speed_change(t) {
        let alpha = annotation_alpha(t - change.seconds);
        if alpha > 0.0 {
            let label = match change.direction {
                Trend::Rising => "Straight",
                Trend::Falling => "Corner",
            };
            canvas.text(
                &format!("{label} {:6.2} mph", change.value),
                (200.0 * s, 200.0 * s),
                px,
                with_alpha(WHITE, alpha),
            );
        }
    }
    if let Some(change) = lap.nearest_lat_g_change(t) {
        let alpha = annotation_alpha(t - change.seconds);
        if alpha > 0.0 && change.value.abs() > CORNER_G_THRESHOLD {
            canvas.text(
                &format!("Max Corner Gs:  {:4.2}", change.value.abs()),
                (200.0 * s, 250.0 * s),
                px,
                with_alpha(WHITE, alpha),
            );
        }
    }
    if let Some(change) = lap.nearest_lin_g_change(t) {
        let alpha = annotation_alpha(t - change.seconds);
        if alpha > 0.0 && change.direction == Trend::Falling && change.value < BRAKING_G_THRESHOLD {
            canvas.text(
                &format!("Max Braking Gs:  {:4.2}", change.value.abs()),
                (200.0 * s, 300.0 * s),
                px,
                with_alpha(WHITE, alpha),
            );
        }
    }
}

fn draw_leaderboard(canvas: &mut dyn Canvas, lap: &Lap, fastest: &Lap, origin: (f32, f32), s: f32) {
    canvas.rounded_rect(
        Rect {
            x: origin.0 - 10.0 * s,
            y: origin.1 - 5.0 * s,
            width: 320.0 * s,
            height: 90.0 * s,
        },
        10.0 * s,
        with_alpha(Rgba([0, 0, 0, 255]), 0.4),
    );
    canvas.text(
        &format!("Best: Lap {} {}", fastest.index(), format_lap_time(fastest.lap_time())),
        origin,
        32.0 * s,
        WHITE,
    );
    if lap.index() != fastest.index() {
        canvas.text(
            &format!("This lap {:+.3}", lap.lap_time() - fastest.lap_time()),
            (origin.0, origin.1 + 40.0 * s),
            32.0 * s,
            WHITE,
        );
    }
}

/// Projected polyline of every fix in the lap.
pub fn draw_track_outline(canvas: &mut dyn Canvas, lap: &Lap, projection: &MapProjection, width: f32) {
    let points: Vec<(f32, f32)> = lap
        .fixes()
        .iter()
        .map(|f| projection.project(laprender_telemetry::GeoPoint::new(f.lat, f.long)))
        .collect();
    for pair in points.windows(2) {
        canvas.line(pair[0], pair[1], width, WHITE);
    }
}

/// Current-position dot on the map.
pub fn draw_marker(
    canvas: &mut dyn Canvas,
    lap: &Lap,
    t: f64,
    projection: &MapProjection,
    radius: f32,
    color: Color,
) {
    canvas.circle(projection.project(lap.gps_at_time(t)), radius, color, true);
}

/// Comparison panel drawn across the seam of a dual render.
#[derive(Debug, Clone, Copy, Default)]
pub struct DualPanel;

impl DualPanel {
    /// Draw both laps' positions and the distance delta. Nothing is drawn
    /// while the top lap is outside its strict window.
    pub fn render(
        &self,
        canvas: &mut dyn Canvas,
        top: &OverlayContext<'_>,
        bottom: &OverlayContext<'_>,
    ) -> Option<ProgressComparison> {
        if !top.mid_lap {
            return None;
        }
        let (w, h) = canvas.size();
        let s = scale_of(canvas);
        let comparison =
            ProgressComparison::at(top.lap, top.elapsed_secs, bottom.lap, bottom.elapsed_secs);

        let x = w as f32 / 2.0 - 300.0 * s;
        let y = h as f32 / 2.0 + 50.0 * s;
        canvas.text("Top vs.", (x, y), 40.0 * s, TOP_COLOR);
        canvas.text("Bottom:", (x + 160.0 * s, y), 40.0 * s, BOTTOM_COLOR);
        canvas.text(
            &format!("{:4.2}%", comparison.delta_percent()),
            (x + 320.0 * s, y),
            40.0 * s,
            WHITE,
        );

        let bounds = merged_bounds(top.lap.gps_bounds(), bottom.lap.gps_bounds());
        let map = MapRect {
            y: h as f32 / 2.0 - 150.0 * s,
            ..map_rect(w, s)
        };
        let projection = MapProjection::fit(&bounds, map);
        draw_track_outline(canvas, top.lap, &projection, 3.0 * s);
        for side in comparison.draw_order() {
            let (ctx, color) = match side {
                Side::Top => (top, TOP_COLOR),
                Side::Bottom => (bottom, BOTTOM_COLOR),
            };
            draw_marker(canvas, ctx.lap, ctx.elapsed_secs, &projection, 10.0 * s, color);
        }
        Some(comparison)
    }
}

fn merged_bounds(a: &GpsBounds, b: &GpsBounds) -> GpsBounds {
    GpsBounds {
        min_lat: a.min_lat.min(b.min_lat),
        max_lat: a.max_lat.max(b.max_lat),
        min_long: a.min_long.min(b.min_long),
        max_long: a.max_long.max(b.max_long),
    }
}
