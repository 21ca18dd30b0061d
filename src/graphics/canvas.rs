use glam::Vec2;
use tiny_skia::{
    Color, FillRule, GradientStop as SkiaStop, Paint, Path, PathBuilder, Pixmap, Point, RadialGradient, Rect, Shader,
    SpreadMode, Stroke, Transform,
};

use super::mapper::{CanvasGeometry, ColorGradient, Hsla, RingFrame};
use crate::error::{Result, VisualizerError};

/// Persistent RGBA surface the render loop paints onto. Nothing clears it
/// between frames, so translucent washes leave trails.
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| VisualizerError::Draw(format!("cannot allocate a {}x{} canvas", width, height)))?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn geometry(&self) -> CanvasGeometry {
        CanvasGeometry::new(self.width() as f32, self.height() as f32)
    }

    /// Premultiplied RGBA8, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Premultiplied RGBA of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixmap
            .pixel(x, y)
            .map(|p| [p.red(), p.green(), p.blue(), p.alpha()])
    }

    /// Blends `color` over the whole surface.
    pub fn wash(&mut self, color: Hsla) -> Result<()> {
        let rect = Rect::from_xywh(0.0, 0.0, self.width() as f32, self.height() as f32)
            .ok_or_else(|| VisualizerError::Draw("canvas has no area".to_string()))?;

        let mut paint = Paint::default();
        paint.set_color(to_color(color)?);
        self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        Ok(())
    }

    pub fn fill_ring(&mut self, frame: &RingFrame) -> Result<()> {
        let Some(path) = polyline(frame.points.iter().map(|p| p.position), true)? else {
            return Ok(());
        };

        let paint = gradient_paint(&frame.gradient)?;
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        Ok(())
    }

    pub fn stroke_ring(&mut self, frame: &RingFrame, width: f32) -> Result<()> {
        let Some(path) = polyline(frame.points.iter().map(|p| p.position), false)? else {
            return Ok(());
        };

        let paint = gradient_paint(&frame.gradient)?;
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        Ok(())
    }

    pub fn stroke_line(&mut self, points: &[Vec2], color: Hsla, width: f32) -> Result<()> {
        let Some(path) = polyline(points.iter().copied(), false)? else {
            return Ok(());
        };

        let mut paint = Paint::default();
        paint.set_color(to_color(color)?);
        paint.anti_alias = true;
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        Ok(())
    }
}

fn to_color(color: Hsla) -> Result<Color> {
    let [r, g, b, a] = color.to_rgba();
    Color::from_rgba(r, g, b, a).ok_or_else(|| VisualizerError::Draw(format!("invalid color {}", color)))
}

/// Builds an open or closed path. Fewer than two points is not an error,
/// there is just nothing to draw.
fn polyline(mut points: impl Iterator<Item = Vec2>, close: bool) -> Result<Option<Path>> {
    let Some(first) = points.next() else {
        return Ok(None);
    };

    let mut builder = PathBuilder::new();
    builder.move_to(first.x, first.y);
    let mut segments = 0;
    for point in points {
        builder.line_to(point.x, point.y);
        segments += 1;
    }
    if segments == 0 {
        return Ok(None);
    }
    if close {
        builder.close();
    }

    builder
        .finish()
        .map(Some)
        .ok_or_else(|| VisualizerError::Draw("path has non-finite or degenerate bounds".to_string()))
}

fn gradient_paint(gradient: &ColorGradient) -> Result<Paint<'static>> {
    let mut paint = Paint::default();
    paint.shader = gradient_shader(gradient)?;
    paint.anti_alias = true;
    Ok(paint)
}

/// tiny-skia's radial gradient runs from the center (0) to its radius (1),
/// so each stop is placed by the radius it lands on.
fn gradient_shader(gradient: &ColorGradient) -> Result<Shader<'static>> {
    let radius = gradient.start_radius.max(gradient.end_radius);
    if !(radius > 0.0) {
        return Err(VisualizerError::Draw(format!("gradient radius {} is not positive", radius)));
    }

    let mut stops = Vec::with_capacity(gradient.stops.len());
    for stop in &gradient.stops {
        let at = gradient.start_radius + (gradient.end_radius - gradient.start_radius) * stop.offset;
        stops.push((at / radius, to_color(stop.color)?));
    }
    stops.sort_by(|a, b| a.0.total_cmp(&b.0));

    let center = Point::from_xy(gradient.center.x, gradient.center.y);
    RadialGradient::new(
        center,
        center,
        radius,
        stops.into_iter().map(|(position, color)| SkiaStop::new(position, color)).collect(),
        SpreadMode::Pad,
        Transform::identity(),
    )
    .ok_or_else(|| VisualizerError::Draw("gradient could not be built".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::mapper::{map_frame, WallClock};

    const WASH: Hsla = Hsla::new(200.0, 50.0, 15.0, 0.5);

    #[test]
    fn zero_sized_canvas_is_a_draw_error() {
        assert!(matches!(Canvas::new(0, 300), Err(VisualizerError::Draw(_))));
    }

    #[test]
    fn repeated_washes_converge_on_the_wash_color() {
        let mut canvas = Canvas::new(8, 8).unwrap();
        assert_eq!(canvas.pixel(4, 4), Some([0, 0, 0, 0]));

        canvas.wash(WASH).unwrap();
        let first = canvas.pixel(4, 4).unwrap();
        assert!(first[3] > 120 && first[3] < 135);

        for _ in 0..20 {
            canvas.wash(WASH).unwrap();
        }
        let settled = canvas.pixel(4, 4).unwrap();
        assert!(settled[3] >= 250);
        assert!(settled[2] > settled[0]);
    }

    #[test]
    fn ring_fill_covers_center_not_corners() {
        let mut canvas = Canvas::new(200, 100).unwrap();
        let frame = map_frame(&vec![128u8; 256], canvas.geometry(), WallClock::from_unix_seconds(0.0));
        canvas.fill_ring(&frame).unwrap();

        assert!(canvas.pixel(100, 50).unwrap()[3] > 0);
        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(199, 99), Some([0, 0, 0, 0]));
    }

    #[test]
    fn ring_stroke_leaves_the_center_empty() {
        let mut canvas = Canvas::new(200, 200).unwrap();
        let frame = map_frame(&vec![128u8; 256], canvas.geometry(), WallClock::from_unix_seconds(0.0));
        canvas.stroke_ring(&frame, 2.0).unwrap();

        assert_eq!(canvas.pixel(100, 100), Some([0, 0, 0, 0]));
        // Silent ring radius is 75: the stroke crosses (100, 175)
        assert!(canvas.pixel(100, 175).unwrap()[3] > 0);
    }

    #[test]
    fn nothing_to_draw_is_fine() {
        let mut canvas = Canvas::new(10, 10).unwrap();
        let frame = map_frame(&[128], canvas.geometry(), WallClock::from_unix_seconds(0.0));
        canvas.fill_ring(&frame).unwrap();
        canvas.stroke_line(&[], WASH, 1.0).unwrap();
        assert_eq!(canvas.pixel(5, 5), Some([0, 0, 0, 0]));
    }

    #[test]
    fn collapsed_gradient_is_reported() {
        let mut canvas = Canvas::new(10, 10).unwrap();
        let mut frame = map_frame(&vec![128u8; 16], canvas.geometry(), WallClock::from_unix_seconds(0.0));
        frame.gradient.start_radius = 0.0;
        assert!(matches!(canvas.fill_ring(&frame), Err(VisualizerError::Draw(_))));
    }

    #[test]
    fn pixel_buffer_is_rgba8() {
        let canvas = Canvas::new(3, 2).unwrap();
        assert_eq!(canvas.pixels().len(), 3 * 2 * 4);
    }
}
