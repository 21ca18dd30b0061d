//! Maps one waveform snapshot onto a ring of points and a radial gradient.
//!
//! Samples are bytes with 128 as silence. Each index becomes one vertex
//! around the canvas center; louder samples push the vertex outward. The
//! ring's seam (last index meeting index 0) is hidden by blending samples
//! near either end with their mirror across the seam.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Samples on each side of the seam that get blended.
pub const SMOOTHING_SPAN: usize = 20;

/// Gradient stop offsets, outer edge first.
pub const GRADIENT_OFFSETS: [f32; 4] = [0.0, 0.2, 0.5, 1.0];

/// Stop lightness in percent, matching `GRADIENT_OFFSETS`.
pub const GRADIENT_LIGHTNESS: [f32; 4] = [65.0, 60.0, 50.0, 40.0];

pub const GRADIENT_ALPHA: f32 = 0.3;

/// CSS-style color: hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsla {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
    pub alpha: f32,
}

impl Hsla {
    pub const fn new(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        Self {
            hue,
            saturation,
            lightness,
            alpha,
        }
    }

    /// Straight (non-premultiplied) RGBA in [0, 1].
    pub fn to_rgba(self) -> [f32; 4] {
        let h = self.hue.rem_euclid(360.0) / 360.0;
        let s = (self.saturation / 100.0).clamp(0.0, 1.0);
        let l = (self.lightness / 100.0).clamp(0.0, 1.0);
        let a = self.alpha.clamp(0.0, 1.0);

        if s == 0.0 {
            return [l, l, l, a];
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        [
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
            a,
        ]
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

impl fmt::Display for Hsla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsla({},{}%,{}%,{})",
            self.hue, self.saturation, self.lightness, self.alpha
        )
    }
}

/// Drawing surface size and the radii derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    pub width: f32,
    pub height: f32,
}

impl CanvasGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// The limiting dimension.
    pub fn bound(&self) -> f32 {
        self.width.min(self.height)
    }

    pub fn inner_radius(&self) -> f32 {
        self.bound() / 2.0
    }

    pub fn outer_radius(&self) -> f32 {
        self.bound() / 4.0
    }
}

/// Wall-clock time fed to the hue animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallClock {
    unix_seconds: f64,
}

impl WallClock {
    pub fn now() -> Self {
        let unix_seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self { unix_seconds }
    }

    pub fn from_unix_seconds(unix_seconds: f64) -> Self {
        Self { unix_seconds }
    }

    /// Last digit of the rounded second, divided by 10: cycles 0.0..=0.9
    /// once every ten seconds.
    pub fn second_component(&self) -> f32 {
        let seconds = self.unix_seconds.max(0.0).round() as u64;
        (seconds % 10) as f32 / 10.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingPoint {
    pub position: Vec2,
    pub angle: f32,
    pub radius: f32,
    pub magnitude: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Hsla,
}

/// Radial gradient between two concentric circles. Offset 0 sits on
/// `start_radius`, offset 1 on `end_radius`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGradient {
    pub center: Vec2,
    pub start_radius: f32,
    pub end_radius: f32,
    pub stops: [GradientStop; 4],
}

impl ColorGradient {
    pub fn hue(&self) -> f32 {
        self.stops[0].color.hue
    }

    pub fn saturation(&self) -> f32 {
        self.stops[0].color.saturation
    }
}

/// Tunable parts of the mapping; `Default` reproduces the stock look.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperStyle {
    pub smoothing_span: usize,
    pub lightness: [f32; 4],
    pub alpha: f32,
}

impl Default for MapperStyle {
    fn default() -> Self {
        Self {
            smoothing_span: SMOOTHING_SPAN,
            lightness: GRADIENT_LIGHTNESS,
            alpha: GRADIENT_ALPHA,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RingFrame {
    pub points: Vec<RingPoint>,
    pub gradient: ColorGradient,
}

/// Normalised blend weight for index `i`: 1.0 on the seam, falling linearly
/// to 0.0 at `span` samples away. Half of it is the mirror's share of the mix.
pub fn edge_blend_weight(i: usize, len: usize, span: usize) -> f32 {
    if span == 0 || len == 0 {
        return 0.0;
    }
    let distance = i.min(len.saturating_sub(i));
    if distance >= span {
        0.0
    } else {
        (span - distance) as f32 / span as f32
    }
}

/// Magnitude of sample `i` in [0, 2], blended across the seam.
pub fn smoothed_magnitude(snapshot: &[u8], i: usize, span: usize) -> f32 {
    let len = snapshot.len();
    let magnitude = snapshot[i] as f32 / 128.0;

    let weight = edge_blend_weight(i, len, span);
    if weight == 0.0 {
        return magnitude;
    }

    let mirror = snapshot[(len - i) % len] as f32 / 128.0;
    let strength = weight / 2.0;
    magnitude * (1.0 - strength) + mirror * strength
}

/// Builds this frame's gradient from a single magnitude. `None` (no signal)
/// drops the magnitude terms so the color stays finite.
pub fn gradient_for(
    magnitude: Option<f32>,
    geometry: CanvasGeometry,
    clock: WallClock,
    style: &MapperStyle,
) -> ColorGradient {
    let magnitude = magnitude.filter(|m| m.is_finite()).unwrap_or(0.0);

    let hue = (clock.second_component() * 80.0 + magnitude * magnitude * 360.0) % 360.0;
    let saturation = 80.0 + magnitude * 20.0;

    let stops = std::array::from_fn(|k| GradientStop {
        offset: GRADIENT_OFFSETS[k],
        color: Hsla::new(hue, saturation, style.lightness[k], style.alpha),
    });

    ColorGradient {
        center: geometry.center(),
        start_radius: geometry.inner_radius(),
        end_radius: 0.0,
        stops,
    }
}

pub fn map_frame(snapshot: &[u8], geometry: CanvasGeometry, clock: WallClock) -> RingFrame {
    map_frame_with(snapshot, geometry, clock, &MapperStyle::default())
}

pub fn map_frame_with(
    snapshot: &[u8],
    geometry: CanvasGeometry,
    clock: WallClock,
    style: &MapperStyle,
) -> RingFrame {
    let len = snapshot.len();
    let center = geometry.center();
    let inner = geometry.inner_radius();
    let outer = geometry.outer_radius();
    let last_index = len.saturating_sub(1).max(1) as f32;

    let points: Vec<RingPoint> = (0..len)
        .map(|i| {
            let magnitude = smoothed_magnitude(snapshot, i, style.smoothing_span);
            let angle = i as f32 / last_index * TAU;
            let radius = (inner + magnitude * outer) / 2.0;
            let unit = Vec2::new(angle.sin(), angle.cos());

            RingPoint {
                position: center + unit * radius,
                angle,
                radius,
                magnitude,
            }
        })
        .collect();

    // Only the last point's magnitude colors the frame
    let gradient = gradient_for(points.last().map(|p| p.magnitude), geometry, clock, style);

    RingFrame { points, gradient }
}

/// Left-to-right oscilloscope trace: x spreads the samples across the width,
/// y is the magnitude scaled to half the height.
pub fn line_points(snapshot: &[u8], geometry: CanvasGeometry) -> Vec<Vec2> {
    let len = snapshot.len().max(1) as f32;
    std::iter::once(Vec2::new(0.0, geometry.height / 2.0))
        .chain(snapshot.iter().enumerate().map(|(i, &sample)| {
            let magnitude = sample as f32 / 128.0;
            Vec2::new(
                i as f32 / len * geometry.width,
                magnitude * geometry.height / 2.0,
            )
        }))
        .collect()
}
