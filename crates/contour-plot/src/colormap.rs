//! Colour ramps for filled contour bands.

use serde::{Deserialize, Serialize};

/// An RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    pub fn rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Linear blend between two colours, `t` in [0, 1].
fn interpolate_color(color1: Color, color2: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f64 * (1.0 - t) + b as f64 * t).round() as u8;
    Color {
        r: mix(color1.r, color2.r),
        g: mix(color1.g, color2.g),
        b: mix(color1.b, color2.b),
        a: mix(color1.a, color2.a),
    }
}

/// Piecewise-linear colour ramp over [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colormap {
    stops: Vec<(f64, Color)>,
}

impl Default for Colormap {
    /// Dark blue through teal and green to yellow.
    fn default() -> Self {
        Self {
            stops: vec![
                (0.0, Color::new(68, 1, 84, 255)),
                (0.25, Color::new(59, 82, 139, 255)),
                (0.5, Color::new(33, 145, 140, 255)),
                (0.75, Color::new(94, 201, 98, 255)),
                (1.0, Color::new(253, 231, 37, 255)),
            ],
        }
    }
}

impl Colormap {
    /// Build from `(position, colour)` stops; positions are sorted.
    pub fn new(mut stops: Vec<(f64, Color)>) -> Self {
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { stops }
    }

    /// Colour at position `t`, clamped to the end stops.
    pub fn sample(&self, t: f64) -> Color {
        let Some(&(first_pos, first)) = self.stops.first() else {
            return Color::transparent();
        };
        if t <= first_pos {
            return first;
        }
        for pair in self.stops.windows(2) {
            let (p0, c0) = pair[0];
            let (p1, c1) = pair[1];
            if t <= p1 {
                let span = p1 - p0;
                let local = if span > 0.0 { (t - p0) / span } else { 1.0 };
                return interpolate_color(c0, c1, local);
            }
        }
        self.stops[self.stops.len() - 1].1
    }

    /// One colour per band, spread evenly along the ramp.
    pub fn band_colors(&self, bands: usize) -> Vec<Color> {
        match bands {
            0 => Vec::new(),
            1 => vec![self.sample(0.5)],
            n => (0..n)
                .map(|i| self.sample(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_endpoints_and_midpoint() {
        let map = Colormap::new(vec![
            (0.0, Color::new(0, 0, 0, 255)),
            (1.0, Color::new(200, 100, 50, 255)),
        ]);
        assert_eq!(map.sample(-1.0), Color::new(0, 0, 0, 255));
        assert_eq!(map.sample(2.0), Color::new(200, 100, 50, 255));
        assert_eq!(map.sample(0.5), Color::new(100, 50, 25, 255));
    }

    #[test]
    fn test_band_colors_span_ramp() {
        let map = Colormap::default();
        let colors = map.band_colors(10);
        assert_eq!(colors.len(), 10);
        assert_eq!(colors[0], Color::new(68, 1, 84, 255));
        assert_eq!(colors[9], Color::new(253, 231, 37, 255));
        assert!(colors.iter().all(|c| c.a == 255));
    }
}
