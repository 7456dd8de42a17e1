use serde::{Deserialize, Serialize};

/// Straight-alpha sRGB color.
///
/// Channels `r`, `g`, `b` are bytes; `a` is clamped into `[0, 1]` by every
/// constructor. Premultiplication happens only when a paint is compiled for
/// rendering ([`Color::to_premultiplied`]).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0.0 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 1.0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 1.0 };

    #[inline]
    pub fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a: clamp_unit(a) }
    }

    #[inline]
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Builds a color from normalized `[0, 1]` channels; out-of-range values clamp.
    pub fn from_normalized(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: unit_to_byte(r),
            g: unit_to_byte(g),
            b: unit_to_byte(b),
            a: clamp_unit(a),
        }
    }

    /// Builds a color from channels that may exceed `[0, 255]`, as found in
    /// loosely validated input. NaN channels become 0.
    pub fn from_loose(r: f64, g: f64, b: f64, a: f64) -> Self {
        fn byte(v: f64) -> u8 {
            if v.is_nan() { 0 } else { v.round().clamp(0.0, 255.0) as u8 }
        }
        Self {
            r: byte(r),
            g: byte(g),
            b: byte(b),
            a: clamp_unit(a as f32),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a: clamp_unit(a), ..self }
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }

    /// Normalized straight-alpha channels.
    pub fn to_normalized(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            self.a,
        ]
    }

    /// Normalized premultiplied channels, the layout GPU blending expects.
    pub fn to_premultiplied(self) -> [f32; 4] {
        let [r, g, b, a] = self.to_normalized();
        [r * a, g * a, b * a, a]
    }

    /// `#rrggbb` without alpha, as used by markup exporters.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[inline]
fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[inline]
fn unit_to_byte(v: f32) -> u8 {
    (clamp_unit(v) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_is_clamped_on_construction() {
        assert_eq!(Color::rgba(1, 2, 3, 7.0).a, 1.0);
        assert_eq!(Color::rgba(1, 2, 3, -1.0).a, 0.0);
        assert_eq!(Color::rgba(1, 2, 3, f32::NAN).a, 0.0);
    }

    #[test]
    fn normalized_channels_round_to_bytes() {
        let c = Color::from_normalized(1.0, 0.5, 0.0, 0.25);
        assert_eq!((c.r, c.g, c.b), (255, 128, 0));
        assert_eq!(c.a, 0.25);
    }

    #[test]
    fn loose_channels_clamp() {
        let c = Color::from_loose(300.0, -4.0, f64::NAN, 2.0);
        assert_eq!(c, Color::rgba(255, 0, 0, 1.0));
    }

    #[test]
    fn premultiplied_scales_rgb_by_alpha() {
        let [r, g, b, a] = Color::rgba(255, 0, 255, 0.5).to_premultiplied();
        assert_eq!((r, g, b, a), (0.5, 0.0, 0.5, 0.5));
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(Color::rgb(255, 16, 0).to_hex(), "#ff1000");
    }
}
