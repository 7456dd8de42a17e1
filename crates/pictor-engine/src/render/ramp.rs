use std::hash::{Hash, Hasher};

use crate::paint::{hash_stops, sample_stops, GradientStop};

/// Texels per gradient ramp.
pub const RAMP_WIDTH: usize = 256;

/// Cache key of a ramp: a fingerprint of its normalized stop list.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RampKey(pub u64);

impl RampKey {
    pub fn of(stops: &[GradientStop]) -> Self {
        let mut h = std::collections::hash_map::DefaultHasher::new();
        hash_stops(stops, &mut h);
        RampKey(h.finish())
    }
}

/// A gradient's color ramp, sampled once on the CPU.
///
/// Texels are premultiplied RGBA8; the GPU path looks colors up here instead
/// of walking stops per fragment. The source stops are kept for backends that
/// emit native gradients (SVG, PDF).
#[derive(Debug, Clone, PartialEq)]
pub struct GradientRamp {
    pub key: RampKey,
    pub stops: Vec<GradientStop>,
    pub texels: Vec<[u8; 4]>,
}

impl GradientRamp {
    /// Builds a ramp from an already-normalized stop list.
    pub fn build(stops: &[GradientStop]) -> Self {
        let texels = (0..RAMP_WIDTH)
            .map(|i| {
                let t = i as f32 / (RAMP_WIDTH - 1) as f32;
                let [r, g, b, a] = sample_stops(stops, t).to_premultiplied();
                [unorm8(r), unorm8(g), unorm8(b), unorm8(a)]
            })
            .collect();
        Self {
            key: RampKey::of(stops),
            stops: stops.to_vec(),
            texels,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Color;

    #[test]
    fn ramp_endpoints_match_stops() {
        let stops = [
            GradientStop::new(0.0, Color::rgb(255, 0, 0)),
            GradientStop::new(1.0, Color::rgb(0, 0, 255)),
        ];
        let ramp = GradientRamp::build(&stops);
        assert_eq!(ramp.texels.len(), RAMP_WIDTH);
        assert_eq!(ramp.texels[0], [255, 0, 0, 255]);
        assert_eq!(ramp.texels[RAMP_WIDTH - 1], [0, 0, 255, 255]);
        assert_eq!(ramp.as_bytes().len(), RAMP_WIDTH * 4);
    }

    #[test]
    fn texels_are_premultiplied() {
        let half = Color::rgba(255, 255, 255, 0.5);
        let ramp = GradientRamp::build(&[GradientStop::new(0.0, half), GradientStop::new(1.0, half)]);
        assert_eq!(ramp.texels[10], [128, 128, 128, 128]);
    }

    #[test]
    fn equal_stops_share_a_key() {
        let a = [GradientStop::new(0.0, Color::BLACK), GradientStop::new(1.0, Color::WHITE)];
        let b = [GradientStop::new(0.0, Color::BLACK), GradientStop::new(0.5, Color::WHITE)];
        assert_eq!(RampKey::of(&a), RampKey::of(&a.clone()));
        assert_ne!(RampKey::of(&a), RampKey::of(&b));
    }
}
