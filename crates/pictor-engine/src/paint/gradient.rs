use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geometry::Transform;

use super::Color;

/// A single gradient stop.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

impl GradientStop {
    #[inline]
    pub const fn new(offset: f32, color: Color) -> Self {
        Self { offset, color }
    }
}

/// Stops and paint-space transform shared by linear and radial gradients.
///
/// `transform` maps gradient space onto the node's paint box, where the unit
/// square covers the node's local geometry bounds. In gradient space a linear
/// gradient runs from `(0, 0)` to `(1, 0)`; a radial gradient is centered at
/// `(0.5, 0.5)` with radius `0.5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub stops: Vec<GradientStop>,
    #[serde(default)]
    pub transform: Transform,
}

impl Gradient {
    pub fn new(stops: Vec<GradientStop>) -> Self {
        Self {
            stops,
            transform: Transform::IDENTITY,
        }
    }

    /// Returns a copy with normalized stops, or the normalization error.
    pub fn normalized(&self) -> Result<Gradient, ValidationError> {
        Ok(Gradient {
            stops: normalize_stops(&self.stops)?,
            transform: self.transform,
        })
    }

    /// True when every stop shares the same alpha.
    pub fn has_uniform_alpha(&self) -> bool {
        match self.stops.first() {
            Some(first) => self.stops.iter().all(|s| s.color.a == first.color.a),
            None => true,
        }
    }
}

/// Normalizes a stop list.
///
/// Stops with a non-finite offset are dropped, the rest are clamped into
/// `[0, 1]` and stably sorted by offset, so stops with equal offsets keep
/// their relative order. Fails with `TooFewStops` when fewer than two stops
/// remain. The result is a fixed point: normalizing it again returns it unchanged.
pub fn normalize_stops(stops: &[GradientStop]) -> Result<Vec<GradientStop>, ValidationError> {
    let mut out: Vec<GradientStop> = stops
        .iter()
        .filter(|s| s.offset.is_finite())
        .map(|s| GradientStop::new(s.offset.clamp(0.0, 1.0), s.color))
        .collect();

    if out.len() < 2 {
        return Err(ValidationError::TooFewStops { found: out.len() });
    }

    // Stable; -0.0 and 0.0 compare equal here, unlike `total_cmp`.
    out.sort_by(|a, b| a.offset.partial_cmp(&b.offset).unwrap_or(Ordering::Equal));
    Ok(out)
}

/// True when offsets are finite, within `[0, 1]`, non-decreasing and at least two.
pub fn stops_are_normalized(stops: &[GradientStop]) -> bool {
    stops.len() >= 2
        && stops.iter().all(|s| s.offset.is_finite() && (0.0..=1.0).contains(&s.offset))
        && stops.windows(2).all(|w| w[0].offset <= w[1].offset)
}

/// Color at `t` on a normalized stop list (straight alpha, linear interpolation in sRGB).
pub fn sample_stops(stops: &[GradientStop], t: f32) -> Color {
    let Some(first) = stops.first() else {
        return Color::TRANSPARENT;
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            if span <= f32::EPSILON {
                return b.color;
            }
            let k = (t - a.offset) / span;
            let [ar, ag, ab, aa] = a.color.to_normalized();
            let [br, bg, bb, ba] = b.color.to_normalized();
            return Color::from_normalized(
                ar + (br - ar) * k,
                ag + (bg - ag) * k,
                ab + (bb - ab) * k,
                aa + (ba - aa) * k,
            );
        }
    }
    stops[stops.len() - 1].color
}
