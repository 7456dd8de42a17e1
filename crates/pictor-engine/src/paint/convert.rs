use crate::geometry::Transform;

use super::{Color, Gradient, GradientStop, Paint, PaintKind, PaintType};

/// Second stop color produced when a solid paint becomes a gradient:
/// white, carrying the source color's alpha.
pub fn derived_second_color(source: Color) -> Color {
    Color::WHITE.with_alpha(source.a)
}

/// Converts `paint` to the `target` variant.
///
/// - Solid to gradient: two stops, `(0, color)` and `(1, derived_second_color(color))`,
///   identity transform.
/// - Gradient to solid: the first stop's color. A stop-less gradient yields transparent.
/// - Gradient to the other gradient kind: same stops, transform reset to identity.
/// - Same variant: an equal copy.
///
/// Identity and opacity carry over unchanged.
pub fn convert(paint: &Paint, target: PaintType) -> Paint {
    let kind = match (&paint.kind, target) {
        (PaintKind::Solid { .. }, PaintType::Solid)
        | (PaintKind::LinearGradient(_), PaintType::LinearGradient)
        | (PaintKind::RadialGradient(_), PaintType::RadialGradient) => paint.kind.clone(),

        (PaintKind::Solid { color }, PaintType::LinearGradient) => {
            PaintKind::LinearGradient(two_stop(*color))
        }
        (PaintKind::Solid { color }, PaintType::RadialGradient) => {
            PaintKind::RadialGradient(two_stop(*color))
        }

        (PaintKind::LinearGradient(g) | PaintKind::RadialGradient(g), PaintType::Solid) => {
            PaintKind::Solid {
                color: g.stops.first().map_or(Color::TRANSPARENT, |s| s.color),
            }
        }

        (PaintKind::RadialGradient(g), PaintType::LinearGradient) => {
            PaintKind::LinearGradient(Gradient::new(g.stops.clone()))
        }
        (PaintKind::LinearGradient(g), PaintType::RadialGradient) => {
            PaintKind::RadialGradient(Gradient::new(g.stops.clone()))
        }
    };

    Paint {
        id: paint.id,
        opacity: paint.opacity,
        kind,
    }
}

fn two_stop(color: Color) -> Gradient {
    Gradient {
        stops: vec![
            GradientStop::new(0.0, color),
            GradientStop::new(1.0, derived_second_color(color)),
        ],
        transform: Transform::IDENTITY,
    }
}
