use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Color, Gradient, GradientStop};

/// Stable paint identity used for UI diffing and compiled-paint caching.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaintId(Uuid);

impl PaintId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PaintId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Paint variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaintKind {
    Solid { color: Color },
    LinearGradient(Gradient),
    RadialGradient(Gradient),
}

/// Variant selector for [`convert`](super::convert).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintType {
    Solid,
    LinearGradient,
    RadialGradient,
}

impl PaintType {
    pub fn is_gradient(self) -> bool {
        !matches!(self, PaintType::Solid)
    }
}

/// A fill or stroke applied to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    #[serde(default)]
    pub id: PaintId,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(flatten)]
    pub kind: PaintKind,
}

fn default_opacity() -> f32 {
    1.0
}

impl Paint {
    pub fn new(kind: PaintKind) -> Self {
        Self {
            id: PaintId::new(),
            opacity: 1.0,
            kind,
        }
    }

    pub fn solid(color: Color) -> Self {
        Self::new(PaintKind::Solid { color })
    }

    pub fn linear(stops: Vec<GradientStop>) -> Self {
        Self::new(PaintKind::LinearGradient(Gradient::new(stops)))
    }

    pub fn radial(stops: Vec<GradientStop>) -> Self {
        Self::new(PaintKind::RadialGradient(Gradient::new(stops)))
    }

    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
        self
    }

    pub fn paint_type(&self) -> PaintType {
        match self.kind {
            PaintKind::Solid { .. } => PaintType::Solid,
            PaintKind::LinearGradient(_) => PaintType::LinearGradient,
            PaintKind::RadialGradient(_) => PaintType::RadialGradient,
        }
    }

    pub fn gradient(&self) -> Option<&Gradient> {
        match &self.kind {
            PaintKind::Solid { .. } => None,
            PaintKind::LinearGradient(g) | PaintKind::RadialGradient(g) => Some(g),
        }
    }

    pub fn gradient_mut(&mut self) -> Option<&mut Gradient> {
        match &mut self.kind {
            PaintKind::Solid { .. } => None,
            PaintKind::LinearGradient(g) | PaintKind::RadialGradient(g) => Some(g),
        }
    }

    /// True when nothing painted through this paint can be translucent.
    pub fn is_opaque(&self) -> bool {
        if self.opacity < 1.0 {
            return false;
        }
        match &self.kind {
            PaintKind::Solid { color } => color.is_opaque(),
            PaintKind::LinearGradient(g) | PaintKind::RadialGradient(g) => {
                g.stops.iter().all(|s| s.color.is_opaque())
            }
        }
    }

    /// Fingerprint of everything that affects rendering. Identity is excluded,
    /// so two paints with equal content hash equally.
    pub fn content_hash(&self) -> u64 {
        let mut h = std::collections::hash_map::DefaultHasher::new();
        self.opacity.to_bits().hash(&mut h);
        match &self.kind {
            PaintKind::Solid { color } => {
                0u8.hash(&mut h);
                hash_color(color, &mut h);
            }
            PaintKind::LinearGradient(g) => {
                1u8.hash(&mut h);
                hash_gradient(g, &mut h);
            }
            PaintKind::RadialGradient(g) => {
                2u8.hash(&mut h);
                hash_gradient(g, &mut h);
            }
        }
        h.finish()
    }
}

pub(crate) fn hash_color(c: &Color, h: &mut impl Hasher) {
    (c.r, c.g, c.b, c.a.to_bits()).hash(h);
}

pub(crate) fn hash_stops(stops: &[GradientStop], h: &mut impl Hasher) {
    stops.len().hash(h);
    for s in stops {
        s.offset.to_bits().hash(h);
        hash_color(&s.color, h);
    }
}

fn hash_gradient(g: &Gradient, h: &mut impl Hasher) {
    hash_stops(&g.stops, h);
    for c in g.transform.coeffs() {
        c.to_bits().hash(h);
    }
}
