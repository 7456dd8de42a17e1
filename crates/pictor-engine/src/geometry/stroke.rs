use kurbo::{BezPath, Cap, Join, Stroke, StrokeOpts};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Outline parameters applied to every stroke paint of a node.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeStyle {
    pub width: f64,
    pub join: StrokeJoin,
    pub cap: StrokeCap,
    pub miter_limit: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            join: StrokeJoin::Miter,
            cap: StrokeCap::Butt,
            miter_limit: 4.0,
        }
    }
}

impl StrokeStyle {
    pub fn with_width(width: f64) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Distance the stroke reaches outside the geometry outline.
    ///
    /// Miter joins can extend up to `miter_limit * width / 2`.
    pub fn outset(&self) -> f64 {
        let half = self.width.max(0.0) / 2.0;
        match self.join {
            StrokeJoin::Miter => half * self.miter_limit.max(1.0),
            StrokeJoin::Round | StrokeJoin::Bevel => half,
        }
    }

    /// Expands `path` into the filled outline of its stroke (nonzero winding).
    pub fn outline(&self, path: &BezPath, tolerance: f64) -> BezPath {
        let join = match self.join {
            StrokeJoin::Miter => Join::Miter,
            StrokeJoin::Round => Join::Round,
            StrokeJoin::Bevel => Join::Bevel,
        };
        let cap = match self.cap {
            StrokeCap::Butt => Cap::Butt,
            StrokeCap::Round => Cap::Round,
            StrokeCap::Square => Cap::Square,
        };
        let style = Stroke::new(self.width)
            .with_join(join)
            .with_caps(cap)
            .with_miter_limit(self.miter_limit);
        kurbo::stroke(path.iter(), &style, &StrokeOpts::default(), tolerance)
    }
}
