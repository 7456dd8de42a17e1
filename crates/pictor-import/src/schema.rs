//! Source document schema.
//!
//! Deserialization is deliberately lenient: optional and missing fields fall
//! back to defaults, numeric fields accept any JSON value, and unknown node
//! kinds deserialize as [`SourceNode::Unknown`]. Validation happens during
//! conversion, where bad entities are dropped one at a time.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct SourceFile {
    #[serde(default)]
    pub version: String,
    pub document: SourceDocument,
}

impl SourceFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceDocument {
    #[serde(default)]
    pub nodes: HashMap<String, SourceNode>,
    #[serde(default)]
    pub scenes: HashMap<String, SourceScene>,
    #[serde(default)]
    pub entry_scene_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceScene {
    #[serde(default)]
    pub name: String,
    /// Node ids, bottom to top.
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub background_color: Option<SourceColor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceNode {
    Container(SourceShape),
    Rectangle(SourceShape),
    Ellipse(SourceShape),
    /// Outline given as SVG path data.
    Vector(SourceShape),
    /// Outline given as a vector network.
    Path(SourceShape),
    #[serde(other)]
    Unknown,
}

impl SourceNode {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceNode::Container(_) => "container",
            SourceNode::Rectangle(_) => "rectangle",
            SourceNode::Ellipse(_) => "ellipse",
            SourceNode::Vector(_) => "vector",
            SourceNode::Path(_) => "path",
            SourceNode::Unknown => "unknown",
        }
    }
}

/// Fields shared by every supported node kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceShape {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_one", deserialize_with = "lenient_number_or_one")]
    pub opacity: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rotation: f64,
    #[serde(default, rename = "zIndex", deserialize_with = "lenient_number")]
    pub z_index: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub left: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub top: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub width: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub height: f64,
    #[serde(default)]
    pub fill: Option<SourceFill>,
    /// Additional fills, visually top first; used when present.
    #[serde(default)]
    pub fills: Option<Vec<SourceFill>>,
    #[serde(default)]
    pub stroke: Option<SourceFill>,
    #[serde(default)]
    pub stroke_width: Option<f64>,
    #[serde(default)]
    pub stroke_cap: Option<String>,
    #[serde(default, deserialize_with = "corner_radius")]
    pub corner_radius: Option<[f64; 4]>,
    #[serde(default)]
    pub paths: Option<Vec<SourcePathData>>,
    #[serde(default)]
    pub vector_network: Option<SourceVectorNetwork>,
    /// Nested node ids, bottom first. Only containers carry them.
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceFill {
    Solid {
        #[serde(default)]
        color: Option<SourceColor>,
    },
    LinearGradient {
        /// Row-major 2x3 matrix `[[a, c, e], [b, d, f]]`.
        #[serde(default)]
        transform: Option<[[f64; 3]; 2]>,
        #[serde(default)]
        stops: Vec<SourceStop>,
    },
    RadialGradient {
        #[serde(default)]
        transform: Option<[[f64; 3]; 2]>,
        #[serde(default)]
        stops: Vec<SourceStop>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceStop {
    #[serde(default, deserialize_with = "lenient_number")]
    pub offset: f64,
    pub color: SourceColor,
}

/// 8-bit channels and a unit alpha; out-of-range values are clamped later.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct SourceColor {
    #[serde(default, deserialize_with = "lenient_number")]
    pub r: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub g: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub b: f64,
    #[serde(default = "default_one", deserialize_with = "lenient_number_or_one")]
    pub a: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePathData {
    pub d: String,
    #[serde(default)]
    pub fill_rule: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceVectorNetwork {
    #[serde(default)]
    pub vertices: Vec<SourceVertex>,
    #[serde(default)]
    pub segments: Vec<SourceSegment>,
}

#[derive(Debug, Copy, Clone, Deserialize)]
pub struct SourceVertex {
    pub p: [f64; 2],
}

/// Cubic from vertex `a` to vertex `b`; tangents are relative to their vertex.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct SourceSegment {
    pub a: usize,
    pub b: usize,
    #[serde(default)]
    pub ta: [f64; 2],
    #[serde(default)]
    pub tb: [f64; 2],
}

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Any JSON value; non-numbers (e.g. `"auto"`, `null`) read as 0.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_of(&value).unwrap_or(0.0))
}

fn lenient_number_or_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_of(&value).unwrap_or(1.0))
}

/// A single radius or four radii `[top_left, top_right, bottom_left, bottom_right]`.
/// Returned in clockwise order: top-left, top-right, bottom-right, bottom-left.
fn corner_radius<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<[f64; 4]>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) if items.len() == 4 => {
            let r: Vec<f64> = items.iter().map(|v| number_of(v).unwrap_or(0.0)).collect();
            Some([r[0], r[1], r[3], r[2]])
        }
        Some(v) => number_of(&v).map(|r| [r; 4]),
        None => None,
    })
}
