use std::collections::HashSet;
use std::fmt;

use kurbo::{BezPath, Point};
use pictor_engine::document::Mutation;
use pictor_engine::geometry::{CornerRadii, FillRule, Geometry, StrokeCap, StrokeStyle, Transform};
use pictor_engine::paint::normalize_stops;
use pictor_engine::{Color, GradientStop, NodeId, NodeSpec, Paint, ValidationError};
use uuid::Uuid;

use crate::schema::{
    SourceColor, SourceFile, SourceFill, SourceNode, SourceShape, SourceStop, SourceVectorNetwork,
};

/// Something the converter dropped or could not place.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportWarning {
    /// A paint that could not satisfy the minimum-stop rule.
    DroppedPaint {
        node: String,
        index: usize,
        reason: ValidationError,
    },
    /// A node of an unsupported kind or with unusable geometry.
    SkippedNode { node: String, reason: String },
    /// A scene child that names no node.
    MissingNode { node: String },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::DroppedPaint { node, index, reason } => {
                write!(f, "node {node}: dropped paint {index}: {reason}")
            }
            ImportWarning::SkippedNode { node, reason } => write!(f, "node {node}: skipped: {reason}"),
            ImportWarning::MissingNode { node } => write!(f, "scene references missing node {node}"),
        }
    }
}

/// Mutations for one source document, applied as a single transaction.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    /// `CreateNode` per imported node, bottom to top.
    pub mutations: Vec<Mutation>,
    /// Source id -> engine id, in creation order.
    pub ids: Vec<(String, NodeId)>,
    pub warnings: Vec<ImportWarning>,
    /// Background of the imported scene, if it declares one.
    pub background: Option<Color>,
}

/// Converts a parsed source document into a creation batch.
///
/// Nodes are created in the entry scene's child order (first child at the
/// bottom). A container's children follow it directly, depth first, placed
/// relative to the container. Without a usable scene, every node no container
/// claims is a root, ordered by its `zIndex` with ties broken by source id.
pub fn convert(file: &SourceFile) -> ImportBatch {
    let doc = &file.document;
    let mut batch = ImportBatch::default();

    let scene = doc
        .entry_scene_id
        .as_ref()
        .and_then(|id| doc.scenes.get(id))
        .or_else(|| doc.scenes.iter().min_by(|a, b| a.0.cmp(b.0)).map(|(_, s)| s));

    let roots: Vec<String> = match scene {
        Some(scene) => {
            batch.background = scene.background_color.map(color);
            scene.children.clone()
        }
        None => {
            let nested: HashSet<&str> = doc
                .nodes
                .values()
                .filter_map(shape_of)
                .flat_map(|s| s.children.iter().map(String::as_str))
                .collect();
            let mut ids: Vec<(&String, f64)> = doc
                .nodes
                .iter()
                .filter(|(id, _)| !nested.contains(id.as_str()))
                .map(|(id, node)| (id, shape_of(node).map_or(0.0, |s| s.z_index)))
                .collect();
            ids.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
            ids.into_iter().map(|(id, _)| id.clone()).collect()
        }
    };

    let mut visited: HashSet<String> = HashSet::new();
    let mut created: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<(String, Transform)> = roots
        .into_iter()
        .rev()
        .map(|id| (id, Transform::IDENTITY))
        .collect();

    while let Some((source_id, parent)) = stack.pop() {
        let Some(node) = doc.nodes.get(&source_id) else {
            batch.warnings.push(ImportWarning::MissingNode { node: source_id });
            continue;
        };
        if !visited.insert(source_id.clone()) {
            batch.warnings.push(ImportWarning::SkippedNode {
                node: source_id,
                reason: "listed more than once".to_string(),
            });
            continue;
        }

        let world = shape_of(node).map_or(parent, |shape| {
            Transform::from_position_rotation(shape.left, shape.top, shape.rotation).then(parent)
        });
        if let Some(shape) = shape_of(node) {
            stack.extend(shape.children.iter().rev().map(|child| (child.clone(), world)));
        }

        match node_spec(&source_id, node, &mut batch.warnings) {
            Ok(spec) => {
                let id = engine_id(&source_id);
                if !created.insert(id) {
                    batch.warnings.push(ImportWarning::SkippedNode {
                        node: source_id,
                        reason: format!("node id {id} already imported"),
                    });
                    continue;
                }
                let spec = spec.with_transform(world).with_id(id);
                batch.ids.push((source_id, id));
                batch.mutations.push(Mutation::CreateNode(spec));
            }
            Err(reason) => batch.warnings.push(ImportWarning::SkippedNode { node: source_id, reason }),
        }
    }

    if scene.is_none() {
        let mut unreachable: Vec<&String> = doc.nodes.keys().filter(|id| !visited.contains(*id)).collect();
        unreachable.sort();
        for source_id in unreachable {
            batch.warnings.push(ImportWarning::SkippedNode {
                node: source_id.clone(),
                reason: "only reachable through a cycle of children".to_string(),
            });
        }
    }

    for warning in &batch.warnings {
        log::warn!("import: {warning}");
    }
    log::debug!(
        "converted {} nodes ({} warnings)",
        batch.mutations.len(),
        batch.warnings.len()
    );
    batch
}

fn shape_of(node: &SourceNode) -> Option<&SourceShape> {
    match node {
        SourceNode::Container(s)
        | SourceNode::Rectangle(s)
        | SourceNode::Ellipse(s)
        | SourceNode::Vector(s)
        | SourceNode::Path(s) => Some(s),
        SourceNode::Unknown => None,
    }
}

/// Source ids that are UUIDs keep their identity; others get a fresh id.
fn engine_id(source_id: &str) -> NodeId {
    Uuid::parse_str(source_id).map_or_else(|_| NodeId::new(), NodeId::from_uuid)
}

fn node_spec(source_id: &str, node: &SourceNode, warnings: &mut Vec<ImportWarning>) -> Result<NodeSpec, String> {
    let Some(shape) = shape_of(node) else {
        return Err("unsupported node kind".to_string());
    };

    let mut fill_rule = FillRule::NonZero;
    let geometry = match node {
        SourceNode::Container(_) | SourceNode::Rectangle(_) => Geometry::Rect {
            width: shape.width.max(0.0),
            height: shape.height.max(0.0),
            corner_radius: shape.corner_radius.map_or_else(CornerRadii::default, |[tl, tr, br, bl]| {
                CornerRadii {
                    top_left: tl,
                    top_right: tr,
                    bottom_right: br,
                    bottom_left: bl,
                }
            }),
        },
        SourceNode::Ellipse(_) => Geometry::ellipse(shape.width.max(0.0), shape.height.max(0.0)),
        SourceNode::Vector(_) => {
            let paths = shape.paths.as_deref().unwrap_or_default();
            if paths.iter().any(|p| p.fill_rule.as_deref() == Some("evenodd")) {
                fill_rule = FillRule::EvenOdd;
            }
            let data = paths.iter().map(|p| p.d.as_str()).collect::<Vec<_>>().join(" ");
            let path = BezPath::from_svg(&data).map_err(|e| format!("bad path data: {e}"))?;
            Geometry::path(path)
        }
        SourceNode::Path(_) => Geometry::path(network_path(shape.vector_network.as_ref())?),
        SourceNode::Unknown => return Err("unsupported node kind".to_string()),
    };
    geometry.validate().map_err(|e| e.to_string())?;

    let sources: Vec<&SourceFill> = match (&shape.fills, &shape.fill) {
        (Some(fills), _) => fills.iter().collect(),
        (None, Some(fill)) => vec![fill],
        (None, None) => Vec::new(),
    };
    let fills = sources
        .into_iter()
        .enumerate()
        .filter_map(|(index, fill)| match paint(fill) {
            Ok(p) => Some(p),
            Err(reason) => {
                warnings.push(ImportWarning::DroppedPaint {
                    node: source_id.to_string(),
                    index,
                    reason,
                });
                None
            }
        })
        .collect();

    let mut spec = NodeSpec::new(geometry)
        .with_name(shape.name.clone())
        .with_fills(fills)
        .with_opacity(if shape.opacity.is_finite() { shape.opacity.clamp(0.0, 1.0) as f32 } else { 1.0 });
    spec.fill_rule = fill_rule;
    spec.visible = shape.active;

    let stroke_width = shape.stroke_width.unwrap_or(0.0);
    if stroke_width.is_finite() && stroke_width > 0.0 {
        let stroke_paint = match &shape.stroke {
            Some(fill) => paint(fill),
            None => Ok(Paint::solid(Color::BLACK)),
        };
        match stroke_paint {
            Ok(p) => {
                let mut style = StrokeStyle::with_width(stroke_width);
                style.cap = match shape.stroke_cap.as_deref() {
                    Some("round") => StrokeCap::Round,
                    Some("square") => StrokeCap::Square,
                    _ => StrokeCap::Butt,
                };
                spec = spec.with_stroke(p, style);
            }
            Err(reason) => warnings.push(ImportWarning::DroppedPaint {
                node: source_id.to_string(),
                index: 0,
                reason,
            }),
        }
    }
    Ok(spec)
}

fn paint(fill: &SourceFill) -> Result<Paint, ValidationError> {
    match fill {
        SourceFill::Solid { color: c } => Ok(Paint::solid(c.map_or(Color::TRANSPARENT, color))),
        SourceFill::LinearGradient { transform, stops } => {
            let mut p = Paint::linear(normalize_stops(&gradient_stops(stops))?);
            set_transform(&mut p, *transform);
            Ok(p)
        }
        SourceFill::RadialGradient { transform, stops } => {
            let mut p = Paint::radial(normalize_stops(&gradient_stops(stops))?);
            set_transform(&mut p, *transform);
            Ok(p)
        }
    }
}

fn gradient_stops(stops: &[SourceStop]) -> Vec<GradientStop> {
    stops
        .iter()
        .map(|s| GradientStop::new(s.offset as f32, color(s.color)))
        .collect()
}

fn set_transform(paint: &mut Paint, rows: Option<[[f64; 3]; 2]>) {
    let (Some([[a, c, e], [b, d, f]]), Some(g)) = (rows, paint.gradient_mut()) else {
        return;
    };
    let t = Transform::from_coeffs([a, b, c, d, e, f]);
    if t.is_finite() {
        g.transform = t;
    }
}

fn color(c: SourceColor) -> Color {
    Color::from_loose(c.r, c.g, c.b, c.a)
}

/// One cubic per segment, starting at the first segment's start vertex.
fn network_path(network: Option<&SourceVectorNetwork>) -> Result<BezPath, String> {
    let Some(network) = network.filter(|n| !n.segments.is_empty()) else {
        return Err("empty vector network".to_string());
    };
    let vertex = |i: usize| {
        network
            .vertices
            .get(i)
            .map(|v| Point::new(v.p[0], v.p[1]))
            .ok_or_else(|| format!("segment references missing vertex {i}"))
    };

    let mut path = BezPath::new();
    path.move_to(vertex(network.segments[0].a)?);
    for seg in &network.segments {
        let (a, b) = (vertex(seg.a)?, vertex(seg.b)?);
        path.curve_to(
            Point::new(a.x + seg.ta[0], a.y + seg.ta[1]),
            Point::new(b.x + seg.tb[0], b.y + seg.tb[1]),
            b,
        );
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pictor_engine::PaintKind;

    fn convert_json(json: &str) -> ImportBatch {
        convert(&SourceFile::parse(json.as_bytes()).unwrap())
    }

    fn created(batch: &ImportBatch) -> Vec<&NodeSpec> {
        batch
            .mutations
            .iter()
            .map(|m| match m {
                Mutation::CreateNode(spec) => spec,
                other => panic!("unexpected mutation {}", other.name()),
            })
            .collect()
    }

    #[test]
    fn single_stop_paint_is_dropped_and_the_rest_applies() {
        let batch = convert_json(
            r#"{ "document": {
                "entry_scene_id": "s",
                "scenes": { "s": { "children": ["a", "b"] } },
                "nodes": {
                    "a": { "type": "rectangle", "width": 10, "height": 10,
                           "fill": { "type": "linear_gradient",
                                     "stops": [{ "offset": 0, "color": { "r": 255, "g": 0, "b": 0 } }] } },
                    "b": { "type": "ellipse", "width": 5, "height": 5,
                           "fill": { "type": "solid", "color": { "r": 0, "g": 0, "b": 255, "a": 1 } } }
                } } }"#,
        );
        let specs = created(&batch);
        assert_eq!(specs.len(), 2);
        assert!(specs[0].fills.is_empty());
        assert_eq!(specs[1].fills.len(), 1);
        assert_eq!(
            batch.warnings,
            vec![ImportWarning::DroppedPaint {
                node: "a".into(),
                index: 0,
                reason: ValidationError::TooFewStops { found: 1 },
            }]
        );
    }

    #[test]
    fn stops_are_normalized() {
        let batch = convert_json(
            r#"{ "document": { "nodes": {
                "a": { "type": "rectangle", "width": 10, "height": 10,
                       "fill": { "type": "radial_gradient",
                                 "transform": [[2, 0, 1], [0, 2, 3]],
                                 "stops": [
                                     { "offset": 0.5, "color": { "r": 255, "g": 0, "b": 0 } },
                                     { "offset": -1, "color": { "r": 0, "g": 0, "b": 900 } }
                                 ] } }
            } } }"#,
        );
        let specs = created(&batch);
        let PaintKind::RadialGradient(g) = &specs[0].fills[0].kind else {
            panic!("expected a radial gradient");
        };
        assert_eq!(g.stops[0].offset, 0.0);
        assert_eq!(g.stops[0].color, Color::rgb(0, 0, 255));
        assert_eq!(g.stops[1].offset, 0.5);
        assert_eq!(g.transform.coeffs(), [2.0, 0.0, 0.0, 2.0, 1.0, 3.0]);
        assert!(batch.warnings.is_empty());
    }

    #[test]
    fn scene_order_is_z_order_and_missing_children_warn() {
        let batch = convert_json(
            r#"{ "document": {
                "scenes": { "main": { "children": ["top", "ghost", "bottom"],
                                      "backgroundColor": { "r": 10, "g": 20, "b": 30 } } },
                "nodes": {
                    "top": { "type": "rectangle", "width": 1, "height": 1 },
                    "bottom": { "type": "rectangle", "width": 1, "height": 1 }
                } } }"#,
        );
        let names: Vec<&str> = batch.ids.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(names, ["top", "bottom"]);
        assert_eq!(batch.background, Some(Color::rgb(10, 20, 30)));
        assert_eq!(batch.warnings, vec![ImportWarning::MissingNode { node: "ghost".into() }]);
    }

    fn names(batch: &ImportBatch) -> Vec<&str> {
        batch.ids.iter().map(|(s, _)| s.as_str()).collect()
    }

    fn skipped(batch: &ImportBatch) -> Vec<&str> {
        batch
            .warnings
            .iter()
            .filter_map(|w| match w {
                ImportWarning::SkippedNode { node, .. } => Some(node.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn container_children_follow_their_container() {
        let batch = convert_json(
            r#"{ "document": {
                "scenes": { "main": { "children": ["frame", "after"] } },
                "nodes": {
                    "frame": { "type": "container", "left": 100, "top": 50, "width": 80, "height": 80,
                               "children": ["inner", "deep"] },
                    "inner": { "type": "container", "left": 10, "top": 5, "width": 20, "height": 20,
                               "children": ["leaf"] },
                    "leaf": { "type": "ellipse", "left": 1, "top": 1, "width": 2, "height": 2 },
                    "deep": { "type": "rectangle", "width": 1, "height": 1 },
                    "after": { "type": "rectangle", "width": 1, "height": 1 }
                } } }"#,
        );
        assert_eq!(names(&batch), ["frame", "inner", "leaf", "deep", "after"]);
        assert!(batch.warnings.is_empty());

        let specs = created(&batch);
        assert_eq!(specs[1].transform.coeffs()[4..], [110.0, 55.0]);
        assert_eq!(specs[2].transform.coeffs()[4..], [111.0, 56.0]);
        assert_eq!(specs[3].transform.coeffs()[4..], [100.0, 50.0]);
        assert_eq!(specs[4].transform.coeffs()[4..], [0.0, 0.0]);
    }

    #[test]
    fn without_scenes_only_unclaimed_nodes_are_roots() {
        let batch = convert_json(
            r#"{ "document": { "nodes": {
                "child": { "type": "rectangle", "zIndex": -5, "width": 1, "height": 1 },
                "group": { "type": "container", "zIndex": 1, "width": 4, "height": 4, "children": ["child"] },
                "a": { "type": "container", "children": ["b"] },
                "b": { "type": "container", "children": ["a"] }
            } } }"#,
        );
        assert_eq!(names(&batch), ["group", "child"]);
        assert_eq!(skipped(&batch), ["a", "b"]);
    }

    #[test]
    fn cycles_and_repeats_are_skipped_not_fatal() {
        let batch = convert_json(
            r#"{ "document": {
                "scenes": { "main": { "children": [
                    "6f1c1a4e-3d55-4a53-9d0c-0f8e1f6a2b11", "b", "6f1c1a4e-3d55-4a53-9d0c-0f8e1f6a2b11",
                    "6F1C1A4E-3D55-4A53-9D0C-0F8E1F6A2B11", "loop"
                ] } },
                "nodes": {
                    "6f1c1a4e-3d55-4a53-9d0c-0f8e1f6a2b11": { "type": "rectangle", "width": 1, "height": 1 },
                    "6F1C1A4E-3D55-4A53-9D0C-0F8E1F6A2B11": { "type": "rectangle", "width": 1, "height": 1 },
                    "b": { "type": "rectangle", "width": 1, "height": 1 },
                    "loop": { "type": "container", "width": 1, "height": 1, "children": ["loop"] }
                } } }"#,
        );
        assert_eq!(names(&batch), ["6f1c1a4e-3d55-4a53-9d0c-0f8e1f6a2b11", "b", "loop"]);
        assert_eq!(
            skipped(&batch),
            [
                "6f1c1a4e-3d55-4a53-9d0c-0f8e1f6a2b11",
                "6F1C1A4E-3D55-4A53-9D0C-0F8E1F6A2B11",
                "loop"
            ]
        );

        let doc = pictor_engine::SharedDocument::default();
        let report = doc.submit_batch(&batch.mutations).unwrap();
        assert_eq!(report.created.len(), 3);
        assert_eq!(doc.read().len(), 3);
    }

    #[test]
    fn without_scenes_nodes_sort_by_z_index() {
        let batch = convert_json(
            r#"{ "document": { "nodes": {
                "b": { "type": "rectangle", "zIndex": 1, "width": 1, "height": 1 },
                "a": { "type": "rectangle", "zIndex": 2, "width": 1, "height": 1 },
                "c": { "type": "rectangle", "zIndex": 1, "width": 1, "height": 1 }
            } } }"#,
        );
        let names: Vec<&str> = batch.ids.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(names, ["b", "c", "a"]);
    }

    #[test]
    fn unknown_kinds_and_bad_paths_are_skipped() {
        let batch = convert_json(
            r#"{ "document": { "nodes": {
                "t": { "type": "text" },
                "v": { "type": "vector", "paths": [{ "d": "M 0 0 Q", "fillRule": "evenodd" }] },
                "p": { "type": "path", "vectorNetwork": {
                    "vertices": [{ "p": [0, 0] }, { "p": [10, 0] }, { "p": [10, 10] }],
                    "segments": [{ "a": 0, "b": 1, "ta": [0, 0], "tb": [0, 0] },
                                 { "a": 1, "b": 2, "ta": [0, 0], "tb": [0, 0] }] } }
            } } }"#,
        );
        let specs = created(&batch);
        assert_eq!(specs.len(), 1);
        assert!(matches!(specs[0].geometry, Geometry::Path { .. }));
        let skipped: Vec<&str> = batch
            .warnings
            .iter()
            .filter_map(|w| match w {
                ImportWarning::SkippedNode { node, .. } => Some(node.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(skipped, ["t", "v"]);
    }

    #[test]
    fn placement_stroke_and_uuid_ids() {
        let batch = convert_json(
            r#"{ "document": { "nodes": {
                "6f1c1a4e-3d55-4a53-9d0c-0f8e1f6a2b11": {
                    "type": "ellipse", "left": 5, "top": 7, "width": 4, "height": 4,
                    "strokeWidth": 2, "strokeCap": "round", "active": false, "opacity": 3
                }
            } } }"#,
        );
        let specs = created(&batch);
        let spec = specs[0];
        assert_eq!(spec.transform.coeffs()[4..], [5.0, 7.0]);
        assert_eq!(spec.strokes.len(), 1);
        assert_eq!(spec.stroke.width, 2.0);
        assert_eq!(spec.stroke.cap, StrokeCap::Round);
        assert!(!spec.visible);
        assert_eq!(spec.opacity, 1.0);
        assert_eq!(
            spec.id.map(|id| id.to_string()).as_deref(),
            Some("6f1c1a4e-3d55-4a53-9d0c-0f8e1f6a2b11")
        );
    }
}
