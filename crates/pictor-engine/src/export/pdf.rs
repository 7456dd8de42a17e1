use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::RenderSurfaceError;
use crate::geometry::FillRule;
use crate::paint::{Color, GradientStop};
use crate::render::{DrawStream, FlatPath, GradientShading, Shading};

/// Serializes a draw stream as a single-page PDF, one point per device pixel.
///
/// Gradients become axial / radial shadings clipped to the pass outline.
/// PDF shadings carry no alpha, so gradients whose stops differ in alpha are
/// rejected with `UnsupportedPaint`; a uniform stop alpha becomes a constant
/// fill alpha.
pub fn write_pdf(stream: &DrawStream) -> Result<Vec<u8>, RenderSurfaceError> {
    let (w, h) = (stream.viewport.width, stream.viewport.height);
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut res = Resources::default();

    // Flip to device space: origin top-left, +Y down.
    let mut ops = vec![Operation::new(
        "cm",
        vec![1.into(), 0.into(), 0.into(), (-1).into(), 0.into(), i64::from(h).into()],
    )];

    if stream.clear.a > 0.0 {
        ops.push(res.alpha_op(stream.clear.a));
        ops.push(rgb_op("rg", stream.clear));
        ops.push(Operation::new("re", vec![0.into(), 0.into(), i64::from(w).into(), i64::from(h).into()]));
        ops.push(Operation::new("f", vec![]));
    }

    for (item, pass) in stream.passes() {
        if pass.path.is_empty() {
            continue;
        }
        let opacity = pass.resolved.opacity;
        match &pass.resolved.shading {
            Shading::Solid(color) => {
                ops.push(res.alpha_op(color.a * opacity));
                ops.push(rgb_op("rg", *color));
                push_path(&mut ops, &pass.path);
                ops.push(Operation::new(fill_op(pass.fill_rule, false), vec![]));
            }
            Shading::Linear(g) | Shading::Radial(g) => {
                let Some(alpha) = uniform_alpha(&g.ramp.stops) else {
                    return Err(RenderSurfaceError::UnsupportedPaint {
                        node: item.node,
                        reason: "PDF shadings cannot vary alpha across gradient stops".into(),
                    });
                };
                let radial = matches!(pass.resolved.shading, Shading::Radial(_));
                let name = res.shading(&mut doc, g, radial);

                ops.push(Operation::new("q", vec![]));
                push_path(&mut ops, &pass.path);
                ops.push(Operation::new(fill_op(pass.fill_rule, true), vec![]));
                ops.push(Operation::new("n", vec![]));
                ops.push(Operation::new("cm", g.to_device.coeffs().iter().map(|v| real(*v)).collect()));
                ops.push(res.alpha_op(alpha * opacity));
                ops.push(Operation::new("sh", vec![Object::Name(name.into_bytes())]));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }

    let content = Content { operations: ops }.encode().map_err(encode_error)?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let resources = res.into_dictionary(&mut doc);
    let resources_id = doc.add_object(resources);
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), i64::from(w).into(), i64::from(h).into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(encode_error)?;
    Ok(out)
}

/// Graphics states and shadings referenced by the page.
#[derive(Default)]
struct Resources {
    /// Alpha in thousandths -> resource name.
    alphas: BTreeMap<u32, String>,
    shadings: Vec<(String, ObjectId)>,
}

impl Resources {
    fn alpha_op(&mut self, alpha: f32) -> Operation {
        let key = (alpha.clamp(0.0, 1.0) * 1000.0).round() as u32;
        let next = self.alphas.len();
        let name = self.alphas.entry(key).or_insert_with(|| format!("GS{next}")).clone();
        Operation::new("gs", vec![Object::Name(name.into_bytes())])
    }

    fn shading(&mut self, doc: &mut Document, g: &GradientShading, radial: bool) -> String {
        let (kind, coords) = if radial {
            (3, vec![real(0.5), real(0.5), real(0.0), real(0.5), real(0.5), real(0.5)])
        } else {
            (2, vec![real(0.0), real(0.0), real(1.0), real(0.0)])
        };
        let id = doc.add_object(dictionary! {
            "ShadingType" => kind,
            "ColorSpace" => "DeviceRGB",
            "Coords" => coords,
            "Function" => stop_function(&g.ramp.stops),
            "Extend" => vec![true.into(), true.into()],
        });
        let name = format!("Sh{}", self.shadings.len());
        self.shadings.push((name.clone(), id));
        name
    }

    fn into_dictionary(self, doc: &mut Document) -> Dictionary {
        let mut states = Dictionary::new();
        for (key, name) in self.alphas {
            let alpha = key as f64 / 1000.0;
            let id = doc.add_object(dictionary! {
                "Type" => "ExtGState",
                "ca" => real(alpha),
                "CA" => real(alpha),
            });
            states.set(name, id);
        }
        let mut shadings = Dictionary::new();
        for (name, id) in self.shadings {
            shadings.set(name, id);
        }
        dictionary! {
            "ExtGState" => states,
            "Shading" => shadings,
        }
    }
}

/// Exponential interpolation between adjacent stops, stitched over `[0, 1]`.
fn stop_function(stops: &[GradientStop]) -> Object {
    let mut stops = stops.to_vec();
    if let Some(first) = stops.first().copied() {
        if first.offset > 0.0 {
            stops.insert(0, GradientStop::new(0.0, first.color));
        }
    }
    if let Some(last) = stops.last().copied() {
        if last.offset < 1.0 {
            stops.push(GradientStop::new(1.0, last.color));
        }
    }

    let segment = |a: &GradientStop, b: &GradientStop| -> Object {
        Object::Dictionary(dictionary! {
            "FunctionType" => 2,
            "Domain" => vec![real(0.0), real(1.0)],
            "C0" => rgb(a.color),
            "C1" => rgb(b.color),
            "N" => 1,
        })
    };

    match stops.as_slice() {
        [a, b] => segment(a, b),
        _ => {
            let functions: Vec<Object> = stops.windows(2).map(|p| segment(&p[0], &p[1])).collect();
            let bounds: Vec<Object> = stops[1..stops.len() - 1]
                .iter()
                .map(|s| real(f64::from(s.offset)))
                .collect();
            let encode: Vec<Object> = (0..functions.len()).flat_map(|_| [real(0.0), real(1.0)]).collect();
            Object::Dictionary(dictionary! {
                "FunctionType" => 3,
                "Domain" => vec![real(0.0), real(1.0)],
                "Functions" => functions,
                "Bounds" => bounds,
                "Encode" => encode,
            })
        }
    }
}

fn uniform_alpha(stops: &[GradientStop]) -> Option<f32> {
    let first = stops.first()?.color.a;
    stops.iter().all(|s| (s.color.a - first).abs() < 1e-4).then_some(first)
}

fn push_path(ops: &mut Vec<Operation>, path: &FlatPath) {
    for contour in path.contours.iter().filter(|c| c.len() >= 3) {
        for (i, [x, y]) in contour.iter().enumerate() {
            let op = if i == 0 { "m" } else { "l" };
            ops.push(Operation::new(op, vec![real(f64::from(*x)), real(f64::from(*y))]));
        }
        ops.push(Operation::new("h", vec![]));
    }
}

/// Fill operator, or clip operator when `clip` is set.
fn fill_op(rule: FillRule, clip: bool) -> &'static str {
    match (rule, clip) {
        (FillRule::NonZero, false) => "f",
        (FillRule::EvenOdd, false) => "f*",
        (FillRule::NonZero, true) => "W",
        (FillRule::EvenOdd, true) => "W*",
    }
}

fn rgb(color: Color) -> Vec<Object> {
    let [r, g, b, _] = color.to_normalized();
    vec![real(f64::from(r)), real(f64::from(g)), real(f64::from(b))]
}

fn rgb_op(op: &str, color: Color) -> Operation {
    Operation::new(op, rgb(color))
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn encode_error(err: impl std::fmt::Display) -> RenderSurfaceError {
    RenderSurfaceError::Encode(format!("pdf: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document as Doc, NodeSpec};
    use crate::export::{compile_snapshot, ExportOptions};
    use crate::geometry::Geometry;
    use crate::paint::Paint;

    fn stream_of(paint: Paint) -> DrawStream {
        let mut doc = Doc::new();
        doc.create_node(NodeSpec::new(Geometry::rect(40.0, 20.0)).with_fill(paint)).unwrap();
        compile_snapshot(&doc.snapshot(), &ExportOptions::default()).unwrap()
    }

    fn page_operators(bytes: &[u8]) -> Vec<String> {
        let pdf = lopdf::Document::load_mem(bytes).unwrap();
        let pages = pdf.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();
        let content = Content::decode(&pdf.get_page_content(page_id).unwrap()).unwrap();
        content.operations.into_iter().map(|op| op.operator).collect()
    }

    #[test]
    fn solid_fill_is_a_filled_path() {
        let bytes = write_pdf(&stream_of(Paint::solid(Color::rgb(0, 128, 255)))).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let ops = page_operators(&bytes);
        assert!(ops.contains(&"f".to_string()));
        assert!(!ops.contains(&"sh".to_string()));
    }

    #[test]
    fn multi_stop_gradient_is_a_clipped_shading() {
        let paint = Paint::linear(vec![
            GradientStop::new(0.0, Color::rgb(255, 0, 0)),
            GradientStop::new(0.5, Color::rgb(0, 255, 0)),
            GradientStop::new(1.0, Color::rgb(0, 0, 255)),
        ]);
        let ops = page_operators(&write_pdf(&stream_of(paint)).unwrap());
        let clip = ops.iter().position(|o| o == "W").unwrap();
        let sh = ops.iter().position(|o| o == "sh").unwrap();
        assert!(clip < sh);
    }

    #[test]
    fn alpha_varying_gradient_is_unsupported() {
        let paint = Paint::radial(vec![
            GradientStop::new(0.0, Color::BLACK),
            GradientStop::new(1.0, Color::BLACK.with_alpha(0.0)),
        ]);
        let err = write_pdf(&stream_of(paint)).unwrap_err();
        assert!(matches!(err, RenderSurfaceError::UnsupportedPaint { .. }));
    }

    #[test]
    fn stitching_covers_the_whole_domain() {
        let stops = [
            GradientStop::new(0.2, Color::BLACK),
            GradientStop::new(0.6, Color::WHITE),
        ];
        let Object::Dictionary(f) = stop_function(&stops) else {
            panic!("expected a function dictionary");
        };
        assert_eq!(f.get(b"FunctionType").unwrap().as_i64().unwrap(), 3);
        assert_eq!(f.get(b"Functions").unwrap().as_array().unwrap().len(), 3);
    }
}
