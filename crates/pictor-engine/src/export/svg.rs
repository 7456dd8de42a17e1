use std::fmt::Write as _;

use crate::geometry::FillRule;
use crate::paint::{Color, GradientStop};
use crate::render::{DrawStream, FlatPath, GradientShading, Shading};

use super::num;

/// Serializes a draw stream as a standalone SVG document in device pixels.
///
/// Every pass becomes one `<path>`; gradients become `userSpaceOnUse`
/// definitions whose `gradientTransform` is the pass's gradient-to-device
/// transform, so gradient space is the same unit line / circle the GPU uses.
pub fn write_svg(stream: &DrawStream) -> String {
    let (w, h) = (stream.viewport.width, stream.viewport.height);
    let mut defs = String::new();
    let mut body = String::new();
    let mut gradients = 0usize;

    if stream.clear.a > 0.0 {
        let _ = writeln!(
            body,
            r#"<rect width="{w}" height="{h}" fill="{}"{}/>"#,
            stream.clear.to_hex(),
            opacity_attr("fill-opacity", stream.clear.a)
        );
    }

    for (_, pass) in stream.passes() {
        let d = path_data(&pass.path);
        if d.is_empty() {
            continue;
        }
        let rule = match pass.fill_rule {
            FillRule::NonZero => "nonzero",
            FillRule::EvenOdd => "evenodd",
        };
        let opacity = pass.resolved.opacity;
        let (fill, fill_opacity) = match &pass.resolved.shading {
            Shading::Solid(color) => (color.to_hex(), color.a * opacity),
            Shading::Linear(g) | Shading::Radial(g) => {
                let id = format!("g{gradients}");
                gradients += 1;
                let radial = matches!(pass.resolved.shading, Shading::Radial(_));
                write_gradient(&mut defs, &id, g, radial);
                (format!("url(#{id})"), opacity)
            }
        };
        let _ = writeln!(
            body,
            r#"<path d="{d}" fill="{fill}" fill-rule="{rule}"{}/>"#,
            opacity_attr("fill-opacity", fill_opacity)
        );
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    if !defs.is_empty() {
        let _ = writeln!(out, "<defs>\n{defs}</defs>");
    }
    out.push_str(&body);
    out.push_str("</svg>\n");
    out
}

fn write_gradient(defs: &mut String, id: &str, g: &GradientShading, radial: bool) {
    let [a, b, c, d, e, f] = g.to_device.coeffs();
    let matrix = format!(
        "matrix({} {} {} {} {} {})",
        coeff(a),
        coeff(b),
        coeff(c),
        coeff(d),
        coeff(e),
        coeff(f)
    );
    let (tag, geometry) = if radial {
        ("radialGradient", r#"cx="0.5" cy="0.5" r="0.5""#)
    } else {
        ("linearGradient", r#"x1="0" y1="0" x2="1" y2="0""#)
    };
    let _ = writeln!(
        defs,
        r#"<{tag} id="{id}" gradientUnits="userSpaceOnUse" {geometry} gradientTransform="{matrix}">"#
    );
    for stop in &g.ramp.stops {
        write_stop(defs, stop);
    }
    let _ = writeln!(defs, "</{tag}>");
}

/// Matrix entries keep full precision; tiny scale or skew terms matter.
fn coeff(v: f64) -> String {
    if v == 0.0 { "0".to_string() } else { format!("{v}") }
}

fn write_stop(defs: &mut String, stop: &GradientStop) {
    let Color { a, .. } = stop.color;
    let _ = writeln!(
        defs,
        r#"<stop offset="{}" stop-color="{}"{}/>"#,
        num(f64::from(stop.offset)),
        stop.color.to_hex(),
        opacity_attr("stop-opacity", a)
    );
}

fn opacity_attr(name: &str, value: f32) -> String {
    if value >= 1.0 { String::new() } else { format!(r#" {name}="{}""#, num(f64::from(value))) }
}

fn path_data(path: &FlatPath) -> String {
    let mut d = String::new();
    for contour in path.contours.iter().filter(|c| c.len() >= 3) {
        for (i, [x, y]) in contour.iter().enumerate() {
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{cmd}{} {}", num(f64::from(*x)), num(f64::from(*y)));
        }
        d.push('Z');
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, NodeSpec};
    use crate::export::{compile_snapshot, ExportOptions};
    use crate::geometry::{Geometry, Transform};
    use crate::paint::Paint;

    fn svg_of(spec: NodeSpec, options: &ExportOptions) -> String {
        let mut doc = Document::new();
        doc.create_node(spec).unwrap();
        write_svg(&compile_snapshot(&doc.snapshot(), options).unwrap())
    }

    #[test]
    fn solid_square_becomes_one_path() {
        let svg = svg_of(
            NodeSpec::new(Geometry::rect(10.0, 10.0)).with_fill(Paint::solid(Color::rgba(255, 0, 0, 0.5))),
            &ExportOptions::default(),
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="10" height="10""#));
        assert_eq!(svg.matches("<path").count(), 1);
        assert!(svg.contains(r##"fill="#ff0000""##));
        assert!(svg.contains(r#"fill-opacity="0.5""#));
        assert!(svg.contains("M0 0L10 0L10 10L0 10Z"));
        assert!(!svg.contains("<defs>"));
    }

    #[test]
    fn gradients_are_user_space_definitions() {
        let stops = vec![
            GradientStop::new(0.0, Color::BLACK),
            GradientStop::new(1.0, Color::WHITE.with_alpha(0.25)),
        ];
        let svg = svg_of(
            NodeSpec::new(Geometry::rect(20.0, 10.0)).with_fill(Paint::radial(stops)),
            &ExportOptions::default(),
        );
        assert!(svg.contains(r#"<radialGradient id="g0" gradientUnits="userSpaceOnUse""#));
        assert!(svg.contains("gradientTransform=\"matrix(20 0 0 10 0 0)\""));
        assert!(svg.contains(r#"stop-opacity="0.25""#));
        assert!(svg.contains(r#"fill="url(#g0)""#));
    }

    #[test]
    fn small_gradient_coefficients_survive() {
        let mut paint = Paint::linear(vec![
            GradientStop::new(0.0, Color::BLACK),
            GradientStop::new(1.0, Color::WHITE),
        ]);
        if let Some(g) = paint.gradient_mut() {
            g.transform = Transform::scale(1e-5, 1.0);
        }
        let svg = svg_of(NodeSpec::new(Geometry::rect(20.0, 10.0)).with_fill(paint), &ExportOptions::default());

        let start = svg.find("matrix(").unwrap() + "matrix(".len();
        let end = start + svg[start..].find(')').unwrap();
        let coeffs: Vec<f64> = svg[start..end].split(' ').map(|c| c.parse().unwrap()).collect();
        assert_eq!(coeffs.len(), 6);
        assert!((coeffs[0] - 2e-4).abs() < 1e-12);
        assert_eq!(coeffs[3], 10.0);
    }

    #[test]
    fn background_is_painted_first() {
        let options = ExportOptions {
            background: Some(Color::WHITE),
            ..ExportOptions::default()
        };
        let svg = svg_of(NodeSpec::new(Geometry::rect(4.0, 4.0)).with_fill(Paint::solid(Color::BLACK)), &options);
        let rect = svg.find("<rect").unwrap();
        let path = svg.find("<path").unwrap();
        assert!(rect < path);
    }
}
