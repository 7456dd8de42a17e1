//! Static export of a document snapshot.
//!
//! Every export compiles the snapshot from scratch into a [`DrawStream`] (the
//! same representation the GPU path draws) and serializes that stream.
//! Raster formats rasterize the SVG output.

mod pdf;
mod raster;
mod svg;

use kurbo::Rect;
use serde::{Deserialize, Serialize};

use crate::document::DocumentSnapshot;
use crate::error::RenderSurfaceError;
use crate::geometry::bounds::rects_intersect;
use crate::paint::Color;
use crate::render::{DrawStream, PaintCompiler, Viewport};

pub use pdf::write_pdf;
pub use svg::write_svg;

/// Largest export edge in pixels.
pub const MAX_EXPORT_EDGE: u32 = 16_384;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Svg,
    Pdf,
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    /// Guesses the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "svg" => Some(ExportFormat::Svg),
            "pdf" => Some(ExportFormat::Pdf),
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Document region to export; the visible content bounds when `None`.
    pub region: Option<Rect>,
    /// Output pixels (or points) per document unit.
    pub scale: f64,
    /// Painted under the content; transparent when `None` (white for JPEG).
    pub background: Option<Color>,
    /// Curve flattening tolerance in output pixels.
    pub tolerance: f64,
    pub jpeg_quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            region: None,
            scale: 1.0,
            background: None,
            tolerance: 0.25,
            jpeg_quality: 90,
        }
    }
}

/// Serializes `snapshot` in `format`.
pub fn export(
    snapshot: &DocumentSnapshot,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<Vec<u8>, RenderSurfaceError> {
    let mut stream = compile_snapshot(snapshot, options)?;
    log::debug!(
        "exporting r{} as {format:?}: {} items, {}x{}",
        stream.revision,
        stream.items.len(),
        stream.viewport.width,
        stream.viewport.height
    );
    match format {
        ExportFormat::Svg => Ok(write_svg(&stream).into_bytes()),
        ExportFormat::Pdf => write_pdf(&stream),
        ExportFormat::Png => raster::encode_png(&stream),
        ExportFormat::Jpeg => {
            stream.clear = raster::flatten_onto_white(stream.clear);
            raster::encode_jpeg(&stream, options.jpeg_quality)
        }
    }
}

/// Compiles every visible node intersecting the export region.
pub fn compile_snapshot(snapshot: &DocumentSnapshot, options: &ExportOptions) -> Result<DrawStream, RenderSurfaceError> {
    let region = options
        .region
        .or_else(|| snapshot.content_bounds())
        .ok_or(RenderSurfaceError::InvalidExportSize { width: 0, height: 0 })?;
    let viewport = export_viewport(region, options.scale)?;
    let to_device = viewport.to_device();

    let mut compiler = PaintCompiler::new();
    let items = snapshot
        .nodes
        .iter()
        .filter(|n| n.visible && rects_intersect(n.bounds, region))
        .map(|n| compiler.compile_node(n, to_device, options.tolerance))
        .collect();

    Ok(DrawStream {
        revision: snapshot.revision,
        viewport,
        clear: options.background.unwrap_or(Color::TRANSPARENT),
        items,
    })
}

fn export_viewport(region: Rect, scale: f64) -> Result<Viewport, RenderSurfaceError> {
    let pixels = |len: f64| {
        let v = (len * scale).ceil();
        if v.is_finite() && v >= 1.0 && v <= f64::from(MAX_EXPORT_EDGE) { Some(v as u32) } else { None }
    };
    match (pixels(region.width()), pixels(region.height())) {
        (Some(width), Some(height)) => Ok(Viewport { region, width, height }),
        _ => Err(RenderSurfaceError::InvalidExportSize {
            width: (region.width() * scale).max(0.0).min(f64::from(u32::MAX)) as u32,
            height: (region.height() * scale).max(0.0).min(f64::from(u32::MAX)) as u32,
        }),
    }
}

/// Compact decimal for markup output: at most three decimals, no trailing zeros.
pub(crate) fn num(v: f64) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, NodeSpec};
    use crate::geometry::{Geometry, Transform};
    use crate::paint::Paint;

    pub(super) fn two_squares() -> DocumentSnapshot {
        let mut doc = Document::new();
        doc.create_node(NodeSpec::new(Geometry::rect(10.0, 10.0)).with_fill(Paint::solid(Color::rgb(255, 0, 0))))
            .unwrap();
        doc.create_node(
            NodeSpec::new(Geometry::rect(10.0, 10.0))
                .with_transform(Transform::translate(20.0, 0.0))
                .with_fill(Paint::solid(Color::rgb(0, 0, 255))),
        )
        .unwrap();
        doc.snapshot()
    }

    #[test]
    fn default_region_is_content_bounds() {
        let stream = compile_snapshot(&two_squares(), &ExportOptions::default()).unwrap();
        assert_eq!(stream.viewport.region, Rect::new(0.0, 0.0, 30.0, 10.0));
        assert_eq!((stream.viewport.width, stream.viewport.height), (30, 10));
        assert_eq!(stream.items.len(), 2);
    }

    #[test]
    fn region_culls_and_scales() {
        let options = ExportOptions {
            region: Some(Rect::new(0.0, 0.0, 10.0, 10.0)),
            scale: 2.0,
            ..ExportOptions::default()
        };
        let stream = compile_snapshot(&two_squares(), &options).unwrap();
        assert_eq!(stream.items.len(), 1);
        assert_eq!(stream.viewport.width, 20);
    }

    #[test]
    fn empty_document_without_region_is_rejected() {
        let err = export(&DocumentSnapshot::default(), ExportFormat::Svg, &ExportOptions::default()).unwrap_err();
        assert_eq!(err, RenderSurfaceError::InvalidExportSize { width: 0, height: 0 });
    }

    #[test]
    fn oversized_region_is_rejected() {
        let options = ExportOptions {
            region: Some(Rect::new(0.0, 0.0, 1e6, 10.0)),
            ..ExportOptions::default()
        };
        assert!(matches!(
            compile_snapshot(&two_squares(), &options),
            Err(RenderSurfaceError::InvalidExportSize { .. })
        ));
    }

    #[test]
    fn formats_from_extensions() {
        assert_eq!(ExportFormat::from_extension("JPEG"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::from_extension("pdf"), Some(ExportFormat::Pdf));
        assert_eq!(ExportFormat::from_extension("gif"), None);
    }

    #[test]
    fn num_trims() {
        assert_eq!(num(1.5000), "1.5");
        assert_eq!(num(2.0), "2");
        assert_eq!(num(-0.0001), "0");
        assert_eq!(num(0.1234), "0.123");
    }
}
