use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use resvg::{tiny_skia, usvg};

use crate::error::RenderSurfaceError;
use crate::paint::Color;
use crate::render::DrawStream;

use super::write_svg;

pub(super) fn encode_png(stream: &DrawStream) -> Result<Vec<u8>, RenderSurfaceError> {
    let (w, h) = (stream.viewport.width, stream.viewport.height);
    let rgba = rasterize(stream)?;
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&rgba, w, h, ExtendedColorType::Rgba8)
        .map_err(|e| RenderSurfaceError::Encode(format!("png: {e}")))?;
    Ok(out)
}

/// JPEG has no alpha channel; callers flatten the background first.
pub(super) fn encode_jpeg(stream: &DrawStream, quality: u8) -> Result<Vec<u8>, RenderSurfaceError> {
    let (w, h) = (stream.viewport.width, stream.viewport.height);
    let rgb: Vec<u8> = rasterize(stream)?
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .write_image(&rgb, w, h, ExtendedColorType::Rgb8)
        .map_err(|e| RenderSurfaceError::Encode(format!("jpeg: {e}")))?;
    Ok(out)
}

/// Composites `color` over opaque white.
pub(super) fn flatten_onto_white(color: Color) -> Color {
    let a = color.a.clamp(0.0, 1.0);
    let over = |c: u8| (f32::from(c) * a + 255.0 * (1.0 - a)).round() as u8;
    Color::rgb(over(color.r), over(color.g), over(color.b))
}

/// Straight-alpha RGBA8 pixels of the stream, row-major.
fn rasterize(stream: &DrawStream) -> Result<Vec<u8>, RenderSurfaceError> {
    let (w, h) = (stream.viewport.width, stream.viewport.height);
    let svg = write_svg(stream);
    let tree = usvg::Tree::from_str(&svg, &usvg::Options::default())
        .map_err(|e| RenderSurfaceError::Encode(format!("svg: {e}")))?;
    let mut pixmap = tiny_skia::Pixmap::new(w, h).ok_or(RenderSurfaceError::InvalidExportSize { width: w, height: h })?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    Ok(pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{compile_snapshot, tests::two_squares, ExportOptions};

    #[test]
    fn png_pixels_match_fills() {
        let stream = compile_snapshot(&two_squares(), &ExportOptions::default()).unwrap();
        let png = encode_png(&stream).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));

        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (30, 10));
        assert_eq!(img.get_pixel(5, 5).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(25, 5).0, [0, 0, 255, 255]);
        // The gap between the squares stays transparent.
        assert_eq!(img.get_pixel(15, 5).0[3], 0);
    }

    #[test]
    fn jpeg_starts_with_soi() {
        let mut stream = compile_snapshot(&two_squares(), &ExportOptions::default()).unwrap();
        stream.clear = flatten_onto_white(stream.clear);
        let jpeg = encode_jpeg(&stream, 80).unwrap();
        assert!(jpeg.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn flattening_blends_toward_white() {
        assert_eq!(flatten_onto_white(Color::TRANSPARENT), Color::WHITE);
        assert_eq!(flatten_onto_white(Color::rgb(10, 20, 30)), Color::rgb(10, 20, 30));
        assert_eq!(flatten_onto_white(Color::BLACK.with_alpha(0.5)), Color::rgb(128, 128, 128));
    }
}
