//! Shared GPU types and CPU-side geometry for the path renderer.

use bytemuck::{Pod, Zeroable};
use kurbo::Rect;

use crate::geometry::{FillRule, Transform};
use crate::paint::Color;
use crate::render::FlatPath;

// ── blend ─────────────────────────────────────────────────────────────────

pub(super) fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

pub(super) fn clear_color(color: Color) -> wgpu::Color {
    let [r, g, b, a] = color.to_premultiplied();
    wgpu::Color {
        r: f64::from(r),
        g: f64::from(g),
        b: f64::from(b),
        a: f64::from(a),
    }
}

// ── viewport uniform ──────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct ViewportUniform {
    pub viewport: [f32; 2],
    pub _pad: [f32; 2], // 16-byte alignment
}

impl ViewportUniform {
    pub(super) fn of(size: (u32, u32)) -> Self {
        Self {
            viewport: [size.0.max(1) as f32, size.1.max(1) as f32],
            _pad: [0.0; 2],
        }
    }

    pub(super) fn min_binding_size() -> Option<wgpu::BufferSize> {
        wgpu::BufferSize::new(std::mem::size_of::<Self>() as u64)
    }
}

// ── stencil ───────────────────────────────────────────────────────────────

pub(super) const STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Winding accumulation for one fill rule.
///
/// Non-zero counts front faces up and back faces down; even-odd flips the
/// value on every covering triangle.
pub(super) fn winding_stencil(rule: FillRule) -> wgpu::StencilState {
    let face = |pass_op| wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Always,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    };
    let (front, back) = match rule {
        FillRule::NonZero => (
            face(wgpu::StencilOperation::IncrementWrap),
            face(wgpu::StencilOperation::DecrementWrap),
        ),
        FillRule::EvenOdd => (
            face(wgpu::StencilOperation::Invert),
            face(wgpu::StencilOperation::Invert),
        ),
    };
    wgpu::StencilState {
        front,
        back,
        read_mask: 0xff,
        write_mask: 0xff,
    }
}

/// Shades where the count is non-zero and resets it for the next pass.
pub(super) fn cover_stencil() -> wgpu::StencilState {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::NotEqual,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Zero,
    };
    wgpu::StencilState {
        front: face,
        back: face,
        read_mask: 0xff,
        write_mask: 0xff,
    }
}

pub(super) fn depth_stencil(stencil: wgpu::StencilState) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: STENCIL_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
        stencil,
        bias: wgpu::DepthBiasState::default(),
    }
}

// ── vertices ──────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct StencilVertex {
    pub pos: [f32; 2],
}

impl StencilVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StencilVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Shading modes understood by `fs_cover`.
pub(super) const MODE_SOLID: f32 = 0.0;
pub(super) const MODE_LINEAR: f32 = 1.0;
pub(super) const MODE_RADIAL: f32 = 2.0;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct CoverVertex {
    pub pos: [f32; 2],
    /// Premultiplied solid color, opacity applied.
    pub color: [f32; 4],
    /// `[mode, ramp row v, opacity, 0]`
    pub params: [f32; 4],
    /// Device to gradient space, row by row.
    pub inv0: [f32; 3],
    pub inv1: [f32; 3],
}

impl CoverVertex {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x4, // color
        2 => Float32x4, // params
        3 => Float32x3, // inv0
        4 => Float32x3  // inv1
    ];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<CoverVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Per-pass shading inputs shared by the six cover vertices.
#[derive(Debug, Copy, Clone)]
pub(super) struct CoverShading {
    pub color: [f32; 4],
    pub mode: f32,
    pub ramp_v: f32,
    pub opacity: f32,
    pub from_device: Transform,
}

impl CoverShading {
    pub(super) fn solid(color: Color, opacity: f32) -> Self {
        let [r, g, b, a] = color.to_premultiplied();
        Self {
            color: [r * opacity, g * opacity, b * opacity, a * opacity],
            mode: MODE_SOLID,
            ramp_v: 0.0,
            opacity,
            from_device: Transform::IDENTITY,
        }
    }
}

/// Appends a triangle fan per contour, anchored at its first point.
pub(super) fn push_fan(out: &mut Vec<StencilVertex>, path: &FlatPath) {
    for contour in path.contours.iter().filter(|c| c.len() >= 3) {
        let anchor = contour[0];
        for pair in contour[1..].windows(2) {
            out.push(StencilVertex { pos: anchor });
            out.push(StencilVertex { pos: pair[0] });
            out.push(StencilVertex { pos: pair[1] });
        }
    }
}

/// Appends two triangles covering `bounds`, slightly padded.
pub(super) fn push_cover(out: &mut Vec<CoverVertex>, bounds: Rect, shading: &CoverShading) {
    let b = bounds.inflate(1.0, 1.0);
    let [inv0, inv1] = shading.from_device.to_rows_f32();
    let corner = |x: f64, y: f64| CoverVertex {
        pos: [x as f32, y as f32],
        color: shading.color,
        params: [shading.mode, shading.ramp_v, shading.opacity, 0.0],
        inv0,
        inv1,
    };
    let (tl, tr, br, bl) = (
        corner(b.x0, b.y0),
        corner(b.x1, b.y0),
        corner(b.x1, b.y1),
        corner(b.x0, b.y1),
    );
    out.extend_from_slice(&[tl, tr, br, tl, br, bl]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> FlatPath {
        FlatPath {
            contours: vec![vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]],
            bounds: Rect::new(0.0, 0.0, 10.0, 10.0),
        }
    }

    #[test]
    fn fan_has_n_minus_two_triangles_per_contour() {
        let mut path = square();
        path.contours.push(vec![[0.0, 0.0], [1.0, 0.0]]);
        let mut out = Vec::new();
        push_fan(&mut out, &path);
        assert_eq!(out.len(), 6);
        assert!(out.iter().step_by(3).all(|v| v.pos == [0.0, 0.0]));
    }

    #[test]
    fn cover_quad_spans_bounds() {
        let mut out = Vec::new();
        push_cover(&mut out, Rect::new(2.0, 3.0, 8.0, 9.0), &CoverShading::solid(Color::BLACK, 0.5));
        assert_eq!(out.len(), 6);
        let xs: Vec<f32> = out.iter().map(|v| v.pos[0]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), 1.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 9.0);
        assert_eq!(out[0].color, [0.0, 0.0, 0.0, 0.5]);
        assert_eq!(out[0].params[0], MODE_SOLID);
    }

    #[test]
    fn clear_color_is_premultiplied() {
        let c = clear_color(Color::rgba(255, 255, 255, 0.5));
        assert!((c.r - 0.5).abs() < 1e-6 && (c.a - 0.5).abs() < 1e-6);
    }
}
