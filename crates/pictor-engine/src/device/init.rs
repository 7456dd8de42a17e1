/// Initialization parameters for the GPU layer.
///
/// The defaults target broad portability: no optional features, and WebGL2
/// limits plus the GL backend when compiled for the browser.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends the instance may pick from.
    pub backends: wgpu::Backends,

    /// Prefer an sRGB surface format when available.
    ///
    /// Off by default: document colors are sRGB bytes and are blended as such,
    /// matching the export backends.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Hint only; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        #[cfg(target_arch = "wasm32")]
        let (backends, required_limits) = (wgpu::Backends::GL, wgpu::Limits::downlevel_webgl2_defaults());
        #[cfg(not(target_arch = "wasm32"))]
        let (backends, required_limits) = (wgpu::Backends::all(), wgpu::Limits::default());

        Self {
            backends,
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits,
            desired_maximum_frame_latency: 2,
        }
    }
}
