use crate::coords::Viewport;

/// Device-side context for one frame (device/queue + surface format + viewport).
///
/// Borrowed from whoever owns the device; the engine never creates one.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub viewport: Viewport, // logical px
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        viewport: Viewport,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            viewport,
        }
    }
}

/// Colour attachment the frame draws into.
///
/// Each flush records and submits its own encoder, so only the view is held.
pub struct RenderTarget<'a> {
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(color_view: &'a wgpu::TextureView) -> Self {
        Self { color_view }
    }
}
