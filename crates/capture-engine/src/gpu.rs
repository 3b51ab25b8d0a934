//! Graphics device abstraction and session-owned GPU resources.

use demorec_capture_model::Resolution;
use demorec_common::error::DemorecResult;

/// Size of a device surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDesc {
    pub width: u32,
    pub height: u32,
}

impl SurfaceDesc {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(
            i32::try_from(self.width).unwrap_or(i32::MAX),
            i32::try_from(self.height).unwrap_or(i32::MAX),
        )
    }
}

/// CPU view of a locked staging surface.
///
/// `bits` holds `pitch` bytes per row; rows may be padded past `width * 4`.
#[derive(Debug)]
pub struct LockedSurface<'a> {
    pub bits: &'a [u8],
    pub pitch: usize,
}

/// The host's graphics device.
///
/// Every handle is an owning value: dropping it releases the underlying
/// device object. The back buffer is only ever borrowed for one call
/// sequence and dropped immediately.
pub trait GraphicsDevice {
    type BackBuffer;
    type StagingSurface;
    type RenderTarget;
    type DepthSurface;
    type DepthShader;

    fn back_buffer(&mut self) -> DemorecResult<Self::BackBuffer>;
    fn describe(&self, back_buffer: &Self::BackBuffer) -> DemorecResult<SurfaceDesc>;

    /// CPU-readable surface in system memory.
    fn create_staging_surface(&mut self, desc: SurfaceDesc) -> DemorecResult<Self::StagingSurface>;

    /// GPU-side downsample target.
    fn create_render_target(&mut self, desc: SurfaceDesc) -> DemorecResult<Self::RenderTarget>;

    fn create_depth_resources(
        &mut self,
        desc: SurfaceDesc,
    ) -> DemorecResult<(Self::DepthSurface, Self::DepthShader)>;

    /// Copy the back buffer into `target`.
    fn stretch_rect(
        &mut self,
        back_buffer: &Self::BackBuffer,
        target: &mut Self::RenderTarget,
    ) -> DemorecResult<()>;

    /// Resolve `target` into the CPU-readable `staging` surface.
    fn get_render_target_data(
        &mut self,
        target: &Self::RenderTarget,
        staging: &mut Self::StagingSurface,
    ) -> DemorecResult<()>;

    /// Render the depth visualization into the back buffer.
    fn draw_depth(
        &mut self,
        surface: &mut Self::DepthSurface,
        shader: &Self::DepthShader,
    ) -> DemorecResult<()>;

    fn lock_surface<'a>(
        &mut self,
        staging: &'a mut Self::StagingSurface,
    ) -> DemorecResult<LockedSurface<'a>>;

    fn unlock_surface(&mut self, staging: &mut Self::StagingSurface) -> DemorecResult<()>;
}

/// Depth surface and its shader, created and released together.
pub struct DepthResources<D: GraphicsDevice> {
    pub surface: D::DepthSurface,
    pub shader: D::DepthShader,
}

/// GPU resources held for the duration of one capture.
///
/// All fields start empty and are filled by [`GpuResources::allocate`].
/// [`GpuResources::release`] drops whatever is held, so it is safe after a
/// partial allocation and safe to repeat.
pub struct GpuResources<D: GraphicsDevice> {
    pub staging: Option<D::StagingSurface>,
    pub render_target: Option<D::RenderTarget>,
    pub depth: Option<DepthResources<D>>,
}

impl<D: GraphicsDevice> Default for GpuResources<D> {
    fn default() -> Self {
        Self {
            staging: None,
            render_target: None,
            depth: None,
        }
    }
}

impl<D: GraphicsDevice> GpuResources<D> {
    /// Create the staging surface, render target, and optionally the depth
    /// pair, all at `desc`. Stops at the first failure, keeping what was
    /// already created for the caller's rollback.
    pub fn allocate(&mut self, device: &mut D, desc: SurfaceDesc, with_depth: bool) -> DemorecResult<()> {
        self.staging = Some(device.create_staging_surface(desc)?);
        self.render_target = Some(device.create_render_target(desc)?);
        if with_depth {
            let (surface, shader) = device.create_depth_resources(desc)?;
            self.depth = Some(DepthResources { surface, shader });
        }
        tracing::debug!(
            width = desc.width,
            height = desc.height,
            depth = with_depth,
            "Allocated capture surfaces"
        );
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.staging.is_none() && self.render_target.is_none() && self.depth.is_none()
    }

    /// Release everything held. Returns whether anything was released.
    pub fn release(&mut self) -> bool {
        let held = !self.is_empty();
        self.depth = None;
        self.render_target = None;
        self.staging = None;
        held
    }
}
