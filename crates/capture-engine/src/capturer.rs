//! Per-frame GPU readback into an output pipe.

use std::io::Write;

use demorec_capture_model::Resolution;
use demorec_common::error::{DemorecError, DemorecResult};

use crate::gpu::{GpuResources, GraphicsDevice, LockedSurface};

/// Read the current back buffer and write one raw BGRA frame to `sink`.
///
/// The back buffer is copied into the downsample target, resolved into the
/// staging surface, and the locked bits are written. `captured_frames` is
/// incremented once the bytes are written, before the surface is unlocked.
/// When `depth` is set the depth visualization is drawn first.
pub fn read_back<D, W>(
    device: &mut D,
    gpu: &mut GpuResources<D>,
    native: Resolution,
    depth: bool,
    sink: &mut W,
    captured_frames: &mut u64,
) -> DemorecResult<()>
where
    D: GraphicsDevice,
    W: Write + ?Sized,
{
    let GpuResources {
        staging,
        render_target,
        depth: depth_resources,
    } = gpu;

    let staging = staging
        .as_mut()
        .ok_or_else(|| DemorecError::gpu("Staging surface not allocated"))?;
    let render_target = render_target
        .as_mut()
        .ok_or_else(|| DemorecError::gpu("Render target not allocated"))?;

    if depth {
        let resources = depth_resources
            .as_mut()
            .ok_or_else(|| DemorecError::gpu("Depth resources not allocated"))?;
        device.draw_depth(&mut resources.surface, &resources.shader)?;
    }

    {
        let back_buffer = device.back_buffer()?;
        device.stretch_rect(&back_buffer, render_target)?;
    }
    device.get_render_target_data(render_target, staging)?;

    let locked = device.lock_surface(staging)?;
    let written = write_frame(&locked, native, sink);
    drop(locked);
    if written.is_ok() {
        *captured_frames += 1;
    }

    device.unlock_surface(staging)?;
    written
}

/// Write exactly `width * height * 4` bytes of `surface` to `sink`, skipping
/// any row padding.
pub fn write_frame<W: Write + ?Sized>(
    surface: &LockedSurface<'_>,
    size: Resolution,
    sink: &mut W,
) -> DemorecResult<()> {
    let frame_bytes = size.frame_byte_size();
    if frame_bytes == 0 {
        return Err(DemorecError::gpu(format!("Empty capture surface ({size})")));
    }
    let row_bytes = size.width as usize * 4;
    let height = size.height as usize;
    if surface.pitch < row_bytes {
        return Err(DemorecError::gpu(format!(
            "Surface pitch {} is smaller than a row of {} bytes",
            surface.pitch, row_bytes
        )));
    }
    let needed = surface.pitch * (height - 1) + row_bytes;
    if surface.bits.len() < needed {
        return Err(DemorecError::gpu(format!(
            "Locked surface holds {} bytes, expected at least {}",
            surface.bits.len(),
            needed
        )));
    }

    let result = if surface.pitch == row_bytes {
        sink.write_all(&surface.bits[..frame_bytes])
    } else {
        surface
            .bits
            .chunks(surface.pitch)
            .take(height)
            .try_for_each(|row| sink.write_all(&row[..row_bytes]))
    };
    result.map_err(|e| DemorecError::pipe(format!("Failed to write frame: {e}")))
}
