//! Synthetic host for driving a capture without a game.
//!
//! The "renderer" paints a moving gradient whose color depends on the
//! visible elements, so each pass of a multi-pass capture is distinguishable
//! in the encoded output.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use demorec_capture_engine::{
    CameraPose, EventRegistry, GraphicsDevice, HostEventKind, LockedSurface, Playback, Renderer,
    RewindState, SurfaceDesc,
};
use demorec_capture_model::{ElementId, Tick};
use demorec_common::error::{DemorecError, DemorecResult};

/// State shared by the synthetic collaborators.
#[derive(Debug, Default)]
pub struct Scene {
    pub tick: Tick,
    pub tint: u8,
    pub depth: bool,
}

pub type SharedScene = Rc<RefCell<Scene>>;

pub struct Frame {
    pixels: Vec<u8>,
}

pub struct DepthSurface;
pub struct DepthShader;

/// Software device rendering BGRA frames at a fixed size.
pub struct SyntheticDevice {
    scene: SharedScene,
    width: u32,
    height: u32,
}

impl SyntheticDevice {
    pub fn new(scene: SharedScene, width: u32, height: u32) -> Self {
        Self {
            scene,
            width,
            height,
        }
    }

    fn frame_len(&self, desc: SurfaceDesc) -> usize {
        desc.width as usize * desc.height as usize * 4
    }

    fn render(&self) -> Vec<u8> {
        let mut scene = self.scene.borrow_mut();
        let (w, h) = (self.width as usize, self.height as usize);
        let mut pixels = vec![0u8; w * h * 4];
        for (i, px) in pixels.chunks_exact_mut(4).enumerate() {
            let (x, y) = (i % w, i / w);
            if scene.depth {
                let d = (y * 255 / h.max(1)) as u8;
                px.copy_from_slice(&[d, d, d, 255]);
            } else {
                let b = (x * 255 / w.max(1)) as u8;
                let g = (y * 255 / h.max(1)) as u8;
                let r = (scene.tick as u8).wrapping_mul(4).wrapping_add(scene.tint);
                px.copy_from_slice(&[b, g, r, 255]);
            }
        }
        scene.depth = false;
        pixels
    }
}

impl GraphicsDevice for SyntheticDevice {
    type BackBuffer = Frame;
    type StagingSurface = Frame;
    type RenderTarget = Frame;
    type DepthSurface = DepthSurface;
    type DepthShader = DepthShader;

    fn back_buffer(&mut self) -> DemorecResult<Frame> {
        Ok(Frame {
            pixels: self.render(),
        })
    }

    fn describe(&self, _back_buffer: &Frame) -> DemorecResult<SurfaceDesc> {
        Ok(SurfaceDesc {
            width: self.width,
            height: self.height,
        })
    }

    fn create_staging_surface(&mut self, desc: SurfaceDesc) -> DemorecResult<Frame> {
        Ok(Frame {
            pixels: vec![0; self.frame_len(desc)],
        })
    }

    fn create_render_target(&mut self, desc: SurfaceDesc) -> DemorecResult<Frame> {
        Ok(Frame {
            pixels: vec![0; self.frame_len(desc)],
        })
    }

    fn create_depth_resources(&mut self, _desc: SurfaceDesc) -> DemorecResult<(DepthSurface, DepthShader)> {
        Ok((DepthSurface, DepthShader))
    }

    fn stretch_rect(&mut self, back_buffer: &Frame, target: &mut Frame) -> DemorecResult<()> {
        copy_pixels(&back_buffer.pixels, &mut target.pixels)
    }

    fn get_render_target_data(&mut self, target: &Frame, staging: &mut Frame) -> DemorecResult<()> {
        copy_pixels(&target.pixels, &mut staging.pixels)
    }

    fn draw_depth(&mut self, _surface: &mut DepthSurface, _shader: &DepthShader) -> DemorecResult<()> {
        self.scene.borrow_mut().depth = true;
        Ok(())
    }

    fn lock_surface<'a>(&mut self, staging: &'a mut Frame) -> DemorecResult<LockedSurface<'a>> {
        Ok(LockedSurface {
            bits: &staging.pixels,
            pitch: self.width as usize * 4,
        })
    }

    fn unlock_surface(&mut self, _staging: &mut Frame) -> DemorecResult<()> {
        Ok(())
    }
}

fn copy_pixels(src: &[u8], dst: &mut [u8]) -> DemorecResult<()> {
    if src.len() != dst.len() {
        return Err(DemorecError::gpu(format!(
            "Surface size mismatch ({} vs {} bytes)",
            src.len(),
            dst.len()
        )));
    }
    dst.copy_from_slice(src);
    Ok(())
}

/// Maps visible elements to a color tint.
pub struct SyntheticRenderer {
    scene: SharedScene,
}

impl SyntheticRenderer {
    pub fn new(scene: SharedScene) -> Self {
        Self { scene }
    }
}

impl Renderer for SyntheticRenderer {
    fn force_single_threaded(&mut self) -> DemorecResult<()> {
        Ok(())
    }

    fn set_visible_elements(&mut self, elements: &BTreeSet<ElementId>) {
        let tint = elements
            .iter()
            .fold(0u8, |acc, id| acc.wrapping_add((id.0 as u8).wrapping_mul(85)));
        self.scene.borrow_mut().tint = tint;
    }

    fn reset_visible_elements(&mut self) {
        self.scene.borrow_mut().tint = 0;
    }

    fn draw_pass(&mut self, pass_index: usize) {
        tracing::trace!(pass = pass_index, "Synthetic pass drawn");
    }

    fn camera_pose(&self) -> CameraPose {
        let t = self.scene.borrow().tick as f32;
        CameraPose {
            position: [t.cos() * 256.0, t.sin() * 256.0, 64.0],
            rotation: [0.0, t.to_degrees() % 360.0, 0.0],
            fov: 90.0,
        }
    }
}

/// A timeline that never rewinds.
pub struct SyntheticTimeline {
    scene: SharedScene,
}

impl SyntheticTimeline {
    pub fn new(scene: SharedScene) -> Self {
        Self { scene }
    }
}

impl Playback for SyntheticTimeline {
    fn current_tick(&self) -> Tick {
        self.scene.borrow().tick
    }

    fn seek_to_tick(&mut self, tick: Tick) {
        self.scene.borrow_mut().tick = tick;
    }
}

impl RewindState for SyntheticTimeline {
    fn is_rewinding(&self) -> bool {
        false
    }
}

/// Records which events the session subscribed to.
#[derive(Debug, Default)]
pub struct Subscriptions {
    pub kinds: Vec<HostEventKind>,
}

impl Subscriptions {
    pub fn wants(&self, kind: HostEventKind) -> bool {
        self.kinds.contains(&kind)
    }
}

impl EventRegistry for Subscriptions {
    fn register_listener(&mut self, kind: HostEventKind) {
        self.kinds.push(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tint_changes_red_channel() {
        let scene = SharedScene::default();
        let mut device = SyntheticDevice::new(scene.clone(), 4, 2);
        let plain = device.back_buffer().unwrap();

        let mut renderer = SyntheticRenderer::new(scene.clone());
        renderer.set_visible_elements(&[ElementId(1)].into_iter().collect());
        let tinted = device.back_buffer().unwrap();

        assert_eq!(plain.pixels.len(), 32);
        assert_eq!(plain.pixels[2], 0);
        assert_eq!(tinted.pixels[2], 85);
        assert_eq!(tinted.pixels[3], 255);
    }

    #[test]
    fn test_depth_draw_applies_to_next_frame_only() {
        let scene = SharedScene::default();
        let mut device = SyntheticDevice::new(scene.clone(), 2, 2);
        device.draw_depth(&mut DepthSurface, &DepthShader).unwrap();
        let depth = device.back_buffer().unwrap();
        assert_eq!(depth.pixels[0], depth.pixels[1]);
        assert!(!scene.borrow().depth);
    }
}
