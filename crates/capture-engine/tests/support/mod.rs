//! In-memory host for driving a capture session in tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use demorec_capture_engine::{
    CameraPose, CaptureSession, EncoderSetup, EventRegistry, FrameOutcome, GraphicsDevice,
    HostEventKind, HostServices, LockedSurface, Playback, Renderer, RewindState, SurfaceDesc,
};
use demorec_capture_model::{CaptureSettings, ElementId, Tick};
use demorec_common::config::AppConfig;
use demorec_common::error::{DemorecError, DemorecResult};
use demorec_encoder::{EncoderCommand, FramePipe, PipeLauncher};

pub const WIDTH: u32 = 8;
pub const HEIGHT: u32 = 4;
/// Row pitch with padding past the visible row.
pub const PITCH: usize = WIDTH as usize * 4 + 8;
pub const FRAME_BYTES: usize = WIDTH as usize * HEIGHT as usize * 4;

/// Pixel value of the back buffer with default visibility.
pub const BASE_FILL: u8 = 0x10;
/// Pixel value after the depth visualization is drawn.
pub const DEPTH_FILL: u8 = 0xD0;
const PADDING_FILL: u8 = 0xEE;

pub type Shared<T> = Rc<RefCell<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    BackBuffer,
    Staging,
    RenderTarget,
    DepthSurface,
    DepthShader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    BackBuffer,
    Staging,
    RenderTarget,
    StretchRect,
    RenderTargetData,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Counts {
    pub created: usize,
    pub live: i64,
}

/// Everything the fake collaborators observe or expose.
#[derive(Debug, Default)]
pub struct HostLog {
    pub back_buffers: Counts,
    pub staging: Counts,
    pub render_targets: Counts,
    pub depth_surfaces: Counts,
    pub depth_shaders: Counts,
    pub fail: Option<FailPoint>,
    /// Fail the n-th lock (1-based).
    pub fail_lock_at: Option<usize>,
    /// Fail the n-th unlock (1-based).
    pub fail_unlock_at: Option<usize>,
    pub locks: usize,
    pub unlocks: usize,
    pub depth_draws: usize,

    pub single_threaded: bool,
    pub fill: u8,
    pub visible_history: Vec<BTreeSet<ElementId>>,
    pub visibility_resets: usize,
    pub drawn_passes: Vec<usize>,

    pub tick: Tick,
    pub seeks: Vec<Tick>,
    pub rewinding: bool,
}

impl HostLog {
    pub fn new() -> Self {
        Self {
            fill: BASE_FILL,
            ..Self::default()
        }
    }

    fn counts_mut(&mut self, resource: Resource) -> &mut Counts {
        match resource {
            Resource::BackBuffer => &mut self.back_buffers,
            Resource::Staging => &mut self.staging,
            Resource::RenderTarget => &mut self.render_targets,
            Resource::DepthSurface => &mut self.depth_surfaces,
            Resource::DepthShader => &mut self.depth_shaders,
        }
    }

    /// Whether any device handle is still alive.
    pub fn any_live(&self) -> bool {
        [
            self.back_buffers,
            self.staging,
            self.render_targets,
            self.depth_surfaces,
            self.depth_shaders,
        ]
        .iter()
        .any(|c| c.live != 0)
    }
}

/// Counts creation and release of a device handle.
pub struct Tracked {
    resource: Resource,
    log: Shared<HostLog>,
}

impl Tracked {
    fn new(resource: Resource, log: &Shared<HostLog>) -> Self {
        {
            let mut log = log.borrow_mut();
            let counts = log.counts_mut(resource);
            counts.created += 1;
            counts.live += 1;
        }
        Self {
            resource,
            log: log.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.log.borrow_mut().counts_mut(self.resource).live -= 1;
    }
}

pub struct FakeBackBuffer {
    _tracked: Tracked,
    fill: u8,
}

pub struct FakeStaging {
    _tracked: Tracked,
    bits: Vec<u8>,
}

pub struct FakeRenderTarget {
    _tracked: Tracked,
    fill: u8,
}

/// Device whose back buffer is a solid color taken from [`HostLog::fill`].
pub struct FakeDevice {
    log: Shared<HostLog>,
}

impl FakeDevice {
    fn check(&self, point: FailPoint) -> DemorecResult<()> {
        if self.log.borrow().fail == Some(point) {
            return Err(DemorecError::gpu(format!("injected {point:?} failure")));
        }
        Ok(())
    }
}

impl GraphicsDevice for FakeDevice {
    type BackBuffer = FakeBackBuffer;
    type StagingSurface = FakeStaging;
    type RenderTarget = FakeRenderTarget;
    type DepthSurface = Tracked;
    type DepthShader = Tracked;

    fn back_buffer(&mut self) -> DemorecResult<FakeBackBuffer> {
        self.check(FailPoint::BackBuffer)?;
        let fill = self.log.borrow().fill;
        Ok(FakeBackBuffer {
            _tracked: Tracked::new(Resource::BackBuffer, &self.log),
            fill,
        })
    }

    fn describe(&self, _back_buffer: &FakeBackBuffer) -> DemorecResult<SurfaceDesc> {
        Ok(SurfaceDesc {
            width: WIDTH,
            height: HEIGHT,
        })
    }

    fn create_staging_surface(&mut self, desc: SurfaceDesc) -> DemorecResult<FakeStaging> {
        self.check(FailPoint::Staging)?;
        Ok(FakeStaging {
            _tracked: Tracked::new(Resource::Staging, &self.log),
            bits: vec![0; PITCH * desc.height as usize],
        })
    }

    fn create_render_target(&mut self, _desc: SurfaceDesc) -> DemorecResult<FakeRenderTarget> {
        self.check(FailPoint::RenderTarget)?;
        Ok(FakeRenderTarget {
            _tracked: Tracked::new(Resource::RenderTarget, &self.log),
            fill: 0,
        })
    }

    fn create_depth_resources(&mut self, _desc: SurfaceDesc) -> DemorecResult<(Tracked, Tracked)> {
        Ok((
            Tracked::new(Resource::DepthSurface, &self.log),
            Tracked::new(Resource::DepthShader, &self.log),
        ))
    }

    fn stretch_rect(
        &mut self,
        back_buffer: &FakeBackBuffer,
        target: &mut FakeRenderTarget,
    ) -> DemorecResult<()> {
        self.check(FailPoint::StretchRect)?;
        target.fill = back_buffer.fill;
        Ok(())
    }

    fn get_render_target_data(
        &mut self,
        target: &FakeRenderTarget,
        staging: &mut FakeStaging,
    ) -> DemorecResult<()> {
        self.check(FailPoint::RenderTargetData)?;
        let row_bytes = WIDTH as usize * 4;
        for row in staging.bits.chunks_mut(PITCH) {
            row[..row_bytes].fill(target.fill);
            row[row_bytes..].fill(PADDING_FILL);
        }
        Ok(())
    }

    fn draw_depth(&mut self, _surface: &mut Tracked, _shader: &Tracked) -> DemorecResult<()> {
        let mut log = self.log.borrow_mut();
        log.depth_draws += 1;
        log.fill = DEPTH_FILL;
        Ok(())
    }

    fn lock_surface<'a>(&mut self, staging: &'a mut FakeStaging) -> DemorecResult<LockedSurface<'a>> {
        let mut log = self.log.borrow_mut();
        log.locks += 1;
        if log.fail_lock_at == Some(log.locks) {
            return Err(DemorecError::gpu("injected lock failure"));
        }
        Ok(LockedSurface {
            bits: &staging.bits,
            pitch: PITCH,
        })
    }

    fn unlock_surface(&mut self, _staging: &mut FakeStaging) -> DemorecResult<()> {
        let mut log = self.log.borrow_mut();
        log.unlocks += 1;
        if log.fail_unlock_at == Some(log.unlocks) {
            return Err(DemorecError::gpu("injected unlock failure"));
        }
        Ok(())
    }
}

/// Renderer that paints the back buffer with the first visible element id.
pub struct FakeRenderer {
    log: Shared<HostLog>,
}

impl Renderer for FakeRenderer {
    fn force_single_threaded(&mut self) -> DemorecResult<()> {
        self.log.borrow_mut().single_threaded = true;
        Ok(())
    }

    fn set_visible_elements(&mut self, elements: &BTreeSet<ElementId>) {
        let mut log = self.log.borrow_mut();
        log.fill = elements
            .iter()
            .next()
            .map(|id| id.0 as u8)
            .unwrap_or(BASE_FILL);
        log.visible_history.push(elements.clone());
    }

    fn reset_visible_elements(&mut self) {
        let mut log = self.log.borrow_mut();
        log.visibility_resets += 1;
        log.fill = BASE_FILL;
    }

    fn draw_pass(&mut self, pass_index: usize) {
        self.log.borrow_mut().drawn_passes.push(pass_index);
    }

    fn camera_pose(&self) -> CameraPose {
        let tick = self.log.borrow().tick;
        CameraPose {
            position: [tick as f32, 0.0, 64.0],
            rotation: [0.0, 45.0, 0.0],
            fov: 90.0,
        }
    }
}

pub struct FakeTimeline {
    log: Shared<HostLog>,
}

impl Playback for FakeTimeline {
    fn current_tick(&self) -> Tick {
        self.log.borrow().tick
    }

    fn seek_to_tick(&mut self, tick: Tick) {
        let mut log = self.log.borrow_mut();
        log.tick = tick;
        log.seeks.push(tick);
    }
}

impl RewindState for FakeTimeline {
    fn is_rewinding(&self) -> bool {
        self.log.borrow().rewinding
    }
}

#[derive(Debug, Default)]
pub struct RecordingRegistry {
    pub kinds: Vec<HostEventKind>,
}

impl EventRegistry for RecordingRegistry {
    fn register_listener(&mut self, kind: HostEventKind) {
        self.kinds.push(kind);
    }
}

/// Bytes received by one in-memory encoder.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    pub command: EncoderCommand,
    pub bytes: Vec<u8>,
    pub finished: bool,
}

impl MemoryStream {
    pub fn frames(&self) -> usize {
        self.bytes.len() / FRAME_BYTES
    }

    pub fn output_name(&self) -> String {
        self.command
            .output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub struct MemoryLauncher {
    streams: Shared<Vec<MemoryStream>>,
    /// Fail when opening the n-th pipe (0-based).
    fail_on_open: Option<usize>,
}

impl PipeLauncher for MemoryLauncher {
    fn open(&mut self, command: &EncoderCommand) -> DemorecResult<Box<dyn FramePipe>> {
        let mut streams = self.streams.borrow_mut();
        if self.fail_on_open == Some(streams.len()) {
            return Err(DemorecError::pipe("injected open failure"));
        }
        streams.push(MemoryStream {
            command: command.clone(),
            bytes: Vec::new(),
            finished: false,
        });
        Ok(Box::new(MemoryPipe {
            index: streams.len() - 1,
            streams: self.streams.clone(),
        }))
    }
}

struct MemoryPipe {
    index: usize,
    streams: Shared<Vec<MemoryStream>>,
}

impl Write for MemoryPipe {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.streams.borrow_mut()[self.index]
            .bytes
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl FramePipe for MemoryPipe {
    fn finish(self: Box<Self>) -> DemorecResult<()> {
        self.streams.borrow_mut()[self.index].finished = true;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct HarnessOptions {
    pub encoder_missing: bool,
    pub fail_on_open: Option<usize>,
    pub empty_output_directory: bool,
}

/// A session wired to the fakes above.
pub struct Harness {
    pub log: Shared<HostLog>,
    pub streams: Shared<Vec<MemoryStream>>,
    pub registry: RecordingRegistry,
    pub session: CaptureSession<FakeDevice>,
    pub dir: PathBuf,
    pub encoder: PathBuf,
}

impl Harness {
    pub fn new(name: &str) -> Self {
        Self::with_options(name, HarnessOptions::default())
    }

    pub fn with_options(name: &str, options: HarnessOptions) -> Self {
        let dir = std::env::temp_dir().join(format!("demorec_test_session_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let encoder = dir.join("bin").join("ffmpeg");
        let log = Rc::new(RefCell::new(HostLog::new()));
        let streams = Rc::new(RefCell::new(Vec::new()));

        let mut preferences = AppConfig::default();
        if !options.empty_output_directory {
            preferences.capture.output_directory = dir.join("out");
        }

        let host = HostServices {
            renderer: Box::new(FakeRenderer { log: log.clone() }),
            playback: Box::new(FakeTimeline { log: log.clone() }),
            rewind: Box::new(FakeTimeline { log: log.clone() }),
            preferences: Box::new(preferences),
        };
        let encoder_setup = EncoderSetup {
            executable: encoder.clone(),
            launcher: Box::new(MemoryLauncher {
                streams: streams.clone(),
                fail_on_open: options.fail_on_open,
            }),
        };

        let mut session = CaptureSession::new(FakeDevice { log: log.clone() }, host, encoder_setup);
        let mut registry = RecordingRegistry::default();
        session.initialize(&mut registry).unwrap();

        let harness = Self {
            log,
            streams,
            registry,
            session,
            dir,
            encoder,
        };
        if !options.encoder_missing {
            harness.install_encoder();
        }
        harness
    }

    pub fn install_encoder(&self) {
        std::fs::create_dir_all(self.encoder.parent().unwrap()).unwrap();
        std::fs::write(&self.encoder, b"").unwrap();
    }

    pub fn configure(&mut self, update: impl FnOnce(&mut CaptureSettings)) {
        self.session.configure(update).unwrap();
    }

    pub fn set_range(&mut self, start: Tick, end: Tick, framerate: i32) {
        self.configure(|s| {
            s.start_tick = start;
            s.end_tick = end;
            s.framerate = framerate;
        });
    }

    /// One render callback: advance the timeline if the session allows it,
    /// prepare, then capture.
    pub fn step(&mut self) -> DemorecResult<FrameOutcome> {
        if self.session.on_game_frame() > 0 {
            self.log.borrow_mut().tick += 1;
        }
        self.session.prepare_frame();
        self.session.capture_frame()
    }

    /// Step until the session stops capturing; returns the frames captured.
    pub fn run_to_end(&mut self) -> usize {
        let mut captured = 0;
        for _ in 0..100_000 {
            match self.step().unwrap() {
                FrameOutcome::Captured => captured += 1,
                FrameOutcome::RangeEnded | FrameOutcome::NotCapturing => return captured,
            }
        }
        panic!("capture did not reach the end of its range");
    }

    pub fn stream(&self, index: usize) -> MemoryStream {
        self.streams.borrow()[index].clone()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.borrow().len()
    }

    pub fn cleanup(self) {
        let dir = self.dir.clone();
        drop(self);
        std::fs::remove_dir_all(&dir).ok();
    }
}
