//! Capture session management.

use std::path::PathBuf;

use demorec_capture_model::{CaptureSettings, Resolution, ResolutionCatalog};
use demorec_common::config::default_output_directory;
use demorec_common::error::{DemorecError, DemorecResult};
use demorec_encoder::{encoder_exists, CommandBuilder, FramePipe};

use crate::camera::{CameraDataWriter, CameraRecord};
use crate::capturer::read_back;
use crate::gpu::{GpuResources, GraphicsDevice, SurfaceDesc};
use crate::host::{EncoderSetup, EventRegistry, HostEvent, HostEventKind, HostServices};
use crate::multipass;

/// State of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No capture running; nothing allocated.
    Idle,
    /// GPU resources and outputs are open and frames are being written.
    Capturing,
}

/// What [`CaptureSession::capture_frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The session was idle; nothing happened.
    NotCapturing,
    /// A frame was written.
    Captured,
    /// The timeline passed the end tick and the session stopped.
    RangeEnded,
}

/// Encoder pipes and the camera data file of a running capture.
#[derive(Default)]
struct OutputStreams {
    /// Single stream when there are no passes.
    anchor: Option<Box<dyn FramePipe>>,
    /// One stream per pass, in pass order.
    passes: Vec<Box<dyn FramePipe>>,
    camera: Option<CameraDataWriter>,
}

impl OutputStreams {
    fn is_empty(&self) -> bool {
        self.anchor.is_none() && self.passes.is_empty() && self.camera.is_none()
    }

    /// Finish every open stream. Failures are logged; closing continues.
    fn close(&mut self) {
        if let Some(pipe) = self.anchor.take() {
            if let Err(e) = pipe.finish() {
                tracing::error!(error = %e, "Failed to close encoder pipe");
            }
        }
        for (pass, pipe) in self.passes.drain(..).enumerate() {
            if let Err(e) = pipe.finish() {
                tracing::error!(pass, error = %e, "Failed to close encoder pipe");
            }
        }
        if let Some(camera) = self.camera.take() {
            let path = camera.path().to_path_buf();
            match camera.finish() {
                Ok(records) => {
                    tracing::debug!(records, path = %path.display(), "Closed camera data file")
                }
                Err(e) => tracing::error!(error = %e, "Failed to close camera data file"),
            }
        }
    }
}

/// A frame-accurate capture of the host's render loop.
///
/// The host drives the session from its render thread:
///
/// 1. [`on_game_frame`](Self::on_game_frame) before advancing the timeline,
/// 2. [`prepare_frame`](Self::prepare_frame) before rendering,
/// 3. [`capture_frame`](Self::capture_frame) after rendering.
///
/// The session owns every GPU resource and output stream it opens.
/// [`stop_capture`](Self::stop_capture) is the only release path and runs
/// on every failure.
pub struct CaptureSession<D: GraphicsDevice> {
    device: D,
    host: HostServices,
    encoder: EncoderSetup,
    state: SessionState,
    settings: CaptureSettings,
    catalog: ResolutionCatalog,
    native: Resolution,
    captured_frame_count: u64,
    frame_prepared: bool,
    ffmpeg_not_found: bool,
    gpu: GpuResources<D>,
    outputs: OutputStreams,
}

impl<D: GraphicsDevice> CaptureSession<D> {
    pub fn new(device: D, host: HostServices, encoder: EncoderSetup) -> Self {
        Self {
            device,
            host,
            encoder,
            state: SessionState::Idle,
            settings: CaptureSettings::with_native(Resolution::default()),
            catalog: ResolutionCatalog::default(),
            native: Resolution::default(),
            captured_frame_count: 0,
            frame_prepared: false,
            ffmpeg_not_found: false,
            gpu: GpuResources::default(),
            outputs: OutputStreams::default(),
        }
    }

    /// Prepare the session once the graphics device is ready.
    ///
    /// Forces single-threaded rendering, derives the resolution catalog and
    /// default settings from the back buffer, defaults the output directory,
    /// and registers for host events.
    pub fn initialize(&mut self, events: &mut dyn EventRegistry) -> DemorecResult<()> {
        if let Err(e) = self.host.renderer.force_single_threaded() {
            tracing::error!(error = %e, "Could not force single-threaded rendering");
        }

        let desc = self.back_buffer_desc().map_err(|e| {
            tracing::error!(error = %e, "Failed to query back buffer. Capture resolution not found");
            e
        })?;
        self.native = desc.resolution();
        self.catalog = ResolutionCatalog::from_native(self.native);
        self.settings = CaptureSettings::with_native(self.native);

        if self
            .host
            .preferences
            .capture_output_directory()
            .as_os_str()
            .is_empty()
        {
            self.host
                .preferences
                .set_capture_output_directory(default_output_directory());
        }

        events.register_listener(HostEventKind::BoundsDetermined);
        events.register_listener(HostEventKind::RenderFrame);

        tracing::info!(
            native = %self.native,
            output_dir = %self.host.preferences.capture_output_directory().display(),
            "Capture session initialized"
        );
        Ok(())
    }

    /// Deliver a host event registered during [`initialize`](Self::initialize).
    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::BoundsDetermined { end_tick } => {
                if self.settings.seed_tick_range(end_tick) {
                    tracing::info!(
                        start_tick = self.settings.start_tick,
                        end_tick = self.settings.end_tick,
                        "Seeded capture range from timeline bounds"
                    );
                }
            }
            HostEvent::RenderFrame => {
                if !self.is_capturing() || self.host.rewind.is_rewinding() {
                    return;
                }
                tracing::trace!(frame = self.captured_frame_count, "Render frame");
            }
        }
    }

    /// Start capturing.
    ///
    /// On any failure after validation the session is rolled back through
    /// [`stop_capture`](Self::stop_capture) and the error is returned.
    pub fn start_capture(&mut self) -> DemorecResult<()> {
        if self.is_capturing() {
            tracing::warn!("Capture already running");
            return Ok(());
        }

        if let Err(e) = self.settings.validate() {
            tracing::error!(error = %e, "Invalid capture settings");
            return Err(e);
        }

        match self.open_capture() {
            Ok(()) => {
                self.state = SessionState::Capturing;
                tracing::info!(
                    format = self.settings.output_format.label(),
                    passes = self.settings.pass_count(),
                    "Capture started"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start capture");
                self.stop_capture();
                Err(e)
            }
        }
    }

    /// Stop capturing and release everything the session holds.
    ///
    /// Safe to call at any time, any number of times.
    pub fn stop_capture(&mut self) {
        let active = self.state == SessionState::Capturing
            || self.frame_prepared
            || !self.outputs.is_empty()
            || !self.gpu.is_empty();
        if !active {
            tracing::debug!("Capture already stopped");
            return;
        }

        tracing::info!(frames = self.captured_frame_count, "Stopped capture");
        self.state = SessionState::Idle;
        self.host.renderer.reset_visible_elements();
        self.frame_prepared = false;

        self.outputs.close();
        self.gpu.release();
    }

    /// Start when idle, stop when capturing.
    pub fn toggle_capture(&mut self) -> DemorecResult<()> {
        if self.is_capturing() {
            self.stop_capture();
            Ok(())
        } else {
            self.start_capture()
        }
    }

    /// Select the visible elements for the frame about to be rendered.
    pub fn prepare_frame(&mut self) {
        if !self.is_capturing() {
            return;
        }
        if let Some(index) = self.current_pass_index() {
            let elements = &self.settings.passes[index].elements;
            self.host.renderer.set_visible_elements(elements);
        }
        self.frame_prepared = true;
    }

    /// Capture the frame just rendered.
    ///
    /// The end-of-range check runs before readback: a frame whose tick lies
    /// past the end of the range is not written and the session stops
    /// instead. Any failure aborts the session before the error
    /// is returned; frames already written stay with the encoder.
    pub fn capture_frame(&mut self) -> DemorecResult<FrameOutcome> {
        if !self.is_capturing() {
            return Ok(FrameOutcome::NotCapturing);
        }
        let prepared = std::mem::replace(&mut self.frame_prepared, false);

        if !self.host.rewind.is_rewinding() {
            let tick = self.host.playback.current_tick();
            if tick > self.settings.end_tick {
                tracing::info!(tick, end_tick = self.settings.end_tick, "Reached end of capture range");
                self.stop_capture();
                return Ok(FrameOutcome::RangeEnded);
            }
        }

        match self.write_current_frame(prepared) {
            Ok(()) => Ok(FrameOutcome::Captured),
            Err(e) => {
                tracing::error!(
                    frame = self.captured_frame_count,
                    error = %e,
                    "Capture aborted"
                );
                self.stop_capture();
                Err(e)
            }
        }
    }

    /// Milliseconds the host should advance the timeline before the next
    /// render.
    pub fn on_game_frame(&self) -> i32 {
        let pass_count = if self.settings.is_multi_pass() {
            self.settings.pass_count()
        } else {
            0
        };
        multipass::hold_millis(
            self.captured_frame_count,
            pass_count,
            self.settings.frame_interval_ms(),
        )
    }

    /// Mutate the settings. Refused while capturing.
    pub fn configure(&mut self, update: impl FnOnce(&mut CaptureSettings)) -> DemorecResult<()> {
        if self.is_capturing() {
            return Err(DemorecError::validation(
                "Capture settings cannot change while capturing",
            ));
        }
        update(&mut self.settings);
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == SessionState::Capturing
    }

    pub fn captured_frame_count(&self) -> u64 {
        self.captured_frame_count
    }

    /// Set when the last start attempt found no encoder executable.
    pub fn ffmpeg_not_found(&self) -> bool {
        self.ffmpeg_not_found
    }

    pub fn supported_resolutions(&self) -> &[Resolution] {
        self.catalog.entries()
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn output_directory(&self) -> PathBuf {
        self.host.preferences.capture_output_directory()
    }

    // Internal helpers

    fn back_buffer_desc(&mut self) -> DemorecResult<SurfaceDesc> {
        let back_buffer = self.device.back_buffer()?;
        self.device.describe(&back_buffer)
    }

    fn current_pass_index(&self) -> Option<usize> {
        if !self.settings.is_multi_pass() {
            return None;
        }
        multipass::pass_index(self.captured_frame_count, self.settings.pass_count())
    }

    fn open_capture(&mut self) -> DemorecResult<()> {
        let output_dir = self.host.preferences.capture_output_directory();
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            DemorecError::config(format!(
                "Failed to create output directory {}: {e}",
                output_dir.display()
            ))
        })?;

        self.host.playback.seek_to_tick(self.settings.start_tick);
        self.captured_frame_count = 0;

        tracing::info!(
            resolution = %self.settings.resolution,
            fps = self.settings.framerate,
            start_tick = self.settings.start_tick,
            end_tick = self.settings.end_tick,
            "Starting capture"
        );

        if !self.settings.output_format.uses_encoder() {
            self.outputs.camera = Some(CameraDataWriter::create(
                &output_dir,
                &self.settings,
                chrono::Utc::now(),
            )?);
            return Ok(());
        }

        let desc = self.back_buffer_desc()?;
        self.native = desc.resolution();
        if !self.native.is_valid() {
            return Err(DemorecError::gpu(format!(
                "Back buffer has no area ({})",
                self.native
            )));
        }
        let with_depth =
            self.settings.is_multi_pass() && self.settings.passes.iter().any(|pass| pass.depth);
        self.gpu.allocate(&mut self.device, desc, with_depth)?;

        if !encoder_exists(&self.encoder.executable) {
            self.ffmpeg_not_found = true;
            return Err(DemorecError::EncoderNotFound {
                path: self.encoder.executable.clone(),
            });
        }
        self.ffmpeg_not_found = false;

        let builder = CommandBuilder::new(&self.encoder.executable, &output_dir, self.native);
        if self.settings.is_multi_pass() {
            for pass_index in 0..self.settings.pass_count() {
                let command = builder.build(&self.settings, pass_index)?;
                tracing::debug!(pass = pass_index, command = %command, "Opening encoder pipe");
                let pipe = self.encoder.launcher.open(&command)?;
                self.outputs.passes.push(pipe);
            }
        } else {
            let command = builder.build(&self.settings, 0)?;
            tracing::debug!(command = %command, "Opening encoder pipe");
            self.outputs.anchor = Some(self.encoder.launcher.open(&command)?);
        }
        Ok(())
    }

    fn write_current_frame(&mut self, prepared: bool) -> DemorecResult<()> {
        if let Some(camera) = self.outputs.camera.as_mut() {
            let record = CameraRecord {
                frame: self.captured_frame_count,
                tick: self.host.playback.current_tick(),
                pose: self.host.renderer.camera_pose(),
            };
            camera.write_record(&record)?;
            self.captured_frame_count += 1;
            return Ok(());
        }

        let (pipe, depth) = match self.current_pass_index() {
            Some(index) => {
                if !prepared {
                    tracing::warn!(
                        pass = index,
                        "Capturing a pass that was not prepared; frame may show the wrong elements"
                    );
                }
                self.host.renderer.draw_pass(index);
                let pipe = self
                    .outputs
                    .passes
                    .get_mut(index)
                    .ok_or_else(|| DemorecError::pipe(format!("No pipe open for pass {index}")))?;
                (pipe, self.settings.passes[index].depth)
            }
            None => {
                let pipe = self
                    .outputs
                    .anchor
                    .as_mut()
                    .ok_or_else(|| DemorecError::pipe("No encoder pipe open"))?;
                (pipe, false)
            }
        };

        read_back(
            &mut self.device,
            &mut self.gpu,
            self.native,
            depth,
            &mut **pipe,
            &mut self.captured_frame_count,
        )
    }
}

impl<D: GraphicsDevice> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        self.stop_capture();
    }
}
