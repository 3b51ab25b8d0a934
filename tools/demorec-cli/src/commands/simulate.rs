//! Run a capture session against the synthetic host.

use std::path::PathBuf;
use std::time::Instant;

use demorec_capture_engine::{CaptureSession, EncoderSetup, FrameOutcome, HostEvent, HostServices};
use demorec_capture_model::{CapturePass, ElementId, OutputFormat, VideoCodec};
use demorec_common::config::AppConfig;
use demorec_encoder::{resolve_encoder_path, FfmpegLauncher};

use crate::synthetic::{
    SharedScene, Subscriptions, SyntheticDevice, SyntheticRenderer, SyntheticTimeline,
};

pub struct SimulateOptions {
    pub start_tick: Option<i32>,
    pub end_tick: Option<i32>,
    pub timeline_ticks: i32,
    pub fps: i32,
    pub format: OutputFormat,
    pub codec: VideoCodec,
    pub passes: usize,
    pub depth: bool,
    pub width: u32,
    pub height: u32,
    pub resolution_index: usize,
    pub output: Option<PathBuf>,
}

pub fn run(options: SimulateOptions) -> anyhow::Result<()> {
    let mut preferences = AppConfig::load();
    if let Some(output) = options.output {
        preferences.capture.output_directory = output;
    }
    let executable = resolve_encoder_path(preferences.capture.ffmpeg_path.as_deref());

    let scene = SharedScene::default();
    let host = HostServices {
        renderer: Box::new(SyntheticRenderer::new(scene.clone())),
        playback: Box::new(SyntheticTimeline::new(scene.clone())),
        rewind: Box::new(SyntheticTimeline::new(scene.clone())),
        preferences: Box::new(preferences),
    };
    let encoder = EncoderSetup {
        executable,
        launcher: Box::new(FfmpegLauncher::new()),
    };
    let device = SyntheticDevice::new(scene.clone(), options.width, options.height);

    let mut session = CaptureSession::new(device, host, encoder);
    let mut subscriptions = Subscriptions::default();
    session.initialize(&mut subscriptions)?;

    let bounds = HostEvent::BoundsDetermined {
        end_tick: options.timeline_ticks,
    };
    if subscriptions.wants(bounds.kind()) {
        session.handle_event(bounds);
    }

    let resolution = session
        .supported_resolutions()
        .get(options.resolution_index)
        .copied()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Resolution index {} is out of range (0..{})",
                options.resolution_index,
                session.supported_resolutions().len()
            )
        })?;

    session.configure(|s| {
        if let Some(start) = options.start_tick {
            s.start_tick = start;
        }
        if let Some(end) = options.end_tick {
            s.end_tick = end;
        }
        s.framerate = options.fps;
        s.output_format = options.format;
        s.video_codec = Some(options.codec);
        s.resolution = resolution;
        s.passes = (0..options.passes)
            .map(|i| {
                let depth = options.depth && i + 1 == options.passes;
                CapturePass::new([ElementId(i as u32 + 1)]).with_depth(depth)
            })
            .collect();
    })?;

    let settings = session.settings().clone();
    println!(
        "Capturing ticks {}..={} as {} at {} ({} fps)",
        settings.start_tick,
        settings.end_tick,
        settings.output_format.label(),
        settings.resolution,
        settings.framerate
    );
    println!("  Output: {}", session.output_directory().display());

    if let Err(e) = session.start_capture() {
        if session.ffmpeg_not_found() {
            anyhow::bail!(
                "ffmpeg was not found ({e}). Install it or run `demorec config set-ffmpeg <PATH>`"
            );
        }
        return Err(e.into());
    }

    let started = Instant::now();
    loop {
        if session.on_game_frame() > 0 {
            scene.borrow_mut().tick += 1;
        }
        session.prepare_frame();
        match session.capture_frame()? {
            FrameOutcome::Captured => {}
            FrameOutcome::RangeEnded | FrameOutcome::NotCapturing => break,
        }
    }

    let frames = session.captured_frame_count();
    let elapsed = started.elapsed().as_secs_f64();
    println!();
    println!(
        "Captured {frames} frames in {elapsed:.2}s ({:.1} frames/s)",
        frames as f64 / elapsed.max(f64::EPSILON)
    );
    Ok(())
}
