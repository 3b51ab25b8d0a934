//! Print encoder command lines without spawning anything.

use std::path::PathBuf;

use demorec_capture_model::{CaptureSettings, OutputFormat, Resolution};
use demorec_common::config::{default_output_directory, AppConfig};
use demorec_encoder::{resolve_encoder_path, CommandBuilder};

pub fn run(
    settings_path: Option<PathBuf>,
    width: i32,
    height: i32,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let native = Resolution::new(width, height);
    let settings = match settings_path {
        Some(path) => CaptureSettings::load(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load settings {}: {e}", path.display()))?,
        None => CaptureSettings::with_native(native),
    };

    if settings.output_format == OutputFormat::CameraData {
        println!("Camera data is written directly; no encoder is started.");
        return Ok(());
    }

    let config = AppConfig::load();
    let output_dir = output.unwrap_or_else(|| {
        if config.capture.output_directory.as_os_str().is_empty() {
            default_output_directory()
        } else {
            config.capture.output_directory.clone()
        }
    });
    let encoder = resolve_encoder_path(config.capture.ffmpeg_path.as_deref());
    let builder = CommandBuilder::new(encoder, output_dir, native);

    let passes = if settings.is_multi_pass() {
        settings.pass_count()
    } else {
        1
    };
    println!(
        "{} at {} ({} fps), {} stream(s):",
        settings.output_format.label(),
        settings.resolution,
        settings.framerate,
        passes
    );
    for pass_index in 0..passes {
        let command = builder.build(&settings, pass_index)?;
        println!();
        println!("[pass {pass_index}] {}", command.output.display());
        println!("  {command}");
    }
    Ok(())
}
