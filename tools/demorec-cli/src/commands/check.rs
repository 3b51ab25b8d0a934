//! Check the encoder and configuration.

use std::process::Command;

use demorec_common::config::{config_file_path, AppConfig};
use demorec_encoder::{encoder_exists, resolve_encoder_path};

pub fn run() -> anyhow::Result<()> {
    println!("demorec System Check");
    println!("{}", "=".repeat(50));

    let config = AppConfig::load();
    println!("Config file: {}", config_file_path().display());

    let output_dir = &config.capture.output_directory;
    if output_dir.as_os_str().is_empty() {
        println!("[OK] Output directory: not set (captures use the default)");
    } else {
        println!("[OK] Output directory: {}", output_dir.display());
    }

    let encoder = resolve_encoder_path(config.capture.ffmpeg_path.as_deref());
    if !encoder_exists(&encoder) {
        println!("[MISSING] Encoder: {}", encoder.display());
        println!();
        println!("Install ffmpeg or run `demorec config set-ffmpeg <PATH>`.");
        return Ok(());
    }

    match Command::new(&encoder).arg("-version").output() {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let version = stdout.lines().next().unwrap_or("unknown version");
            println!("[OK] Encoder: {} ({version})", encoder.display());
        }
        Ok(output) => {
            println!(
                "[WARN] Encoder at {} exited with {}",
                encoder.display(),
                output.status
            );
        }
        Err(e) => {
            println!("[WARN] Encoder at {} could not run: {e}", encoder.display());
        }
    }

    println!();
    println!("demorec is ready to capture.");
    Ok(())
}
