//! Show or edit the persisted configuration.

use std::path::PathBuf;

use demorec_common::config::{config_file_path, AppConfig};

pub fn show() -> anyhow::Result<()> {
    let config = AppConfig::load();
    println!("# {}", config_file_path().display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub fn set_output_dir(path: PathBuf) -> anyhow::Result<()> {
    let mut config = AppConfig::load();
    config.capture.output_directory = path;
    config.save()?;
    println!(
        "Output directory set to {}",
        config.capture.output_directory.display()
    );
    Ok(())
}

pub fn set_ffmpeg(path: PathBuf) -> anyhow::Result<()> {
    if !path.is_file() {
        tracing::warn!(path = %path.display(), "Encoder path does not exist yet");
    }
    let mut config = AppConfig::load();
    config.capture.ffmpeg_path = Some(path.clone());
    config.save()?;
    println!("Encoder path set to {}", path.display());
    Ok(())
}
