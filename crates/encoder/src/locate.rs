//! Locating the ffmpeg executable.

use std::path::{Path, PathBuf};

/// Platform file name of the ffmpeg executable.
pub fn ffmpeg_binary_name() -> &'static str {
    if cfg!(windows) {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    }
}

/// Resolve the encoder path: the configured path when set, else the first
/// match on `PATH`, else the bare binary name (which will fail the
/// existence check at capture start).
pub fn resolve_encoder_path(configured: Option<&Path>) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }
    find_on_path(ffmpeg_binary_name()).unwrap_or_else(|| PathBuf::from(ffmpeg_binary_name()))
}

/// Search the directories of `PATH` for `binary`.
pub fn find_on_path(binary: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

/// Whether the encoder executable is present at `path`.
pub fn encoder_exists(path: &Path) -> bool {
    path.is_file()
}
