//! Encoder command construction.

use std::fmt;
use std::path::{Path, PathBuf};

use demorec_capture_model::{CaptureSettings, OutputFormat, Resolution, VideoCodec, DEFAULT_VIDEO_CODEC};
use demorec_common::error::{DemorecError, DemorecResult};

/// ProRes encoder parameters for one codec variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecProfile {
    pub codec: VideoCodec,
    /// Value passed to `-profile:v`.
    pub profile: u8,
    /// Output pixel format.
    pub pixel_format: &'static str,
}

/// Profile used when the requested codec has no entry.
pub const DEFAULT_CODEC_PROFILE: CodecProfile = CodecProfile {
    codec: DEFAULT_VIDEO_CODEC,
    profile: 4,
    pixel_format: "yuv444p10le",
};

const CODEC_PROFILES: &[CodecProfile] = &[
    CodecProfile {
        codec: VideoCodec::Prores4444XQ,
        profile: 5,
        pixel_format: "yuv444p10le",
    },
    DEFAULT_CODEC_PROFILE,
    CodecProfile {
        codec: VideoCodec::Prores422HQ,
        profile: 3,
        pixel_format: "yuv422p10le",
    },
    CodecProfile {
        codec: VideoCodec::Prores422,
        profile: 2,
        pixel_format: "yuv422p10le",
    },
    CodecProfile {
        codec: VideoCodec::Prores422LT,
        profile: 1,
        pixel_format: "yuv422p10le",
    },
];

fn lookup_profile(codec: VideoCodec) -> Option<&'static CodecProfile> {
    CODEC_PROFILES.iter().find(|p| p.codec == codec)
}

/// Profile for `codec`, falling back to [`DEFAULT_VIDEO_CODEC`] with a
/// warning when the codec is missing or has no table entry.
pub fn codec_profile(codec: Option<VideoCodec>) -> &'static CodecProfile {
    if let Some(profile) = codec.and_then(lookup_profile) {
        return profile;
    }
    tracing::warn!(
        requested = ?codec,
        fallback = DEFAULT_VIDEO_CODEC.label(),
        "Unsupported video codec. Choosing default"
    );
    &DEFAULT_CODEC_PROFILE
}

/// Return `dir/{stem}.{ext}`, or the first `dir/{stem}({n}).{ext}` (n = 1, 2,
/// ...) that does not exist yet.
pub fn unique_output_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{stem}.{extension}"));
    let mut n = 0u32;
    while candidate.exists() {
        n += 1;
        candidate = dir.join(format!("{stem}({n}).{extension}"));
    }
    candidate
}

/// Non-colliding `.mov` destination for a pass.
pub fn video_output_path(dir: &Path, pass_index: usize) -> PathBuf {
    unique_output_path(dir, &format!("Pass {pass_index}"), "mov")
}

/// Numbered TGA template for a pass (`output_{pass}_%06d.tga`).
pub fn image_sequence_template(dir: &Path, pass_index: usize) -> PathBuf {
    dir.join(format!("output_{pass_index}_%06d.tga"))
}

/// A fully resolved encoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    /// Encoder executable.
    pub program: PathBuf,

    /// Arguments, in order, excluding the program.
    pub args: Vec<String>,

    /// Destination file or sequence template.
    pub output: PathBuf,

    /// Pass this command encodes (0 for single-stream captures).
    pub pass_index: usize,
}

impl EncoderCommand {
    /// Printable command line, quoting arguments that contain spaces.
    pub fn command_line(&self) -> String {
        let mut line = quote(&self.program.to_string_lossy());
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(arg));
        }
        line
    }
}

impl fmt::Display for EncoderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

fn quote(arg: &str) -> String {
    if arg.contains(' ') || arg.is_empty() {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}

/// Builds encoder invocations for the passes of one capture.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    encoder: PathBuf,
    output_dir: PathBuf,
    native: Resolution,
}

impl CommandBuilder {
    /// `native` is the size of the raw frames written to the pipe.
    pub fn new(encoder: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, native: Resolution) -> Self {
        Self {
            encoder: encoder.into(),
            output_dir: output_dir.into(),
            native,
        }
    }

    /// Build the command for `pass_index`.
    ///
    /// Video destinations are checked against the disk at call time, so the
    /// command should be spawned before the next one is built.
    pub fn build(&self, settings: &CaptureSettings, pass_index: usize) -> DemorecResult<EncoderCommand> {
        let mut args = self.raw_input_args(settings.framerate);

        let output = match settings.output_format {
            OutputFormat::ImageSequence => {
                args.extend(["-q:v".to_string(), "0".to_string()]);
                image_sequence_template(&self.output_dir, pass_index)
            }
            OutputFormat::Video => {
                let profile = codec_profile(settings.video_codec);
                args.extend([
                    "-c:v".to_string(),
                    "prores".to_string(),
                    "-profile:v".to_string(),
                    profile.profile.to_string(),
                    "-q:v".to_string(),
                    "1".to_string(),
                    "-pix_fmt".to_string(),
                    profile.pixel_format.to_string(),
                ]);
                video_output_path(&self.output_dir, pass_index)
            }
            OutputFormat::CameraData => {
                return Err(DemorecError::unsupported(
                    "Camera data is not encoded by an external process",
                ));
            }
        };

        args.extend([
            "-vf".to_string(),
            format!(
                "scale={}:{}",
                settings.resolution.width, settings.resolution.height
            ),
            "-y".to_string(),
            output.to_string_lossy().into_owned(),
        ]);

        Ok(EncoderCommand {
            program: self.encoder.clone(),
            args,
            output,
            pass_index,
        })
    }

    fn raw_input_args(&self, framerate: i32) -> Vec<String> {
        vec![
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "bgra".to_string(),
            "-s".to_string(),
            self.native.to_string(),
            "-r".to_string(),
            framerate.to_string(),
            "-i".to_string(),
            "-".to_string(),
        ]
    }
}
