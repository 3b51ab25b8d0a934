//! Capture settings and pass definitions.

use std::collections::BTreeSet;
use std::path::Path;

use demorec_common::error::{DemorecError, DemorecResult};
use serde::{Deserialize, Deserializer, Serialize};

use crate::resolution::Resolution;

/// Discrete simulation timeline unit.
pub type Tick = i32;

/// Default capture framerate.
pub const DEFAULT_FRAMERATE: i32 = 250;

/// Codec used when none (or an unrecognized one) is configured.
pub const DEFAULT_VIDEO_CODEC: VideoCodec = VideoCodec::Prores4444;

/// Identifier of an element the renderer can show or hide per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u32);

/// What a capture produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Video,
    CameraData,
    ImageSequence,
}

const OUTPUT_FORMAT_LABELS: &[(OutputFormat, &str)] = &[
    (OutputFormat::Video, "Video"),
    (OutputFormat::CameraData, "Camera Data"),
    (OutputFormat::ImageSequence, "Image Sequence"),
];

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [
        OutputFormat::Video,
        OutputFormat::CameraData,
        OutputFormat::ImageSequence,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        OUTPUT_FORMAT_LABELS
            .iter()
            .find(|(format, _)| *format == self)
            .map(|(_, label)| *label)
            .unwrap_or("Unknown Output Format")
    }

    /// Whether frames of this format are streamed to an external encoder.
    pub fn uses_encoder(self) -> bool {
        !matches!(self, OutputFormat::CameraData)
    }
}

/// ProRes variants supported for [`OutputFormat::Video`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoCodec {
    #[serde(rename = "prores_4444_xq")]
    Prores4444XQ,
    #[serde(rename = "prores_4444")]
    Prores4444,
    #[serde(rename = "prores_422_hq")]
    Prores422HQ,
    #[serde(rename = "prores_422")]
    Prores422,
    #[serde(rename = "prores_422_lt")]
    Prores422LT,
}

const VIDEO_CODEC_LABELS: &[(VideoCodec, &str)] = &[
    (VideoCodec::Prores4444XQ, "Prores 4444 XQ"),
    (VideoCodec::Prores4444, "Prores 4444"),
    (VideoCodec::Prores422HQ, "Prores 422 HQ"),
    (VideoCodec::Prores422, "Prores 422"),
    (VideoCodec::Prores422LT, "Prores 422 LT"),
];

impl VideoCodec {
    pub const ALL: [VideoCodec; 5] = [
        VideoCodec::Prores4444XQ,
        VideoCodec::Prores4444,
        VideoCodec::Prores422HQ,
        VideoCodec::Prores422,
        VideoCodec::Prores422LT,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        VIDEO_CODEC_LABELS
            .iter()
            .find(|(codec, _)| *codec == self)
            .map(|(_, label)| *label)
            .unwrap_or("Unknown Video Codec")
    }
}

/// One render + readback cycle per output frame, showing only `elements`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapturePass {
    /// Elements visible while this pass renders.
    #[serde(default)]
    pub elements: BTreeSet<ElementId>,

    /// Render the depth visualization before readback.
    #[serde(default)]
    pub depth: bool,
}

impl CapturePass {
    pub fn new(elements: impl IntoIterator<Item = ElementId>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
            depth: false,
        }
    }

    pub fn with_depth(mut self, depth: bool) -> Self {
        self.depth = depth;
        self
    }
}

/// Everything that describes one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    pub start_tick: Tick,
    pub end_tick: Tick,
    pub output_format: OutputFormat,

    /// `None` falls back to [`DEFAULT_VIDEO_CODEC`] with a warning.
    #[serde(default, deserialize_with = "deserialize_lenient_codec")]
    pub video_codec: Option<VideoCodec>,

    /// Output resolution (the encoder scales native frames to this size).
    pub resolution: Resolution,

    pub framerate: i32,

    /// Empty for single-stream capture.
    #[serde(default)]
    pub passes: Vec<CapturePass>,
}

impl CaptureSettings {
    /// Defaults for a renderer running at `native`.
    pub fn with_native(native: Resolution) -> Self {
        Self {
            start_tick: 0,
            end_tick: 0,
            output_format: OutputFormat::Video,
            video_codec: Some(DEFAULT_VIDEO_CODEC),
            resolution: native,
            framerate: DEFAULT_FRAMERATE,
            passes: Vec::new(),
        }
    }

    /// Check the guard that must hold before a session starts.
    pub fn validate_tick_range(&self) -> DemorecResult<()> {
        if self.start_tick >= self.end_tick {
            return Err(DemorecError::validation(format!(
                "Start tick must be less than end tick (start={}, end={})",
                self.start_tick, self.end_tick
            )));
        }
        Ok(())
    }

    /// Full validation: tick range, framerate, and output resolution.
    pub fn validate(&self) -> DemorecResult<()> {
        self.validate_tick_range()?;
        if self.framerate <= 0 {
            return Err(DemorecError::validation(format!(
                "Framerate must be positive (got {})",
                self.framerate
            )));
        }
        if !self.resolution.is_valid() {
            return Err(DemorecError::validation(format!(
                "Output resolution must be positive (got {})",
                self.resolution
            )));
        }
        Ok(())
    }

    /// Whether frames are interleaved across several passes.
    ///
    /// Camera data has a single record per tick, so passes are ignored there.
    pub fn is_multi_pass(&self) -> bool {
        !self.passes.is_empty() && self.output_format.uses_encoder()
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Milliseconds the timeline advances per output frame.
    pub fn frame_interval_ms(&self) -> i32 {
        1000 / self.framerate.max(1)
    }

    /// Seed an unset tick range to 10%..90% of the timeline length.
    ///
    /// Returns `true` when the range was changed.
    pub fn seed_tick_range(&mut self, timeline_end_tick: Tick) -> bool {
        if self.start_tick != 0 && self.end_tick != 0 {
            return false;
        }
        self.start_tick = (f64::from(timeline_end_tick) * 0.1) as Tick;
        self.end_tick = (f64::from(timeline_end_tick) * 0.9) as Tick;
        true
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> DemorecResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save settings as pretty JSON.
    pub fn save(&self, path: &Path) -> DemorecResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Accept any codec value; unrecognized names become `None` instead of
/// failing the whole settings load.
fn deserialize_lenient_codec<'de, D>(deserializer: D) -> Result<Option<VideoCodec>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    let Some(value) = raw else {
        return Ok(None);
    };
    match serde_json::from_value::<VideoCodec>(value.clone()) {
        Ok(codec) => Ok(Some(codec)),
        Err(_) => {
            tracing::warn!(codec = %value, "Unrecognized video codec in settings");
            Ok(None)
        }
    }
}
