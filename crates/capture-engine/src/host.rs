//! Interfaces to the host application's collaborators.

use std::collections::BTreeSet;
use std::path::PathBuf;

use demorec_capture_model::{ElementId, Tick};
use demorec_common::config::AppConfig;
use demorec_common::error::DemorecResult;
use demorec_encoder::PipeLauncher;
use serde::Serialize;

/// Camera state at the time of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CameraPose {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub fov: f32,
}

/// Render-side operations the session drives.
pub trait Renderer {
    /// Disable parallel simulation/render threading.
    fn force_single_threaded(&mut self) -> DemorecResult<()>;

    /// Show only `elements` in subsequent renders.
    fn set_visible_elements(&mut self, elements: &BTreeSet<ElementId>);

    /// Restore the default element visibility.
    fn reset_visible_elements(&mut self);

    /// Render pass `pass_index` into the back buffer.
    fn draw_pass(&mut self, pass_index: usize);

    fn camera_pose(&self) -> CameraPose;
}

/// The playback timeline.
pub trait Playback {
    fn current_tick(&self) -> Tick;
    fn seek_to_tick(&mut self, tick: Tick);
}

/// Rewind detection.
pub trait RewindState {
    fn is_rewinding(&self) -> bool;
}

/// Persisted user preferences.
pub trait Preferences {
    fn capture_output_directory(&self) -> PathBuf;
    fn set_capture_output_directory(&mut self, dir: PathBuf);
}

impl Preferences for AppConfig {
    fn capture_output_directory(&self) -> PathBuf {
        self.capture.output_directory.clone()
    }

    fn set_capture_output_directory(&mut self, dir: PathBuf) {
        self.capture.output_directory = dir;
    }
}

/// Host notifications the session can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    BoundsDetermined,
    RenderFrame,
}

/// A notification delivered through [`crate::CaptureSession::handle_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The timeline length is known.
    BoundsDetermined { end_tick: Tick },
    /// A frame is about to be rendered.
    RenderFrame,
}

impl HostEvent {
    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::BoundsDetermined { .. } => HostEventKind::BoundsDetermined,
            HostEvent::RenderFrame => HostEventKind::RenderFrame,
        }
    }
}

/// Where the session registers its event interest.
///
/// The host keeps the registrations and calls
/// [`crate::CaptureSession::handle_event`] synchronously when one fires.
pub trait EventRegistry {
    fn register_listener(&mut self, kind: HostEventKind);
}

/// Host collaborators other than the graphics device.
pub struct HostServices {
    pub renderer: Box<dyn Renderer>,
    pub playback: Box<dyn Playback>,
    pub rewind: Box<dyn RewindState>,
    pub preferences: Box<dyn Preferences>,
}

/// The encoder executable and the launcher that spawns it.
pub struct EncoderSetup {
    pub executable: PathBuf,
    pub launcher: Box<dyn PipeLauncher>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_preferences() {
        let mut config = AppConfig::default();
        config.set_capture_output_directory(PathBuf::from("/captures"));
        assert_eq!(config.capture_output_directory(), PathBuf::from("/captures"));
        assert_eq!(config.capture.output_directory, PathBuf::from("/captures"));
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(
            HostEvent::BoundsDetermined { end_tick: 10 }.kind(),
            HostEventKind::BoundsDetermined
        );
        assert_eq!(HostEvent::RenderFrame.kind(), HostEventKind::RenderFrame);
    }
}
