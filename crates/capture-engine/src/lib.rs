//! Demorec Capture Engine
//!
//! Frame-accurate capture of a host render loop. The engine reads back the
//! rendered back buffer once per sampled callback and streams the raw pixels
//! to one encoder pipe per capture pass.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                  CaptureSession                     │
//! │  ┌──────────────┐ ┌──────────────┐ ┌─────────────┐ │
//! │  │ Multi-Pass   │ │ Frame        │ │ GPU         │ │
//! │  │ Orchestrator │ │ Capturer     │ │ Resources   │ │
//! │  └──────┬───────┘ └──────┬───────┘ └──────┬──────┘ │
//! │         │ visible set    │ BGRA bytes     │        │
//! │         ▼                ▼                ▼        │
//! │  ┌────────────────────────────────────────────────┐ │
//! │  │   Encoder pipes (one per pass) / Camera.jsonl  │ │
//! │  └────────────────────────────────────────────────┘ │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs synchronously on the thread driving the render callback.
//! The host supplies its graphics device, renderer, timeline, and
//! preferences through the traits in [`host`] and [`gpu`].

pub mod camera;
pub mod capturer;
pub mod gpu;
pub mod host;
pub mod multipass;
pub mod session;

pub use gpu::{GraphicsDevice, LockedSurface, SurfaceDesc};
pub use host::*;
pub use session::*;
