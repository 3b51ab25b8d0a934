//! Demorec Encoder
//!
//! Everything between a captured frame and the external encoder process:
//!
//! ```text
//! CaptureSettings ──► CommandBuilder ──► EncoderCommand (argv + output path)
//!                                              │
//!                                              ▼
//!                          PipeLauncher ──► FramePipe (write-only stdin)
//!                                              │
//!                               raw BGRA frames│
//!                                              ▼
//!                                     ffmpeg ──► Pass 0.mov / output_0_%06d.tga
//! ```
//!
//! Encoding itself is delegated entirely to ffmpeg; this crate only builds
//! its command line and owns the byte pipe feeding it.

pub mod command;
pub mod locate;
pub mod pipe;

pub use command::*;
pub use locate::*;
pub use pipe::*;
