//! Demorec Capture Model
//!
//! Defines the data contracts shared by the encoder and the capture engine:
//! - **Resolution:** native and downsampled output dimensions
//! - **Resolution Catalog:** the fixed list of supported downsample sizes
//! - **Capture Settings:** output format, codec, framerate, tick range, and
//!   the ordered list of capture passes
//!
//! Settings are plain serde values; the GPU handles and encoder pipes that a
//! running capture needs are owned by the session, never by these types.

pub mod resolution;
pub mod settings;

pub use resolution::*;
pub use settings::*;
