//! Render resolutions and the downsample catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of entries in the [`ResolutionCatalog`].
pub const SUPPORTED_RESOLUTION_COUNT: usize = 4;

/// Pixel dimensions of a render surface or an encoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: i32,
    pub height: i32,
}

impl Resolution {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Size in bytes of one 4-channel, 8-bit frame at this resolution.
    pub fn frame_byte_size(&self) -> usize {
        self.width.max(0) as usize * self.height.max(0) as usize * 4
    }

    /// Whether both dimensions are positive.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Supported downsample resolutions derived from the native render size.
///
/// Slot `i` is the native size divided by `i + 1` (integer division). The
/// catalog is computed once after the graphics device is ready and is
/// read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolutionCatalog {
    entries: [Resolution; SUPPORTED_RESOLUTION_COUNT],
}

impl ResolutionCatalog {
    pub fn from_native(native: Resolution) -> Self {
        let mut entries = [Resolution::default(); SUPPORTED_RESOLUTION_COUNT];
        for (i, entry) in entries.iter_mut().enumerate() {
            let divisor = i as i32 + 1;
            *entry = Resolution::new(native.width / divisor, native.height / divisor);
        }
        Self { entries }
    }

    pub fn get(&self, index: usize) -> Option<Resolution> {
        self.entries.get(index).copied()
    }

    pub fn entries(&self) -> &[Resolution] {
        &self.entries
    }
}
