//! List supported output resolutions.

use demorec_capture_model::{Resolution, ResolutionCatalog};

pub fn run(width: i32, height: i32) -> anyhow::Result<()> {
    let native = Resolution::new(width, height);
    if !native.is_valid() {
        anyhow::bail!("Native resolution must be positive (got {native})");
    }

    let catalog = ResolutionCatalog::from_native(native);
    println!("Supported resolutions for {native}:");
    for (i, resolution) in catalog.entries().iter().enumerate() {
        println!("  [{i}] {resolution}");
    }
    Ok(())
}
