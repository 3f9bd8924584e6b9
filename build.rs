use std::env;
use std::path::PathBuf;

use anyhow::Result;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;

/// Copies the mesh and texture files in `assets/` next to the build output
/// so the runtime lookup relative to the binary finds them.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets/*");

    let out_dir = env::var("OUT_DIR")?;
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    if manifest_dir.join("assets").exists() {
        let mut copy_options = CopyOptions::new();
        copy_options.overwrite = true;
        copy_items(&["assets/"], out_dir, &copy_options)?;
    }

    Ok(())
}
