//! Operation: check the project's manifests without fetching anything.

use std::path::Path;

use carton_core::cartfile::{Cartfile, CARTFILE, PRIVATE_CARTFILE};
use carton_util::progress;

/// Parse `Cartfile` (and `Cartfile.private`, if present) and report any
/// project declared more than once, within or across the two files.
///
/// Returns the combined manifest that resolution would start from.
pub fn validate(project_root: &Path) -> miette::Result<Cartfile> {
    let root = crate::load_root_manifest(project_root)?;

    let files = if project_root.join(PRIVATE_CARTFILE).is_file() {
        format!("{CARTFILE} and {PRIVATE_CARTFILE}")
    } else {
        CARTFILE.to_string()
    };
    progress::status(
        "Validated",
        &format!("{} dependencies in {files}", root.len()),
    );

    Ok(root)
}
