//! State backend integration (terraform / tofu)

pub mod engine;
pub mod sanitize;
pub mod session;

pub use engine::StateImportEngine;
pub use session::ImportSession;

use std::path::Path;

use crate::traits::FileSystem;

/// Files the backend leaves behind in the working directory
const STATE_FILES: &[&str] = &[
    ".terraform.lock.hcl",
    "terraform.tfstate",
    "terraform.tfstate.backup",
];

/// Remove backend working files from `dir`. Best effort: returns the paths
/// that could not be removed.
pub fn cleanup_working_state(fs: &dyn FileSystem, dir: &Path) -> Vec<String> {
    let mut failed = Vec::new();

    let plugin_dir = dir.join(".terraform");
    if fs.is_dir(&plugin_dir) && fs.remove_dir_all(&plugin_dir).is_err() {
        failed.push(plugin_dir.display().to_string());
    }

    for name in STATE_FILES {
        let path = dir.join(name);
        if fs.exists(&path) && fs.remove_file(&path).is_err() {
            failed.push(path.display().to_string());
        }
    }

    failed
}
