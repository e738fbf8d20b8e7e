use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use crate::backend::cleanup_working_state;
use crate::config::ExportConfig;
use crate::context::Context;

/// Provider and variable declarations every export relies on
pub const BOOTSTRAP_FILE: &str = "main.tf";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkspaceStatus {
    Ready,
    /// Leftover files were found and the user chose to keep them
    Declined,
}

/// Make `dir` ready for an export: create it, fetch `main.tf` when missing
/// and clear out configuration left over from an earlier run.
pub fn prepare(ctx: &Context, config: &ExportConfig, dir: &Path, assume_yes: bool) -> Result<WorkspaceStatus> {
    if !ctx.fs.exists(dir) {
        ctx.fs.create_dir_all(dir)?;
        ctx.output.dimmed(&format!("Created output directory {}", dir.display()));
    }

    let bootstrap = dir.join(BOOTSTRAP_FILE);
    if !ctx.fs.exists(&bootstrap) {
        download_bootstrap(ctx, &config.bootstrap_url, &bootstrap)?;
    }

    let leftovers = leftover_files(ctx, dir)?;
    if leftovers.is_empty() {
        return Ok(WorkspaceStatus::Ready);
    }

    if !assume_yes {
        ctx.output.warning(&format!(
            "{} Terraform file(s) other than {} found in {}",
            leftovers.len(),
            BOOTSTRAP_FILE,
            dir.display()
        ));
        let remove = ctx
            .input
            .confirm("Remove them before exporting?", false)
            .context("Failed to get confirmation")?;
        if !remove {
            return Ok(WorkspaceStatus::Declined);
        }
    }

    for path in &leftovers {
        ctx.fs.remove_file(path)?;
    }
    for path in cleanup_working_state(&*ctx.fs, dir) {
        ctx.output
            .warning(&format!("Could not remove backend file {}", path));
    }

    Ok(WorkspaceStatus::Ready)
}

fn download_bootstrap(ctx: &Context, url: &str, path: &Path) -> Result<()> {
    ctx.output.dimmed(&format!("Downloading {} from {}", BOOTSTRAP_FILE, url));

    let response = ctx.http.get(url, &[])?;
    if !response.is_success() {
        anyhow::bail!("Failed to download {}: HTTP {}", url, response.status);
    }

    ctx.fs
        .write(path, &response.body)
        .with_context(|| format!("Failed to write {:?}", path))
}

fn leftover_files(ctx: &Context, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = ctx
        .fs
        .read_dir(dir)?
        .into_iter()
        .filter(|p| ctx.fs.is_file(p))
        .filter(|p| p.extension().is_some_and(|e| e == "tf"))
        .filter(|p| p.file_name().is_some_and(|n| n != BOOTSTRAP_FILE))
        .collect();
    files.sort();
    Ok(files)
}
