//! Whole-directory passes run after every file has been written

pub mod dedup;
pub mod linker;
pub mod pruner;

pub use dedup::{DedupRename, dedup_identifiers, random_token};
pub use linker::link_references;
pub use pruner::{PruneReport, prune_orphans};

use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::blocks::resource_blocks;
use crate::model::is_widget_type;
use crate::traits::FileSystem;

/// One configuration file held in memory
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub name: String,
    pub content: String,
    original: String,
}

impl ConfigFile {
    pub fn new(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
            original: content.to_string(),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.content != self.original
    }
}

/// Every `*.tf` file of the output directory, sorted by name
#[derive(Debug)]
pub struct ConfigDirectory {
    dir: PathBuf,
    pub files: Vec<ConfigFile>,
}

impl ConfigDirectory {
    pub fn load(fs: &dyn FileSystem, dir: &Path) -> Result<Self> {
        let mut files = Vec::new();

        for path in fs.read_dir(dir)? {
            if !fs.is_file(&path) || path.extension().and_then(|e| e.to_str()) != Some("tf") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let content = fs.read_to_string(&path)?;
            files.push(ConfigFile::new(name, &content));
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    #[cfg(test)]
    pub fn from_files(files: &[(&str, &str)]) -> Self {
        let mut files: Vec<ConfigFile> = files
            .iter()
            .map(|(name, content)| ConfigFile::new(name, content))
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            dir: PathBuf::from("/out"),
            files,
        }
    }

    /// Chart declarations across all files: identifier to resource type.
    /// The first declaration of an identifier wins.
    pub fn declared_widgets(&self) -> HashMap<String, String> {
        let mut declared = HashMap::new();
        for file in &self.files {
            for block in resource_blocks(&file.content) {
                if is_widget_type(&block.resource_type) {
                    declared.entry(block.name).or_insert(block.resource_type);
                }
            }
        }
        declared
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.content.as_str())
    }

    /// Write back modified files; returns how many were written
    pub fn save(&self, fs: &dyn FileSystem) -> Result<usize> {
        let mut written = 0;
        for file in self.files.iter().filter(|f| f.is_modified()) {
            fs.write(&self.dir.join(&file.name), &file.content)?;
            written += 1;
        }
        Ok(written)
    }
}
