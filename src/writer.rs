use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::blocks::marker;
use crate::model::{NodeId, ResourceGraph, ResourceKind, ResourceNode};
use crate::traits::FileSystem;
use crate::workspace::BOOTSTRAP_FILE;

const CONFIG_EXTENSION: &str = "tf";

/// Content destined for one configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    pub name: String,
    pub content: String,
}

/// Decides which file every node's text goes to and writes them
pub struct OutputWriter<'a> {
    fs: &'a dyn FileSystem,
    dir: PathBuf,
}

impl<'a> OutputWriter<'a> {
    pub fn new(fs: &'a dyn FileSystem, dir: &Path) -> Self {
        Self {
            fs,
            dir: dir.to_path_buf(),
        }
    }

    /// Lay out the graph's text. Groups get `<name>-Group.tf`, dashboards
    /// `<name>.tf` with their charts appended, everything else at the root
    /// `<name>.tf`. Nodes without text produce nothing and files without any
    /// block are not planned.
    ///
    /// `main.tf` is never planned, and two nodes never share a file unless one
    /// is a chart of the other: a clashing name gets a `-<n>` suffix.
    pub fn plan(graph: &ResourceGraph) -> Vec<PlannedFile> {
        let mut files: Vec<PlannedFile> = Vec::new();
        let mut owners: HashMap<NodeId, usize> = HashMap::new();

        for id in graph.walk() {
            let node = graph.get(id);
            let Some(text) = node.generated_text.as_deref() else {
                continue;
            };

            let owner = file_owner(graph, id);
            let block = render_block(node, text);
            match owners.get(&owner) {
                Some(&index) => {
                    let file = &mut files[index];
                    file.content.push('\n');
                    file.content.push_str(&block);
                }
                None => {
                    let name = unique_name(&files, &file_stem(graph.get(owner)));
                    owners.insert(owner, files.len());
                    files.push(PlannedFile {
                        name,
                        content: block,
                    });
                }
            }
        }

        files
    }

    /// Write every planned file, returning the written paths
    pub fn write(&self, graph: &ResourceGraph) -> Result<Vec<PathBuf>> {
        self.fs.create_dir_all(&self.dir)?;

        let mut written = Vec::new();
        for file in Self::plan(graph) {
            let path = self.dir.join(&file.name);
            self.fs.write(&path, &file.content)?;
            written.push(path);
        }

        Ok(written)
    }
}

/// Node whose file holds `id`'s block: charts go into their dashboard's file
fn file_owner(graph: &ResourceGraph, id: NodeId) -> NodeId {
    let node = graph.get(id);
    match (node.kind, node.parent) {
        (ResourceKind::Widget, Some(view)) => view,
        _ => id,
    }
}

fn file_stem(node: &ResourceNode) -> String {
    match node.kind {
        ResourceKind::Group => format!("{}-Group", node.identifier),
        _ => node.identifier.clone(),
    }
}

fn unique_name(files: &[PlannedFile], stem: &str) -> String {
    let taken = |name: &str| name == BOOTSTRAP_FILE || files.iter().any(|f| f.name == name);

    let mut name = format!("{}.{}", stem, CONFIG_EXTENSION);
    let mut count = 1;
    while taken(&name) {
        name = format!("{}-{}.{}", stem, count, CONFIG_EXTENSION);
        count += 1;
    }
    name
}

/// Surround a block with its marker line. State output usually starts with
/// the marker already; it is not repeated.
fn render_block(node: &ResourceNode, text: &str) -> String {
    let marker = marker(&node.backend_type, &node.identifier);
    let body = text.trim_matches('\n').trim_end();

    let mut block = String::new();
    if body.lines().next().map(str::trim) != Some(marker.as_str()) {
        block.push_str(&marker);
        block.push('\n');
    }
    block.push_str(body);
    block.push('\n');
    block.push_str(&marker);
    block.push('\n');
    block
}
