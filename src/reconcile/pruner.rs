use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use super::ConfigDirectory;
use crate::blocks::{find_closing, line_end, line_start, remove_ranges, resource_blocks};
use crate::model::{DASHBOARD_TYPE, is_widget_type};
use crate::naming::normalize;

lazy_static! {
    static ref CHART_SUB_BLOCK: Regex =
        Regex::new(r"(?m)^[ \t]*chart[ \t]*\{").expect("Invalid chart block regex");
    static ref CHART_ID_VALUE: Regex = Regex::new(
        r#"(?m)^[ \t]*chart_id[ \t]*=[ \t]*(?:"([^"]*)"|([\w-]+)\.([\w-]+)\.id)"#
    )
    .expect("Invalid chart_id value regex");
}

/// What the pruner removed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PruneReport {
    /// `chart { }` entries pointing at charts that were never declared
    pub dangling_references: usize,
    /// Chart resources no dashboard refers to
    pub unreferenced_widgets: Vec<String>,
}

/// Drop dashboard chart entries whose chart is not declared anywhere, then
/// drop chart resources that no dashboard refers to.
pub fn prune_orphans(dir: &mut ConfigDirectory) -> PruneReport {
    let declared = dir.declared_widgets();
    let mut report = PruneReport::default();
    let mut referenced: HashSet<String> = HashSet::new();

    for file in &mut dir.files {
        let mut ranges = Vec::new();

        for block in resource_blocks(&file.content) {
            if block.resource_type != DASHBOARD_TYPE {
                continue;
            }
            let body = &file.content[block.body_start..block.body_end];

            for m in CHART_SUB_BLOCK.find_iter(body) {
                let open = block.body_start + m.end() - 1;
                let Some(close) = find_closing(&file.content, open) else {
                    continue;
                };
                let Some(identifier) = referenced_identifier(&file.content[open..close]) else {
                    continue;
                };

                if declared.contains_key(&identifier) {
                    referenced.insert(identifier);
                } else {
                    let start = line_start(&file.content, block.body_start + m.start());
                    ranges.push((start, line_end(&file.content, close - 1)));
                    report.dangling_references += 1;
                }
            }
        }

        if !ranges.is_empty() {
            file.content = remove_ranges(&file.content, ranges);
        }
    }

    for file in &mut dir.files {
        let mut ranges = Vec::new();
        for block in resource_blocks(&file.content) {
            if is_widget_type(&block.resource_type) && !referenced.contains(&block.name) {
                ranges.push((block.start, block.end));
                report.unreferenced_widgets.push(block.name);
            }
        }

        if !ranges.is_empty() {
            file.content = remove_ranges(&file.content, ranges);
        }
    }

    report
}

/// Identifier of the chart a `chart { }` entry points at, whether still a
/// literal id or already linked
fn referenced_identifier(entry: &str) -> Option<String> {
    let caps = CHART_ID_VALUE.captures(entry)?;
    match (caps.get(1), caps.get(3)) {
        (Some(literal), _) => Some(normalize(literal.as_str())),
        (None, Some(identifier)) => Some(identifier.as_str().to_string()),
        _ => None,
    }
}
