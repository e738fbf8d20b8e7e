use std::collections::{HashMap, HashSet};

use crate::model::{NodeId, ResourceGraph};
use crate::naming::normalize;

/// Rename children of `parent` whose identifiers repeat an earlier sibling's.
///
/// The first occurrence keeps its name; the n-th repeat gets `n - 1` appended
/// to its display name (`A`, `A`, `A` becomes `A`, `A1`, `A2`). A suffix that
/// would produce an identifier already in use is skipped. Returns the renamed
/// nodes in sibling order; their identifiers are recomputed, everything else
/// is left for the caller to redo.
pub fn resolve_sibling_collisions(graph: &mut ResourceGraph, parent: NodeId) -> Vec<NodeId> {
    let children = graph.get(parent).children.clone();

    let mut used: HashSet<String> = children
        .iter()
        .map(|id| graph.get(*id).identifier.clone())
        .collect();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut renamed = Vec::new();

    for child in children {
        let identifier = graph.get(child).identifier.clone();
        let count = seen.entry(identifier).or_insert(0);
        if *count == 0 {
            *count = 1;
            continue;
        }

        let base = graph.get(child).display_name.clone();
        let (display_name, new_identifier) = loop {
            let candidate = format!("{}{}", base, count);
            *count += 1;
            let candidate_identifier = normalize(&candidate);
            if !used.contains(&candidate_identifier) {
                break (candidate, candidate_identifier);
            }
        };

        used.insert(new_identifier.clone());
        let node = graph.get_mut(child);
        node.display_name = display_name;
        node.identifier = new_identifier;
        renamed.push(child);
    }

    renamed
}
