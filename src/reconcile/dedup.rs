use std::collections::BTreeMap;

use super::ConfigDirectory;
use crate::blocks::{replace_identifier, resource_blocks};
use crate::model::is_widget_type;

/// One identifier rewritten in one file
#[derive(Debug, Clone, PartialEq)]
pub struct DedupRename {
    pub file: String,
    pub from: String,
    pub to: String,
}

/// First 8 characters of a random UUID
pub fn random_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Give chart identifiers declared in several files a unique name in every
/// file but the first (by file name). The rename covers the declaration,
/// its markers and every reference inside that file.
pub fn dedup_identifiers(
    dir: &mut ConfigDirectory,
    token: &mut dyn FnMut() -> String,
) -> Vec<DedupRename> {
    let mut declared_in: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, file) in dir.files.iter().enumerate() {
        for block in resource_blocks(&file.content) {
            if !is_widget_type(&block.resource_type) {
                continue;
            }
            let files = declared_in.entry(block.name).or_default();
            if files.last() != Some(&index) {
                files.push(index);
            }
        }
    }

    let mut renames = Vec::new();
    for (identifier, files) in declared_in {
        for index in files.into_iter().skip(1) {
            let file = &mut dir.files[index];
            let new_identifier = format!("{}-{}", identifier, token());
            let (content, _) = replace_identifier(&file.content, &identifier, &new_identifier);
            file.content = content;
            renames.push(DedupRename {
                file: file.name.clone(),
                from: identifier.clone(),
                to: new_identifier,
            });
        }
    }

    renames
}
