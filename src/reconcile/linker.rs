use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::ConfigDirectory;
use crate::naming::normalize;

lazy_static! {
    static ref LITERAL_CHART_ID: Regex =
        Regex::new(r#"(?m)^([ \t]*chart_id[ \t]*=[ \t]*)"([^"]*)""#).expect("Invalid chart_id regex");
}

/// Rewrite literal `chart_id = "<id>"` assignments into symbolic references
/// to the chart declared somewhere in the directory. Literals with no
/// matching declaration are left for the pruner. Returns the number of
/// rewritten references.
pub fn link_references(dir: &mut ConfigDirectory) -> usize {
    let declared = dir.declared_widgets();
    let mut linked = 0;

    for file in &mut dir.files {
        let rewritten = LITERAL_CHART_ID.replace_all(&file.content, |caps: &Captures| {
            let identifier = normalize(&caps[2]);
            match declared.get(&identifier) {
                Some(resource_type) => {
                    linked += 1;
                    format!("{}{}.{}.id", &caps[1], resource_type, identifier)
                }
                None => caps[0].to_string(),
            }
        });
        file.content = rewritten.into_owned();
    }

    linked
}
