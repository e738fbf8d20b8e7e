//! Clean-up rules applied to `terraform state show` output
//!
//! Each rule is a plain text transformation so it can be tested in isolation
//! and keeps whatever formatting the backend produced.

use lazy_static::lazy_static;
use regex::Regex;

use crate::blocks::{find_closing, line_end, line_start, remove_ranges};
use crate::model::{GroupLink, PLACEHOLDER_GROUP, ResourceKind};

/// Computed or unportable attributes dropped from every resource
const UNSUPPORTED_FIELDS: &[&str] = &["url", "id", "config_id", "tags"];

lazy_static! {
    static ref LABEL_RESOLUTIONS: Regex =
        Regex::new(r"(?m)^[ \t]*label_resolutions[ \t]*=[ \t]*\{").expect("Invalid label_resolutions regex");
    static ref DASHBOARD_GROUP_FIELD: Regex =
        Regex::new(r#"(?m)^([ \t]*)dashboard_group([ \t]*)=[ \t]*".*"[ \t]*$"#)
            .expect("Invalid dashboard_group regex");
    static ref PARENT_FIELD: Regex = Regex::new(r#"(?m)^([ \t]*)parent([ \t]*)=[ \t]*".*"[ \t]*$"#)
        .expect("Invalid parent regex");
    static ref HEREDOC_START: Regex =
        Regex::new(r"<<-?([A-Za-z_][A-Za-z0-9_]*)[ \t\r]*$").expect("Invalid heredoc regex");
}

/// Apply every rule relevant to `kind`
pub fn sanitize(kind: ResourceKind, text: &str, group: Option<&GroupLink>) -> String {
    let mut text = strip_unsupported_fields(text);

    if kind == ResourceKind::AlertRule {
        text = strip_label_resolutions(&text);
    }

    if let (ResourceKind::CompositeView, Some(group)) = (kind, group) {
        text = link_group(&text, group);
    }

    text
}

/// Drop assignments to `url`, `id`, `config_id` and `tags`. A value that
/// spans several lines (`tags = [` ... `]`) is dropped as a whole. Heredoc
/// bodies are left alone.
pub fn strip_unsupported_fields(text: &str) -> String {
    let mut ranges = Vec::new();
    let mut heredoc: Option<String> = None;
    let mut pos = 0;

    while pos < text.len() {
        let next = line_end(text, pos);
        let line = &text[pos..next];

        if let Some(tag) = &heredoc {
            if line.trim() == tag {
                heredoc = None;
            }
            pos = next;
            continue;
        }

        let unsupported = line
            .split_once('=')
            .filter(|(lhs, rhs)| UNSUPPORTED_FIELDS.contains(&lhs.trim()) && !rhs.starts_with('='));
        if let Some((lhs, rhs)) = unsupported {
            let mut end = next;
            let value = rhs.trim_start();
            if value.starts_with(['[', '{']) {
                let open = pos + lhs.len() + 1 + (rhs.len() - value.len());
                if let Some(close) = find_closing(text, open) {
                    end = end.max(line_end(text, close.saturating_sub(1)));
                }
            }
            ranges.push((pos, end));
            pos = end;
            continue;
        }

        if let Some(caps) = HEREDOC_START.captures(line.trim_end_matches('\n')) {
            heredoc = caps.get(1).map(|m| m.as_str().to_string());
        }
        pos = next;
    }

    remove_ranges(text, ranges)
}

/// Remove `label_resolutions = { ... }` maps, which the provider cannot take
/// back as input
pub fn strip_label_resolutions(text: &str) -> String {
    let mut ranges = Vec::new();

    for m in LABEL_RESOLUTIONS.find_iter(text) {
        let open = m.end() - 1;
        let end = match find_closing(text, open) {
            Some(close) => line_end(text, close.saturating_sub(1)),
            None => text.len(),
        };
        ranges.push((line_start(text, m.start()), end));
    }

    remove_ranges(text, ranges)
}

/// Point a dashboard at its group symbolically instead of by literal id.
///
/// With the placeholder sentinel the group field becomes the bare sentinel and
/// `parent` is kept as exported.
pub fn link_group(text: &str, group: &GroupLink) -> String {
    match group {
        GroupLink::Symbolic(reference) => {
            let text = DASHBOARD_GROUP_FIELD.replace_all(text, |caps: &regex::Captures| {
                format!("{}dashboard_group{}= {}", &caps[1], &caps[2], reference)
            });
            PARENT_FIELD
                .replace_all(&text, |caps: &regex::Captures| {
                    format!("{}parent{}= {}", &caps[1], &caps[2], reference)
                })
                .into_owned()
        }
        GroupLink::Placeholder => DASHBOARD_GROUP_FIELD
            .replace_all(text, |caps: &regex::Captures| {
                format!("{}dashboard_group{}= {}", &caps[1], &caps[2], PLACEHOLDER_GROUP)
            })
            .into_owned(),
    }
}
