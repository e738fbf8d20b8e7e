//! Brace-aware scanning over generated Terraform text
//!
//! `terraform state show` output is consumed as plain text. Blocks are found
//! by their `resource "<type>" "<name>" {` header and closed by counting
//! braces outside of string literals and heredocs, so quirks of the upstream
//! output (duplicated marker lines, odd spacing) survive untouched.

use lazy_static::lazy_static;
use regex::Regex;

use crate::naming::is_identifier_char;

lazy_static! {
    static ref RESOURCE_HEADER: Regex =
        Regex::new(r#"(?m)^[ \t]*resource[ \t]+"([\w-]+)"[ \t]+"([\w-]+)"[ \t]*\{"#)
            .expect("Invalid resource header regex");
    static ref HEREDOC_OPEN: Regex =
        Regex::new(r"<<-?([A-Za-z_][A-Za-z0-9_]*)[ \t\r]*$").expect("Invalid heredoc regex");
}

/// A resource block located inside a configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBlock {
    pub resource_type: String,
    pub name: String,
    /// Start of the leading marker line (or of the header line when unmarked)
    pub start: usize,
    /// Byte just past the opening brace
    pub body_start: usize,
    /// Byte just past the closing brace
    pub body_end: usize,
    /// End of the trailing marker line (or of the closing brace line)
    pub end: usize,
}

/// Marker line written around every resource block
pub fn marker(resource_type: &str, name: &str) -> String {
    format!("# {}.{}:", resource_type, name)
}

/// Find the position just past the bracket that closes the one at `open`.
///
/// Works for both `{` and `[`. Brackets inside quoted strings and heredoc
/// bodies are ignored.
pub fn find_closing(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let (open_byte, close_byte) = match bytes.get(open) {
        Some(b'{') => (b'{', b'}'),
        Some(b'[') => (b'[', b']'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte == b'"' {
            i = skip_string(bytes, i)?;
            continue;
        }
        if byte == b'<' && bytes.get(i + 1) == Some(&b'<') {
            if let Some(next) = skip_heredoc(text, i) {
                i = next;
                continue;
            }
        }
        if byte == open_byte {
            depth += 1;
        } else if byte == close_byte {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
        i += 1;
    }

    None
}

fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            b'\n' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Skip a heredoc starting at `start` (pointing at `<<`), returning the end
/// of its terminator line.
fn skip_heredoc(text: &str, start: usize) -> Option<usize> {
    let line_end = text[start..].find('\n').map(|n| start + n)?;
    let caps = HEREDOC_OPEN.captures(&text[start..line_end])?;
    if caps.get(0)?.start() != 0 {
        return None;
    }
    let tag = caps.get(1)?.as_str();

    let mut pos = line_end + 1;
    while pos <= text.len() {
        let end = text[pos..].find('\n').map(|n| pos + n).unwrap_or(text.len());
        if text[pos..end].trim() == tag {
            return Some(end);
        }
        if end == text.len() {
            return None;
        }
        pos = end + 1;
    }

    None
}

/// Byte offset where the line containing `idx` starts
pub fn line_start(text: &str, idx: usize) -> usize {
    text[..idx].rfind('\n').map(|p| p + 1).unwrap_or(0)
}

/// Byte offset just past the newline that ends the line containing `idx`
pub fn line_end(text: &str, idx: usize) -> usize {
    text[idx..].find('\n').map(|n| idx + n + 1).unwrap_or(text.len())
}

/// Locate every resource block in `text`, including its marker lines
pub fn resource_blocks(text: &str) -> Vec<ResourceBlock> {
    let mut blocks = Vec::new();
    let mut search_from = 0;

    while let Some(caps) = RESOURCE_HEADER.captures_at(text, search_from) {
        let (Some(whole), Some(ty), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            break;
        };
        let open = whole.end() - 1;
        let Some(body_end) = find_closing(text, open) else {
            break;
        };

        let marker_line = marker(ty.as_str(), name.as_str());
        let header_start = line_start(text, whole.start());
        let mut start = header_start;
        if header_start > 0 {
            let previous = line_start(text, header_start - 1);
            if text[previous..header_start].trim() == marker_line {
                start = previous;
            }
        }

        let mut end = line_end(text, body_end);
        let mut probe = end;
        while probe < text.len() {
            let next = line_end(text, probe);
            let line = text[probe..next].trim();
            if line.is_empty() {
                probe = next;
                continue;
            }
            if line == marker_line {
                end = next;
            }
            break;
        }

        blocks.push(ResourceBlock {
            resource_type: ty.as_str().to_string(),
            name: name.as_str().to_string(),
            start,
            body_start: open + 1,
            body_end,
            end,
        });
        search_from = end;
    }

    blocks
}

/// Remove the given byte ranges from `text`. Ranges must not overlap.
pub fn remove_ranges(text: &str, mut ranges: Vec<(usize, usize)>) -> String {
    ranges.sort_by_key(|r| r.0);
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in ranges {
        if start < cursor {
            continue;
        }
        result.push_str(&text[cursor..start]);
        cursor = end;
    }
    result.push_str(&text[cursor..]);
    result
}

/// Replace whole-identifier occurrences of `old` with `new`.
///
/// An occurrence only counts when it is not glued to other identifier
/// characters, so renaming `abc` leaves `abcd` alone but rewrites
/// `signalfx_time_chart.abc.id` and `"abc"`.
pub fn replace_identifier(text: &str, old: &str, new: &str) -> (String, usize) {
    if old.is_empty() {
        return (text.to_string(), 0);
    }

    let mut result = String::with_capacity(text.len());
    let mut count = 0;
    let mut cursor = 0;

    for (idx, _) in text.match_indices(old) {
        if idx < cursor {
            continue;
        }
        let before = text[..idx].chars().next_back();
        let after = text[idx + old.len()..].chars().next();
        let glued = before.is_some_and(is_identifier_char) || after.is_some_and(is_identifier_char);
        if glued {
            continue;
        }
        result.push_str(&text[cursor..idx]);
        result.push_str(new);
        cursor = idx + old.len();
        count += 1;
    }
    result.push_str(&text[cursor..]);

    (result, count)
}
