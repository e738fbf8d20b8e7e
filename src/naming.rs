use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[ @.]").expect("Invalid separator regex");
    static ref INVALID_CHARS: Regex =
        Regex::new(r"[^a-zA-Z0-9_-]").expect("Invalid identifier character regex");
}

/// Turn a display name into a Terraform resource identifier.
///
/// Spaces, periods and `@` become underscores, a leading character that is
/// not a letter or underscore gets an underscore prepended, and anything left
/// outside `[A-Za-z0-9_-]` is replaced with an underscore.
pub fn normalize(name: &str) -> String {
    let name = SEPARATORS.replace_all(name, "_");

    let name = match name.chars().next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => name.into_owned(),
        _ => format!("_{}", name),
    };

    INVALID_CHARS.replace_all(&name, "_").into_owned()
}

/// Check whether a character can appear inside an identifier
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
