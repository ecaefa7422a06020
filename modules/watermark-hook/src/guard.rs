//! Loop prevention. Publishing the watermarked copy fires the same webhook
//! again; the file name prefix is the only thing telling the two apart.

pub const MARKER: &str = "[WATERMARKED]";

/// True if the file name already carries the marker at its start.
pub fn is_marked(file_name: Option<&str>) -> bool {
    file_name.is_some_and(|name| name.starts_with(MARKER))
}

/// Prefix a title or file name with the marker and a single space.
pub fn mark(value: &str) -> String {
    format!("{MARKER} {value}")
}
