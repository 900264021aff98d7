use std::path::Path;

pub fn node_id(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| node_id(path))
}

/// Path relative to `root` for display, falling back to the full path.
pub fn display_path<'a>(path: &'a Path, root: &Path) -> std::borrow::Cow<'a, str> {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
}
