use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// The set of files a reference may resolve to.
#[derive(Debug, Default)]
pub struct FileIndex {
    files: HashSet<PathBuf>,
    by_file_name: HashMap<String, Vec<PathBuf>>,
    by_stem: HashMap<String, Vec<PathBuf>>,
}

impl FileIndex {
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Self {
        let mut index = Self::default();
        for path in paths {
            let path = normalize_path(path);
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                index
                    .by_file_name
                    .entry(file_name.to_lowercase())
                    .or_default()
                    .push(path.clone());
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                index
                    .by_stem
                    .entry(stem.to_lowercase())
                    .or_default()
                    .push(path.clone());
            }
            index.files.insert(path);
        }

        for candidates in index
            .by_file_name
            .values_mut()
            .chain(index.by_stem.values_mut())
        {
            candidates.sort();
            candidates.dedup();
        }

        index
    }

    /// Resolves `specifier` relative to the directory of `from`, trying the
    /// bare path, then `path.ext` and `path/index.ext` for each extension.
    pub fn resolve_relative(
        &self,
        from: &Path,
        specifier: &str,
        extensions: &[&str],
    ) -> Option<PathBuf> {
        let specifier = specifier.trim();
        if specifier.is_empty() {
            return None;
        }

        let base = from.parent().unwrap_or_else(|| Path::new(""));
        let candidate = normalize_path(&base.join(specifier));
        if self.files.contains(&candidate) {
            return Some(candidate);
        }

        for extension in extensions {
            let with_extension = append_extension(&candidate, extension);
            if self.files.contains(&with_extension) {
                return Some(with_extension);
            }
        }

        for extension in extensions {
            let index_file = candidate.join(format!("index.{extension}"));
            if self.files.contains(&index_file) {
                return Some(index_file);
            }
        }

        None
    }

    /// Case-insensitive basename match across the whole file set. An exact
    /// file name wins over a stem match; ties resolve to the smallest path.
    pub fn resolve_basename(&self, name: &str) -> Option<PathBuf> {
        let name = name.trim().trim_end_matches('/');
        let last = name.rsplit('/').next().unwrap_or(name).to_lowercase();
        if last.is_empty() {
            return None;
        }

        self.by_file_name
            .get(&last)
            .or_else(|| self.by_stem.get(&last))
            .and_then(|candidates| candidates.first())
            .cloned()
    }
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(".");
    raw.push(extension);
    PathBuf::from(raw)
}

/// Lexically collapses `.` and `..` components without touching the
/// filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) && normalized.pop();
                if !popped && !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(paths: &[&str]) -> FileIndex {
        FileIndex::new(paths.iter().map(Path::new))
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/p/src/./a/../b/c.ts")),
            PathBuf::from("/p/src/b/c.ts")
        );
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn relative_resolution_probes_suffixes_in_order() {
        let files = index(&[
            "/p/src/main.ts",
            "/p/src/util.ts",
            "/p/src/lib/index.ts",
            "/p/assets/logo.svg",
        ]);
        let from = Path::new("/p/src/main.ts");
        let exts = ["ts", "tsx", "js"];

        assert_eq!(
            files.resolve_relative(from, "./util", &exts),
            Some(PathBuf::from("/p/src/util.ts"))
        );
        assert_eq!(
            files.resolve_relative(from, "./lib", &exts),
            Some(PathBuf::from("/p/src/lib/index.ts"))
        );
        assert_eq!(
            files.resolve_relative(from, "../assets/logo.svg", &exts),
            Some(PathBuf::from("/p/assets/logo.svg"))
        );
        assert_eq!(files.resolve_relative(from, "./missing", &exts), None);
        assert_eq!(files.resolve_relative(from, "  ", &exts), None);
    }

    #[test]
    fn basename_resolution_is_case_insensitive() {
        let files = index(&["/notes/Daily Log.md", "/notes/deep/Ideas.md"]);

        assert_eq!(
            files.resolve_basename("daily log"),
            Some(PathBuf::from("/notes/Daily Log.md"))
        );
        assert_eq!(
            files.resolve_basename("IDEAS.md"),
            Some(PathBuf::from("/notes/deep/Ideas.md"))
        );
        assert_eq!(
            files.resolve_basename("somewhere/ideas"),
            Some(PathBuf::from("/notes/deep/Ideas.md"))
        );
        assert_eq!(files.resolve_basename("nope"), None);
    }

    #[test]
    fn basename_ties_pick_the_smallest_path() {
        let files = index(&["/b/readme.md", "/a/readme.md"]);
        assert_eq!(
            files.resolve_basename("README"),
            Some(PathBuf::from("/a/readme.md"))
        );
    }
}
