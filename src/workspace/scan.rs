use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::graph::{FileKind, SourceFile};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Walk stops after this many files; the graph is marked truncated.
    pub max_files: usize,
    /// Larger files get a node but their contents are not read.
    pub max_file_bytes: u64,
    pub follow_symlinks: bool,
    pub include_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_files: 20_000,
            max_file_bytes: 1024 * 1024,
            follow_symlinks: false,
            include_hidden: false,
        }
    }
}

#[derive(Debug)]
pub struct ScanResult {
    pub root: PathBuf,
    pub files: Vec<SourceFile>,
    pub unreadable: usize,
    pub truncated: bool,
}

/// Walks `root`, honoring ignore files, and reads the text of every file
/// whose kind extracts anything from its contents.
///
/// `is_cancelled` is polled between entries; a cancelled scan returns
/// `Ok(None)`.
pub fn scan_workspace(
    root: &Path,
    options: &ScanOptions,
    is_cancelled: &dyn Fn() -> bool,
) -> Result<Option<ScanResult>> {
    let root = root
        .canonicalize()
        .with_context(|| format!("cannot open workspace root {}", root.display()))?;
    if !root.is_dir() {
        bail!("workspace root {} is not a directory", root.display());
    }

    let started = Instant::now();
    let walker = WalkBuilder::new(&root)
        .hidden(!options.include_hidden)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .follow_links(options.follow_symlinks)
        .build();

    let mut files = Vec::new();
    let mut unreadable = 0usize;
    let mut truncated = false;

    for entry in walker {
        if is_cancelled() {
            debug!("scan of {} cancelled", root.display());
            return Ok(None);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!("skipping unreadable entry: {error}");
                unreadable += 1;
                continue;
            }
        };
        if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
            continue;
        }

        if files.len() >= options.max_files {
            warn!(
                "stopping scan of {} after {} files",
                root.display(),
                options.max_files
            );
            truncated = true;
            break;
        }

        let path = entry.into_path();
        let contents = if FileKind::from_path(&path).wants_contents() {
            match read_text(&path, options.max_file_bytes) {
                Ok(contents) => contents,
                Err(error) => {
                    warn!("{error:#}");
                    unreadable += 1;
                    None
                }
            }
        } else {
            None
        };
        files.push(SourceFile::new(path, contents));
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    info!(
        "scanned {} files under {} in {:.2?}",
        files.len(),
        root.display(),
        started.elapsed()
    );

    Ok(Some(ScanResult {
        root,
        files,
        unreadable,
        truncated,
    }))
}

fn read_text(path: &Path, max_bytes: u64) -> Result<Option<String>> {
    let metadata =
        fs::metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;
    if metadata.len() > max_bytes {
        debug!("skipping contents of {} ({} bytes)", path.display(), metadata.len());
        return Ok(None);
    }

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    match String::from_utf8(bytes) {
        Ok(text) if !text.contains('\0') => Ok(Some(text)),
        _ => {
            debug!("skipping contents of binary file {}", path.display());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn never() -> bool {
        false
    }

    fn write(root: &Path, relative: &str, contents: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn names(result: &ScanResult) -> Vec<String> {
        result
            .files
            .iter()
            .map(|file| {
                file.path
                    .strip_prefix(&result.root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn scan_reads_whitelisted_text_and_respects_ignores() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/a.ts", b"import './b';");
        write(dir.path(), "src/b.ts", b"export const b = 1;");
        write(dir.path(), "docs/readme.md", b"[[a]]");
        write(dir.path(), "logo.png", b"\x89PNG\0\0");
        write(dir.path(), "build/out.js", b"ignored");
        write(dir.path(), ".hidden/secret.ts", b"hidden");
        write(dir.path(), ".gitignore", b"build/\n");

        let result = scan_workspace(dir.path(), &ScanOptions::default(), &never)
            .unwrap()
            .unwrap();

        assert_eq!(
            names(&result),
            vec!["docs/readme.md", "logo.png", "src/a.ts", "src/b.ts"]
        );
        assert_eq!(result.files[2].contents.as_deref(), Some("import './b';"));
        assert!(result.files[1].contents.is_none());
        assert!(!result.truncated);
    }

    #[test]
    fn binary_and_oversized_sources_keep_their_node() {
        let dir = tempdir().unwrap();
        write(dir.path(), "bin.js", b"\0\x01\x02\xff");
        write(dir.path(), "big.ts", &vec![b'a'; 64]);

        let options = ScanOptions {
            max_file_bytes: 32,
            ..ScanOptions::default()
        };
        let result = scan_workspace(dir.path(), &options, &never).unwrap().unwrap();
        assert_eq!(names(&result), vec!["big.ts", "bin.js"]);
        assert!(result.files.iter().all(|file| file.contents.is_none()));
    }

    #[test]
    fn max_files_truncates() {
        let dir = tempdir().unwrap();
        for index in 0..5 {
            write(dir.path(), &format!("f{index}.ts"), b"");
        }
        let options = ScanOptions {
            max_files: 3,
            ..ScanOptions::default()
        };
        let result = scan_workspace(dir.path(), &options, &never).unwrap().unwrap();
        assert_eq!(result.files.len(), 3);
        assert!(result.truncated);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let error = scan_workspace(&missing, &ScanOptions::default(), &never).unwrap_err();
        assert!(format!("{error:#}").contains("cannot open workspace root"));
    }

    #[test]
    fn file_root_is_an_error() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", b"");
        let error =
            scan_workspace(&dir.path().join("a.ts"), &ScanOptions::default(), &never).unwrap_err();
        assert!(error.to_string().contains("is not a directory"));
    }

    #[test]
    fn cancelled_scan_returns_none() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", b"");
        let result = scan_workspace(dir.path(), &ScanOptions::default(), &|| true).unwrap();
        assert!(result.is_none());
    }
}
