//! Source tree scanning: the inventory of files to link.
use std::fmt;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::config::ignore::IgnoreSet;
use crate::error::ScanError;

/// A file below the source root that is a candidate for linking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceFile {
    relative: PathBuf,
    slash: String,
}

impl SourceFile {
    /// Build from a path relative to the source root.
    #[must_use]
    pub fn new(relative: impl Into<PathBuf>) -> Self {
        let relative = relative.into();
        let slash = to_slash(&relative);
        Self { relative, slash }
    }

    /// Native relative path.
    #[must_use]
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Slash-separated relative path, used for ignore matching and messages.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.slash
    }

    /// Absolute path of the file in the source tree.
    #[must_use]
    pub fn source_path(&self, source_root: &Path) -> PathBuf {
        source_root.join(&self.relative)
    }

    /// Absolute path of the link in the target tree.
    #[must_use]
    pub fn target_path(&self, target_root: &Path) -> PathBuf {
        target_root.join(&self.relative)
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slash)
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lazily enumerate non-ignored leaf entries below `root` in file-name order.
///
/// Ignored directories are pruned without being read. Symlinks inside the
/// source tree are not followed and are emitted as leaves.
///
/// # Errors
///
/// Fails immediately if `root` is missing or not a directory; each later
/// read failure is yielded as an `Err` item.
pub fn scan_iter<'a>(
    root: &Path,
    ignore: &'a IgnoreSet,
) -> Result<impl Iterator<Item = Result<SourceFile, ScanError>> + use<'a>, ScanError> {
    let meta = std::fs::metadata(root).map_err(|source| ScanError::Root {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let prefix = root.to_path_buf();
    let filter_prefix = prefix.clone();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            entry
                .path()
                .strip_prefix(&filter_prefix)
                .map_or(true, |rel| !ignore.matches(&to_slash(rel)))
        });

    Ok(walker.filter_map(move |entry| match entry {
        Err(source) => Some(Err(ScanError::Walk {
            path: source.path().map_or_else(|| prefix.clone(), Path::to_path_buf),
            source,
        })),
        Ok(entry) if entry.file_type().is_dir() => None,
        Ok(entry) => entry
            .path()
            .strip_prefix(&prefix)
            .ok()
            .map(|rel| Ok(SourceFile::new(rel))),
    }))
}

/// The complete, validated list of files to link.
#[derive(Debug, Clone)]
pub struct Inventory {
    root: PathBuf,
    files: Vec<SourceFile>,
}

impl Inventory {
    /// Scan `root` fully. Any read error aborts the scan.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the root or any directory below it cannot be read.
    pub fn scan(root: &Path, ignore: &IgnoreSet) -> Result<Self, ScanError> {
        let files = scan_iter(root, ignore)?.collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Source root that was scanned.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files in scan order.
    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Number of files.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the inventory is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
