//! File-system helpers shared by the classifier and the applier.
use std::io;
use std::path::{Component, Path, PathBuf};

/// Compute the lowercase hex SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(path: &Path) -> io::Result<String> {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    let result = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for b in &result {
        // write! to a String is infallible; unwrap_or(()) makes that explicit.
        write!(hex, "{b:02x}").unwrap_or(());
    }
    Ok(hex)
}

/// Express `to` relative to the directory `from`.
///
/// Both paths must be absolute and free of `.`/`..` components (i.e.
/// canonicalized). Returns `None` when no relative path exists, such as
/// across Windows drive prefixes.
#[must_use]
pub fn relative_path(from: &Path, to: &Path) -> Option<PathBuf> {
    if !from.is_absolute() || !to.is_absolute() {
        return None;
    }
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    if from.first() != to.first() {
        return None;
    }
    if from
        .iter()
        .chain(to.iter())
        .any(|c| matches!(c, Component::CurDir | Component::ParentDir))
    {
        return None;
    }

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for part in to.iter().skip(common) {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Some(rel)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_value() {
        // SHA-256 of the empty string.
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("empty");
        std::fs::write(&file, b"").expect("write");
        assert_eq!(
            compute_sha256(&file).expect("compute_sha256"),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_known_content() {
        // echo -n "hello world" | sha256sum
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("hello");
        std::fs::write(&file, b"hello world").expect("write");
        assert_eq!(
            compute_sha256(&file).expect("compute_sha256"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn sha256_missing_file_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(compute_sha256(&dir.path().join("absent")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn relative_path_sibling_trees() {
        assert_eq!(
            relative_path(Path::new("/home/u"), Path::new("/home/u/dotfiles/.vimrc")),
            Some(PathBuf::from("dotfiles/.vimrc"))
        );
        assert_eq!(
            relative_path(
                Path::new("/home/u/.config/nvim"),
                Path::new("/home/u/dotfiles/.config/nvim/init.vim")
            ),
            Some(PathBuf::from("../../dotfiles/.config/nvim/init.vim"))
        );
        assert_eq!(
            relative_path(Path::new("/a/b"), Path::new("/c/d")),
            Some(PathBuf::from("../../c/d"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn relative_path_rejects_relative_inputs() {
        assert_eq!(relative_path(Path::new("a"), Path::new("/b")), None);
        assert_eq!(relative_path(Path::new("/a/../b"), Path::new("/b")), None);
    }

    #[cfg(unix)]
    #[test]
    fn relative_path_resolves_from_link_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let src = root.join("repo/.config/git/config");
        std::fs::create_dir_all(src.parent().unwrap()).unwrap();
        std::fs::write(&src, "x").unwrap();
        let link_dir = root.join("home/.config/git");
        std::fs::create_dir_all(&link_dir).unwrap();
        let rel = relative_path(&link_dir, &src).unwrap();
        assert_eq!(std::fs::read_to_string(link_dir.join(rel)).unwrap(), "x");
    }
}
