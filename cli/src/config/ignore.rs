//! The set of path patterns excluded from linking.

/// Patterns excluded from every scan unless the configuration replaces them.
pub const DEFAULT_IGNORE: &[&str] = &[
    ".git",
    ".gitignore",
    ".gitmodules",
    "COPYING",
    "LICENSE",
    "README.md",
    "install.sh",
    "Cargo.toml",
    "Cargo.lock",
    "tilde.toml",
];

/// Substring patterns matched against slash-separated relative paths.
///
/// A pattern excludes every path that contains it anywhere, so `.git`
/// also excludes `.gitignore` and everything below a nested `.git/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreSet {
    patterns: Vec<String>,
}

impl IgnoreSet {
    /// Build a set from explicit patterns. Empty patterns are dropped since
    /// they would match every path.
    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self {
            patterns: Vec::new(),
        };
        set.extend(patterns);
        set
    }

    /// Add patterns, skipping empties and duplicates.
    pub fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for p in patterns {
            let p = p.into();
            if !p.is_empty() && !self.patterns.contains(&p) {
                self.patterns.push(p);
            }
        }
    }

    /// Return `true` if `relative` (slash-separated) contains any pattern.
    #[must_use]
    pub fn matches(&self, relative: &str) -> bool {
        self.patterns.iter().any(|p| relative.contains(p.as_str()))
    }

    /// The configured patterns in insertion order.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE.iter().copied())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn default_excludes_git_metadata() {
        let set = IgnoreSet::default();
        assert!(set.matches(".git/config"));
        assert!(set.matches(".gitignore"));
        assert!(set.matches(".gitmodules"));
        assert!(set.matches("vim/bundle/plugin/.git/HEAD"));
    }

    #[test]
    fn default_excludes_repo_files() {
        let set = IgnoreSet::default();
        for name in ["README.md", "COPYING", "LICENSE", "install.sh", "tilde.toml"] {
            assert!(set.matches(name), "{name} should be ignored");
        }
    }

    #[test]
    fn default_keeps_dotfiles() {
        let set = IgnoreSet::default();
        assert!(!set.matches(".vimrc"));
        assert!(!set.matches(".config/nvim/init.vim"));
        assert!(!set.matches(".bashrc"));
    }

    #[test]
    fn substring_match_anywhere_in_path() {
        let set = IgnoreSet::new(["secret"]);
        assert!(set.matches(".config/secret/token"));
        assert!(set.matches("my-secret-file"));
        assert!(!set.matches(".config/public"));
    }

    #[test]
    fn empty_patterns_are_dropped() {
        let set = IgnoreSet::new(["", "x"]);
        assert_eq!(set.patterns(), ["x".to_string()]);
        assert!(!set.matches(".vimrc"));
    }

    #[test]
    fn extend_skips_duplicates() {
        let mut set = IgnoreSet::new([".git"]);
        set.extend([".git", ".tilde-backup"]);
        assert_eq!(set.patterns().len(), 2);
    }
}
