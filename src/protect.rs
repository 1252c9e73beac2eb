use std::path::{Path, PathBuf};

/// Path prefixes that are never eligible for deletion.
#[derive(Debug, Clone, Default)]
pub struct ProtectList {
    prefixes: Vec<PathBuf>,
}

impl ProtectList {
    /// Prefixes that exist are canonicalized so they compare against the
    /// canonical paths the scanner walks.
    pub fn new(prefixes: Vec<PathBuf>) -> Self {
        let prefixes = prefixes
            .into_iter()
            .map(|p| p.canonicalize().unwrap_or(p))
            .collect();
        Self { prefixes }
    }

    /// Component-wise prefix match, so `/data/keep` does not cover `/data/keeper`.
    pub fn is_protected(&self, path: &Path) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
