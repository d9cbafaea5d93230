//! Specification resource lookup
//!
//! Resolves a classpath-style file pattern (e.g. `openapi.yaml` or
//! `-test-*.txt`) to the first matching file beneath a set of search roots.

use std::path::{Path, PathBuf};

/// Finds resource files by name pattern under configured search roots
#[derive(Debug, Clone)]
pub struct ResourceLoader {
    roots: Vec<PathBuf>,
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self::new(vec![PathBuf::from(".")])
    }
}

impl ResourceLoader {
    /// Create a loader that searches the given roots in order
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Return the first file matching `**/*{pattern}` under any root
    ///
    /// A pattern naming an existing file directly is returned as-is. Lookup
    /// failures are logged and reported as no match.
    pub fn find_first(&self, pattern: &str) -> Option<PathBuf> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return None;
        }

        let direct = Path::new(pattern);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }

        for root in &self.roots {
            let matches = self.find_under(root, pattern);
            tracing::info!(
                "Found {} files matching pattern {} under {}",
                matches.len(),
                pattern,
                root.display()
            );
            if let Some(first) = matches.into_iter().next() {
                return Some(first);
            }
        }

        None
    }

    fn find_under(&self, root: &Path, pattern: &str) -> Vec<PathBuf> {
        let root = glob::Pattern::escape(&root.to_string_lossy());
        let full = format!("{}/**/*{}", root.trim_end_matches('/'), pattern);

        let paths = match glob::glob(&full) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::error!("Error loading resources for pattern {}: {}", pattern, e);
                return Vec::new();
            }
        };

        let mut matches: Vec<PathBuf> = paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("Skipping unreadable path while searching for {}: {}", pattern, e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();
        matches.sort();
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("test-res.txt"), "top").unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(
            dir.path().join("nested/deeper/nested-test-resource.txt"),
            "nested",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_finds_file_by_suffix() {
        let dir = fixture();
        let loader = ResourceLoader::new(vec![dir.path().to_path_buf()]);

        let found = loader.find_first("-res.txt").unwrap();
        assert_eq!(found.file_name().unwrap(), "test-res.txt");
    }

    #[test]
    fn test_finds_nested_file_with_wildcard() {
        let dir = fixture();
        let loader = ResourceLoader::new(vec![dir.path().to_path_buf()]);

        let found = loader.find_first("-test-*.txt").unwrap();
        assert_eq!(found.file_name().unwrap(), "nested-test-resource.txt");
    }

    #[test]
    fn test_finds_file_by_full_name() {
        let dir = fixture();
        let loader = ResourceLoader::new(vec![dir.path().to_path_buf()]);

        let found = loader.find_first("nested-test-resource.txt").unwrap();
        assert_eq!(found.file_name().unwrap(), "nested-test-resource.txt");
    }

    #[test]
    fn test_returns_none_when_nothing_matches() {
        let dir = fixture();
        let loader = ResourceLoader::new(vec![dir.path().to_path_buf()]);

        assert!(loader.find_first("nonexistent-file-123.yaml").is_none());
        assert!(loader.find_first("").is_none());
    }

    #[test]
    fn test_direct_file_path() {
        let dir = fixture();
        let direct = dir.path().join("test-res.txt");
        let loader = ResourceLoader::new(Vec::new());

        assert_eq!(
            loader.find_first(&direct.to_string_lossy()),
            Some(direct.clone())
        );
    }
}
