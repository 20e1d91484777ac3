//! Symbol pool and directory loading
//!
//! The engine only sees opaque handles. Where they come from (an image
//! directory or the bundled set) is decided here.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::SymbolLoadError;

/// Image extensions accepted by the directory loader
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Names of the bundled fallback symbols
const BUNDLED_SYMBOLS: [&str; 8] = [
    "cherry", "lemon", "orange", "plum", "bell", "bar", "seven", "star",
];

/// Opaque symbol handle handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolHandle {
    /// Position in the pool it was loaded into
    pub id: u32,
    /// Display name (file stem for images)
    pub name: String,
    /// Source identity, e.g. `file:///…/seven.png` or `bundled:seven`
    pub source: String,
}

impl SymbolHandle {
    pub fn new(id: u32, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            source: source.into(),
        }
    }

    /// Is this one of the bundled fallback symbols?
    pub fn is_bundled(&self) -> bool {
        self.source.starts_with("bundled:")
    }
}

/// Ordered, deduplicated set of symbols available for draws
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolPool {
    symbols: Vec<SymbolHandle>,
}

impl SymbolPool {
    /// Build a pool, dropping handles whose source was already seen.
    ///
    /// Ids are reassigned to match pool positions.
    pub fn new(symbols: impl IntoIterator<Item = SymbolHandle>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();

        for symbol in symbols {
            if seen.insert(symbol.source.clone()) {
                log::debug!("Loaded symbol: {}", symbol.source);
                unique.push(symbol);
            } else {
                log::debug!("Skipped duplicate symbol: {}", symbol.source);
            }
        }

        for (id, symbol) in unique.iter_mut().enumerate() {
            symbol.id = id as u32;
        }

        Self { symbols: unique }
    }

    /// Empty pool; the game is disabled until symbols are loaded
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in symbols used when no image directory is available
    pub fn bundled() -> Self {
        Self::new(
            BUNDLED_SYMBOLS
                .iter()
                .enumerate()
                .map(|(i, name)| SymbolHandle::new(i as u32, *name, format!("bundled:{name}"))),
        )
    }

    /// Scan `dir` (non-recursive) for image files, sorted by file name.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, SymbolLoadError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SymbolLoadError::MissingDirectory(dir.to_path_buf()));
        }

        let mut handles = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() || !has_image_extension(entry.path()) {
                continue;
            }

            let path = entry.path().canonicalize()?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let source = format!("file://{}", path.display());
            handles.push(SymbolHandle::new(handles.len() as u32, name, source));
        }

        let pool = Self::new(handles);
        log::info!("Loaded {} symbols from {}", pool.len(), dir.display());
        Ok(pool)
    }

    /// Directory symbols, or the bundled set if the directory is missing or
    /// holds no images.
    pub fn load_or_bundled(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        match Self::from_directory(dir) {
            Ok(pool) if !pool.is_empty() => pool,
            Ok(_) => {
                log::warn!("No images in {}, using bundled symbols", dir.display());
                Self::bundled()
            }
            Err(e) => {
                log::warn!("{e}, using bundled symbols");
                Self::bundled()
            }
        }
    }

    /// First `symbols_to_use` symbols; 0 or anything ≥ len keeps them all
    pub fn restricted(&self, symbols_to_use: u32) -> Self {
        let n = symbols_to_use as usize;
        if n == 0 || n >= self.symbols.len() {
            return self.clone();
        }
        Self {
            symbols: self.symbols[..n].to_vec(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&SymbolHandle> {
        self.symbols.get(index)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolHandle> {
        self.symbols.iter()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_dedup_by_source() {
        let pool = SymbolPool::new(vec![
            SymbolHandle::new(0, "a", "file:///a.png"),
            SymbolHandle::new(1, "b", "file:///b.png"),
            SymbolHandle::new(2, "a-again", "file:///a.png"),
        ]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(1).map(|s| s.name.as_str()), Some("b"));
        assert_eq!(pool.get(1).map(|s| s.id), Some(1));
    }

    #[test]
    fn test_bundled() {
        let pool = SymbolPool::bundled();
        assert_eq!(pool.len(), 8);
        assert!(pool.iter().all(SymbolHandle::is_bundled));
    }

    #[test]
    fn test_restricted() {
        let pool = SymbolPool::bundled();
        assert_eq!(pool.restricted(0).len(), 8);
        assert_eq!(pool.restricted(3).len(), 3);
        assert_eq!(pool.restricted(20).len(), 8);
        assert_eq!(
            pool.restricted(2).get(1).map(|s| s.name.as_str()),
            Some("lemon")
        );
    }

    #[test]
    fn test_from_directory_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "c.gif", "d.jpeg", "notes.txt", "e.bmp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let pool = SymbolPool::from_directory(dir.path()).unwrap();
        let names: Vec<_> = pool.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert!(pool.iter().all(|s| s.source.starts_with("file://")));
    }

    #[test]
    fn test_missing_directory_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(matches!(
            SymbolPool::from_directory(&missing),
            Err(SymbolLoadError::MissingDirectory(_))
        ));
        assert_eq!(SymbolPool::load_or_bundled(&missing), SymbolPool::bundled());
    }

    #[test]
    fn test_empty_directory_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SymbolPool::from_directory(dir.path()).unwrap().is_empty());
        assert_eq!(SymbolPool::load_or_bundled(dir.path()).len(), 8);
    }
}
