//! Library source provider contract.
//!
//! The core never touches the filesystem: an embedder hands it source
//! text under `@stdlib/`-rooted keys. The in-memory provider is what the
//! tests and simple drivers use; a CLI wraps disk loading around the
//! same trait.

use crate::config::Target;

/// Provides library sources for a target.
pub trait LibraryProvider {
    /// Return `(source_key, source_text)` pairs for the requested
    /// libraries. Keys are rooted at `@stdlib/`.
    fn load(&self, target: Target, libraries: &[String]) -> Vec<(String, String)>;
}

/// Library provider backed by an in-memory list.
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    sources: Vec<(String, String)>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.sources.push((key.into(), text.into()));
        self
    }
}

impl LibraryProvider for InMemoryLibrary {
    fn load(&self, _target: Target, libraries: &[String]) -> Vec<(String, String)> {
        if libraries.is_empty() {
            return self.sources.clone();
        }
        self.sources
            .iter()
            .filter(|(key, _)| {
                libraries
                    .iter()
                    .any(|lib| key == &format!("@stdlib/{}", lib))
            })
            .cloned()
            .collect()
    }
}

/// A provider with no libraries at all.
#[derive(Debug, Default)]
pub struct NoLibraries;

impl LibraryProvider for NoLibraries {
    fn load(&self, _target: Target, _libraries: &[String]) -> Vec<(String, String)> {
        Vec::new()
    }
}
