//! Tour registry: owns every loaded guide for the life of the process.

use std::collections::HashMap;
use std::path::Path;

use tracing::{error, warn};

use crate::error::LoadError;

use super::loader::{load_guides, parse_guides, LoadOutcome};
use super::model::GuideDefinition;

/// Loaded guides, indexed by name.
///
/// Duplicate names are kept but only the first guide with a given name is
/// reachable through [`TourRegistry::get`].
#[derive(Debug, Default)]
pub struct TourRegistry {
    guides: Vec<GuideDefinition>,
    by_name: HashMap<String, usize>,
}

impl TourRegistry {
    /// A registry with no tours. Every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_guides(guides: Vec<GuideDefinition>) -> Self {
        let mut by_name = HashMap::new();
        for (index, guide) in guides.iter().enumerate() {
            if by_name.contains_key(&guide.name) {
                warn!(guide = %guide.name, "Duplicate guide name; first definition wins");
                continue;
            }
            by_name.insert(guide.name.clone(), index);
        }
        Self { guides, by_name }
    }

    /// Parse guides from an in-memory document.
    pub fn from_source(source: &str) -> Result<Self, LoadError> {
        let LoadOutcome { guides, .. } = parse_guides(source)?;
        Ok(Self::from_guides(guides))
    }

    /// Load guides from a file.
    pub async fn from_path(path: &Path) -> Result<Self, LoadError> {
        let LoadOutcome { guides, .. } = load_guides(path).await?;
        Ok(Self::from_guides(guides))
    }

    /// Load guides from a file, falling back to an empty registry when the
    /// source is missing or malformed. Tours are then unavailable for the
    /// session but the engine still runs.
    pub async fn load_or_empty(path: &Path) -> Self {
        match Self::from_path(path).await {
            Ok(registry) => registry,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Guided tours unavailable");
                Self::empty()
            }
        }
    }

    /// Find a guide by exact name.
    pub fn get(&self, name: &str) -> Option<&GuideDefinition> {
        self.by_name.get(name).map(|&i| &self.guides[i])
    }

    /// All guides in source order, duplicates included.
    pub fn guides(&self) -> &[GuideDefinition] {
        &self.guides
    }

    /// Distinct guide names in source order.
    pub fn names(&self) -> Vec<&str> {
        self.guides
            .iter()
            .enumerate()
            .filter(|(i, g)| self.by_name.get(&g.name) == Some(i))
            .map(|(_, g)| g.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.guides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"[
        { "name": "Intro", "steps": [ { "name": "a", "sequence": 0, "stepType": "Welcome" } ] },
        { "name": "Packages", "steps": [] },
        { "name": "Intro", "steps": [] }
    ]"#;

    #[test]
    fn first_duplicate_wins() {
        let registry = TourRegistry::from_source(SOURCE).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("Intro").unwrap().steps.len(), 1);
        assert_eq!(registry.names(), ["Intro", "Packages"]);
    }

    #[test]
    fn lookup_is_exact() {
        let registry = TourRegistry::from_source(SOURCE).unwrap();
        assert!(registry.get("intro").is_none());
        assert!(registry.get("Intro ").is_none());
        assert!(registry.get("Packages").is_some());
    }

    #[tokio::test]
    async fn load_failure_leaves_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("guides.json");
        let registry = TourRegistry::load_or_empty(&missing).await;
        assert!(registry.is_empty());

        let malformed = dir.path().join("bad.json");
        tokio::fs::write(&malformed, "not json").await.unwrap();
        let registry = TourRegistry::load_or_empty(&malformed).await;
        assert!(registry.is_empty());
        assert!(registry.get("Intro").is_none());
    }
}
