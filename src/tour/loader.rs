//! Tour loader: reads the guides source into `GuideDefinition`s.
//!
//! A source that cannot be opened or is not a JSON array fails the whole
//! load. Individual guides that fail to parse or validate are reported and
//! skipped so the remaining guides still register.

use std::collections::HashSet;
use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::error::LoadError;

use super::model::GuideDefinition;

/// Guides that loaded, plus the ones that were rejected and why.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub guides: Vec<GuideDefinition>,
    pub rejected: Vec<LoadError>,
}

/// Read and parse the guides file at `path`.
pub async fn load_guides(path: &Path) -> Result<LoadOutcome, LoadError> {
    let source = match fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoadError::ResourceNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(LoadError::Io(e)),
    };

    let outcome = parse_guides(&source)?;
    info!(
        path = %path.display(),
        guides = outcome.guides.len(),
        rejected = outcome.rejected.len(),
        "Loaded guided tours"
    );
    Ok(outcome)
}

/// Parse a guides document held in memory.
pub fn parse_guides(source: &str) -> Result<LoadOutcome, LoadError> {
    let document: serde_json::Value = serde_json::from_str(source)?;
    let serde_json::Value::Array(entries) = document else {
        return Err(LoadError::Parse(
            "expected a JSON array of guides at the top level".to_string(),
        ));
    };

    let mut outcome = LoadOutcome::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let label = guide_label(&entry, index);
        match parse_guide(entry, &label) {
            Ok(guide) => outcome.guides.push(guide),
            Err(e) => {
                warn!(guide = %label, error = %e, "Skipping guide");
                outcome.rejected.push(e);
            }
        }
    }
    Ok(outcome)
}

fn parse_guide(entry: serde_json::Value, label: &str) -> Result<GuideDefinition, LoadError> {
    let mut guide: GuideDefinition =
        serde_json::from_value(entry).map_err(|e| LoadError::InvalidGuide {
            guide: label.to_string(),
            reason: e.to_string(),
        })?;

    if guide.name.trim().is_empty() {
        return Err(LoadError::InvalidGuide {
            guide: label.to_string(),
            reason: "guide name is empty".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for step in &guide.steps {
        if !seen.insert(step.sequence) {
            return Err(LoadError::InvalidGuide {
                guide: guide.name.clone(),
                reason: format!("duplicate step sequence {}", step.sequence),
            });
        }
    }

    // Stable, so the source order is irrelevant once sequences are unique.
    guide.steps.sort_by_key(|s| s.sequence);
    Ok(guide)
}

/// Best-effort name for diagnostics, before the guide has been parsed.
fn guide_label(entry: &serde_json::Value, index: usize) -> String {
    ["name", "Name"]
        .iter()
        .find_map(|key| entry.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{index}"))
}
