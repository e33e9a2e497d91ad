//! In-memory host collaborators, used by the console driver and in tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::LoadError;
use crate::tour::notifier::InfoCallout;
use crate::tour::step::PresentableStep;

use super::{OverlayHost, PreferenceStore, TextResolver, UiHandle, UiTreeLocator};

/// A static UI tree described as parent → children edges.
#[derive(Debug, Default, Clone)]
pub struct StaticUiTree {
    children: HashMap<String, Vec<String>>,
}

impl StaticUiTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `child` under `parent`.
    pub fn with_child(mut self, parent: &str, child: &str) -> Self {
        self.add_child(parent, child);
        self
    }

    pub fn add_child(&mut self, parent: &str, child: &str) {
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
    }
}

impl UiTreeLocator for StaticUiTree {
    fn find_child(&self, root: &UiHandle, name: &str) -> Option<UiHandle> {
        let mut queue: VecDeque<&str> = VecDeque::from([root.name()]);
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(parent) = queue.pop_front() {
            if !visited.insert(parent) {
                continue;
            }
            for child in self.children.get(parent).into_iter().flatten() {
                if child == name {
                    return Some(UiHandle::new(child.as_str()));
                }
                queue.push_back(child);
            }
        }
        None
    }
}

/// Flat key → text table.
#[derive(Debug, Default, Clone)]
pub struct ResourceTable {
    entries: HashMap<String, String>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, text: &str) -> Self {
        self.entries.insert(key.to_string(), text.to_string());
        self
    }

    /// Parse a JSON object of string values.
    pub fn from_json_str(source: &str) -> Result<Self, LoadError> {
        let entries: HashMap<String, String> = serde_json::from_str(source)?;
        Ok(Self { entries })
    }

    pub async fn from_path(path: &Path) -> Result<Self, LoadError> {
        let source = match tokio::fs::read_to_string(path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::ResourceNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(LoadError::Io(e)),
        };
        Self::from_json_str(&source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TextResolver for ResourceTable {
    fn resolve(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

/// Preferences held in memory. The flag can change at any time.
#[derive(Debug, Default)]
pub struct StaticPreferences {
    analytics_opt_in: AtomicBool,
}

impl StaticPreferences {
    pub fn new(analytics_opt_in: bool) -> Self {
        Self {
            analytics_opt_in: AtomicBool::new(analytics_opt_in),
        }
    }

    pub fn set_analytics_opt_in(&self, value: bool) {
        self.analytics_opt_in.store(value, Ordering::Relaxed);
    }
}

impl PreferenceStore for StaticPreferences {
    fn analytics_opt_in(&self) -> bool {
        self.analytics_opt_in.load(Ordering::Relaxed)
    }
}

/// Something the engine asked the overlay host to do.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    Background(bool),
    Presented(String),
    Dismissed(String),
    Callout(InfoCallout),
}

/// Overlay host that records every call.
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    events: Mutex<Vec<OverlayEvent>>,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OverlayEvent> {
        self.lock().clone()
    }

    /// Last background visibility set, `false` if never touched.
    pub fn background_visible(&self) -> bool {
        self.lock()
            .iter()
            .rev()
            .find_map(|e| match e {
                OverlayEvent::Background(visible) => Some(*visible),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Names of presented steps, in order.
    pub fn presented(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                OverlayEvent::Presented(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn callouts(&self) -> Vec<InfoCallout> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                OverlayEvent::Callout(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<OverlayEvent>> {
        // A panic while recording leaves the log usable.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, event: OverlayEvent) {
        self.lock().push(event);
    }
}

impl OverlayHost for RecordingOverlay {
    fn set_background_visible(&self, visible: bool) {
        self.record(OverlayEvent::Background(visible));
    }

    fn present_step(&self, step: &PresentableStep) {
        self.record(OverlayEvent::Presented(step.name.clone()));
    }

    fn dismiss_step(&self, step: &PresentableStep) {
        self.record(OverlayEvent::Dismissed(step.name.clone()));
    }

    fn show_callout(&self, callout: &InfoCallout) {
        self.record(OverlayEvent::Callout(callout.clone()));
    }
}
