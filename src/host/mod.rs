//! Host seams: the UI collaborators the tour engine talks to.
//!
//! The engine never touches a real widget toolkit. It locates elements,
//! resolves text, reads preferences, and drives popups only through these
//! traits. All calls happen on the engine's single dispatch loop.

pub mod memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tour::notifier::InfoCallout;
use crate::tour::step::PresentableStep;

/// Opaque handle to a live UI element, identified by its element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UiHandle(String);

impl UiHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UiHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Searches the live UI tree.
pub trait UiTreeLocator: Send + Sync {
    /// Find a descendant of `root` named `name`.
    fn find_child(&self, root: &UiHandle, name: &str) -> Option<UiHandle>;
}

/// Maps resource keys to localized display text.
pub trait TextResolver: Send + Sync {
    /// `None` for unknown keys. Callers treat that as empty text.
    fn resolve(&self, key: &str) -> Option<String>;
}

/// User preferences read while building steps.
pub trait PreferenceStore: Send + Sync {
    fn analytics_opt_in(&self) -> bool;
}

/// Popup surface: the background overlay, step popups, and info callouts.
pub trait OverlayHost: Send + Sync {
    /// Show or hide the dimmed background shared by every step.
    fn set_background_visible(&self, visible: bool);

    fn present_step(&self, step: &PresentableStep);

    fn dismiss_step(&self, step: &PresentableStep);

    /// Show a fire-and-forget callout. The host owns it from here on.
    fn show_callout(&self, callout: &InfoCallout);
}

/// The collaborators an engine is built against.
#[derive(Clone)]
pub struct TourHost {
    pub locator: Arc<dyn UiTreeLocator>,
    pub texts: Arc<dyn TextResolver>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub overlay: Arc<dyn OverlayHost>,
}
