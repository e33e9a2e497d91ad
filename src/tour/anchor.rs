//! Anchor resolution: binds a step's symbolic host name to a live element.

use serde::Serialize;
use tracing::debug;

use crate::error::TourError;
use crate::host::{UiHandle, UiTreeLocator};

use super::model::{HostPopupInfo, PopupPlacement};

/// Where a step popup attaches. Owned by the step it was resolved for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAnchor {
    /// Name from the definition, kept even when resolution fell back.
    pub host_name: String,
    pub handle: UiHandle,
    pub placement: PopupPlacement,
    pub vertical_offset: f64,
    pub horizontal_offset: f64,
}

impl ResolvedAnchor {
    /// Whether the element was missing and the root is standing in for it.
    pub fn is_fallback(&self) -> bool {
        self.handle.name() != self.host_name
    }
}

/// Resolves element names below a fixed root container.
pub struct AnchorResolver<'a> {
    locator: &'a dyn UiTreeLocator,
    root: UiHandle,
}

impl<'a> AnchorResolver<'a> {
    pub fn new(locator: &'a dyn UiTreeLocator, root: UiHandle) -> Self {
        Self { locator, root }
    }

    pub fn root(&self) -> &UiHandle {
        &self.root
    }

    /// Find `name` under the root; the root itself stands in when it is missing.
    pub fn resolve(&self, name: &str) -> UiHandle {
        self.try_resolve(name).unwrap_or_else(|e| {
            debug!(error = %e, root = %self.root, "Anchor fallback");
            self.root.clone()
        })
    }

    /// Like [`resolve`](Self::resolve) but reports a miss instead of falling back.
    pub fn try_resolve(&self, name: &str) -> Result<UiHandle, TourError> {
        if name == self.root.name() {
            return Ok(self.root.clone());
        }
        self.locator
            .find_child(&self.root, name)
            .ok_or_else(|| TourError::AnchorUnresolved {
                name: name.to_string(),
            })
    }

    /// Resolve a step's popup anchoring metadata.
    pub fn resolve_popup(&self, info: &HostPopupInfo) -> ResolvedAnchor {
        ResolvedAnchor {
            host_name: info.host_ui_element.clone(),
            handle: self.resolve(&info.host_ui_element),
            placement: info.popup_placement,
            vertical_offset: info.vertical_popup_offset,
            horizontal_offset: info.horizontal_popup_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::StaticUiTree;

    fn tree() -> StaticUiTree {
        StaticUiTree::new()
            .with_child("mainWindow", "libraryPanel")
            .with_child("libraryPanel", "searchBox")
    }

    #[test]
    fn resolves_existing_element() {
        let tree = tree();
        let resolver = AnchorResolver::new(&tree, UiHandle::new("mainWindow"));
        assert_eq!(resolver.resolve("searchBox"), UiHandle::new("searchBox"));
    }

    #[test]
    fn missing_element_falls_back_to_root() {
        let tree = tree();
        let resolver = AnchorResolver::new(&tree, UiHandle::new("mainWindow"));
        assert_eq!(resolver.resolve("nodeAutocomplete"), UiHandle::new("mainWindow"));
        assert_eq!(resolver.resolve(""), UiHandle::new("mainWindow"));
        assert!(matches!(
            resolver.try_resolve("nodeAutocomplete"),
            Err(TourError::AnchorUnresolved { .. })
        ));
    }

    #[test]
    fn popup_anchor_keeps_placement_and_offsets() {
        let tree = tree();
        let resolver = AnchorResolver::new(&tree, UiHandle::new("mainWindow"));
        let info = HostPopupInfo {
            host_ui_element: "ghostPanel".to_string(),
            popup_placement: PopupPlacement::Right,
            vertical_popup_offset: 10.0,
            horizontal_popup_offset: 5.0,
        };

        let anchor = resolver.resolve_popup(&info);
        assert_eq!(anchor.handle, UiHandle::new("mainWindow"));
        assert!(anchor.is_fallback());
        assert_eq!(anchor.host_name, "ghostPanel");
        assert_eq!(anchor.placement, PopupPlacement::Right);
        assert_eq!(anchor.vertical_offset, 10.0);
        assert_eq!(anchor.horizontal_offset, 5.0);
    }
}
