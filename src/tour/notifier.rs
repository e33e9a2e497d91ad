//! Completion notifier: reacts to a step closure that ends the tour.
//!
//! Publishes the finish signal for the owning guide and, unless the step was
//! a survey, pops an "exit tour" callout near the status region.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::TourConfig;
use crate::host::{TourHost, UiHandle};

use super::anchor::AnchorResolver;
use super::bus::TourEventBus;
use super::model::{PopupPlacement, StepType};

/// A short-lived informational popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoCallout {
    pub text: String,
    /// `None` shows the callout unanchored, centered on the window.
    pub anchor: Option<UiHandle>,
    pub placement: PopupPlacement,
    pub vertical_offset: f64,
    pub horizontal_offset: f64,
}

/// Ends a tour when one of its steps is closed.
pub struct CompletionNotifier {
    bus: TourEventBus,
    host: TourHost,
    root: UiHandle,
    status_region: String,
    text_key: String,
    vertical_offset: f64,
    horizontal_offset: f64,
}

impl CompletionNotifier {
    pub fn new(config: &TourConfig, bus: TourEventBus, host: TourHost) -> Self {
        Self {
            bus,
            host,
            root: UiHandle::new(config.root_element.as_str()),
            status_region: config.status_region.clone(),
            text_key: config.exit_tour_text_key.clone(),
            vertical_offset: config.exit_tour_vertical_offset,
            horizontal_offset: config.exit_tour_horizontal_offset,
        }
    }

    /// A step of `guide` was closed and the tour ends with it.
    pub fn step_closed(&self, guide: &str, step: &str, step_type: &StepType) {
        info!(guide, step, %step_type, "Step closed, finishing tour");
        self.bus.finish_tour(guide);

        if !step_type.is_survey() {
            let callout = self.exit_callout();
            self.host.overlay.show_callout(&callout);
        }
    }

    /// Build the exit-tour callout.
    pub fn exit_callout(&self) -> InfoCallout {
        let anchors = AnchorResolver::new(self.host.locator.as_ref(), self.root.clone());
        let anchor = match anchors.try_resolve(&self.status_region) {
            Ok(handle) => Some(handle),
            Err(e) => {
                debug!(error = %e, "Exit-tour callout shown unanchored");
                None
            }
        };

        InfoCallout {
            text: self.host.texts.resolve(&self.text_key).unwrap_or_default(),
            anchor,
            placement: PopupPlacement::Center,
            vertical_offset: self.vertical_offset,
            horizontal_offset: self.horizontal_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::host::memory::{
        RecordingOverlay, ResourceTable, StaticPreferences, StaticUiTree,
    };
    use crate::tour::bus::TourSignal;

    fn notifier(tree: StaticUiTree) -> (CompletionNotifier, Arc<RecordingOverlay>, TourEventBus) {
        let overlay = Arc::new(RecordingOverlay::new());
        let host = TourHost {
            locator: Arc::new(tree),
            texts: Arc::new(
                ResourceTable::new().with("ExitTourWindowContent", "Reopen tours from Help"),
            ),
            preferences: Arc::new(StaticPreferences::new(false)),
            overlay: overlay.clone(),
        };
        let bus = TourEventBus::default();
        (
            CompletionNotifier::new(&TourConfig::default(), bus.clone(), host),
            overlay,
            bus,
        )
    }

    #[tokio::test]
    async fn closing_a_tooltip_finishes_and_shows_callout() {
        let tree = StaticUiTree::new().with_child("mainWindow", "statusBarPanel");
        let (notifier, overlay, bus) = notifier(tree);
        let mut rx = bus.subscribe();

        notifier.step_closed("Intro", "library", &StepType::Tooltip);

        assert_eq!(
            rx.recv().await.unwrap(),
            TourSignal::Finish {
                guide: "Intro".to_string()
            }
        );
        let callouts = overlay.callouts();
        assert_eq!(callouts.len(), 1);
        assert_eq!(callouts[0].text, "Reopen tours from Help");
        assert_eq!(callouts[0].anchor, Some(UiHandle::new("statusBarPanel")));
        assert_eq!(callouts[0].placement, PopupPlacement::Center);
        assert_eq!(callouts[0].vertical_offset, 30.0);
        assert_eq!(callouts[0].horizontal_offset, 0.0);
    }

    #[tokio::test]
    async fn closing_a_survey_skips_callout() {
        let (notifier, overlay, bus) = notifier(StaticUiTree::new());
        let mut rx = bus.subscribe();

        notifier.step_closed("Feedback", "survey", &StepType::Survey);

        assert!(matches!(rx.recv().await.unwrap(), TourSignal::Finish { .. }));
        assert!(overlay.callouts().is_empty());
    }

    #[test]
    fn missing_status_region_leaves_callout_unanchored() {
        let (notifier, _overlay, _bus) = notifier(StaticUiTree::new());
        assert_eq!(notifier.exit_callout().anchor, None);
    }
}
