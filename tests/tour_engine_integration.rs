//! Integration tests for the guided-tour engine.
//!
//! Each test builds an engine against in-memory host collaborators and drives
//! it only through the signal bus, the way a host UI would.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::Receiver;
use tokio::time::timeout;

use guided_tour::config::TourConfig;
use guided_tour::host::memory::{RecordingOverlay, ResourceTable, StaticPreferences, StaticUiTree};
use guided_tour::host::{TourHost, UiHandle};
use guided_tour::tour::{
    PointerDirection, StepKind, StepType, TourEngine, TourEventBus, TourRegistry, TourSignal,
};

/// Maximum time any async test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const INTRO: &str = r#"[
    {
        "name": "Intro",
        "steps": [
            { "name": "welcome", "sequence": 0, "stepType": "Welcome",
              "stepContent": { "title": "IntroTitle", "formattedText": "IntroBody" } },
            { "name": "library", "sequence": 1, "stepType": "Tooltip",
              "hostPopupInfo": { "hostUIElementString": "libraryPanel", "popupPlacement": "Right" } },
            { "name": "canvas", "sequence": 2, "stepType": "Tooltip",
              "hostPopupInfo": { "hostUIElementString": "canvas", "popupPlacement": "Bottom" } }
        ]
    },
    {
        "name": "Feedback",
        "steps": [ { "name": "survey", "sequence": 0, "stepType": "Survey",
                     "stepContent": { "formattedText": "SurveyBody" } } ]
    },
    {
        "name": "Odd",
        "steps": [
            { "name": "hello", "sequence": 0, "stepType": "Welcome" },
            { "name": "mystery", "sequence": 1, "stepType": "Unknown" }
        ]
    }
]"#;

struct World {
    engine: TourEngine,
    bus: TourEventBus,
    overlay: Arc<RecordingOverlay>,
    preferences: Arc<StaticPreferences>,
    observer: Receiver<TourSignal>,
}

fn world(registry: TourRegistry, opt_in: bool) -> World {
    let overlay = Arc::new(RecordingOverlay::new());
    let preferences = Arc::new(StaticPreferences::new(opt_in));
    let host = TourHost {
        locator: Arc::new(
            StaticUiTree::new()
                .with_child("mainWindow", "sidebarGrid")
                .with_child("sidebarGrid", "libraryPanel")
                .with_child("mainWindow", "statusBarPanel"),
        ),
        texts: Arc::new(
            ResourceTable::new()
                .with("IntroTitle", "Welcome to the tour")
                .with("SurveyBody", "How did we do?")
                .with("SurveyRatingTitle", "Rate this guide")
                .with("ExitTourWindowContent", "Restart tours from Help"),
        ),
        preferences: preferences.clone(),
        overlay: overlay.clone(),
    };
    let bus = TourEventBus::default();
    let observer = bus.subscribe();
    let engine = TourEngine::new(TourConfig::default(), Arc::new(registry), host, bus.clone());
    World {
        engine,
        bus,
        overlay,
        preferences,
        observer,
    }
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn drain(rx: &mut Receiver<TourSignal>) -> Vec<TourSignal> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[test]
fn intro_tour_start_and_close() {
    let mut w = world(TourRegistry::from_source(INTRO).unwrap(), true);
    assert_eq!(w.engine.guide("Intro").unwrap().total_tooltips, 2);

    w.engine.launch_tour("Intro");
    w.engine.process_pending();
    assert!(w.overlay.background_visible());
    assert_eq!(w.overlay.presented(), ["welcome"]);
    assert_eq!(w.engine.current_step().unwrap().step_type(), StepType::Welcome);

    w.bus.step_closed("welcome", StepType::Welcome);
    w.engine.process_pending();

    let signals = drain(&mut w.observer);
    assert_eq!(
        signals,
        [
            TourSignal::Start { guide: "Intro".to_string() },
            TourSignal::StepClosed {
                step: "welcome".to_string(),
                step_type: StepType::Welcome,
            },
            TourSignal::Finish { guide: "Intro".to_string() },
        ]
    );
    assert_eq!(w.overlay.callouts().len(), 1);
    assert_eq!(w.overlay.callouts()[0].text, "Restart tours from Help");
    assert!(!w.overlay.background_visible());
    assert!(w.engine.active_guide().is_none());
}

#[test]
fn every_tooltip_carries_the_guide_total() {
    let w = world(TourRegistry::from_source(INTRO).unwrap(), true);
    for name in ["Intro", "Feedback", "Odd"] {
        let guide = w.engine.guide(name).unwrap();
        let counted = guide
            .steps
            .iter()
            .filter(|s| s.step_type().counts_as_tooltip())
            .count();
        assert_eq!(counted, guide.total_tooltips, "guide {name}");
        for step in &guide.steps {
            if let StepKind::Tooltip { total_tooltips, .. } = step.kind {
                assert_eq!(total_tooltips, guide.total_tooltips, "step {}", step.name);
            }
        }
    }
}

#[test]
fn unknown_tour_is_a_no_op() {
    let mut w = world(TourRegistry::from_source(INTRO).unwrap(), true);
    w.bus.start_tour("nonexistent");
    w.bus.finish_tour("nonexistent");
    w.engine.process_pending();

    assert!(!w.engine.is_active());
    assert!(!w.engine.background_visible());
    assert!(w.overlay.events().is_empty());
}

#[test]
fn missing_anchor_falls_back_to_root() {
    let w = world(TourRegistry::from_source(INTRO).unwrap(), true);
    let intro = w.engine.guide("Intro").unwrap();

    let library = &intro.steps[1].anchor;
    assert_eq!(library.handle, UiHandle::new("libraryPanel"));
    assert!(!library.is_fallback());

    let canvas = &intro.steps[2].anchor;
    assert_eq!(canvas.handle, UiHandle::new("mainWindow"));
    assert!(canvas.is_fallback());
}

#[test]
fn survey_rating_visibility_is_fixed_at_materialization() {
    let mut w = world(TourRegistry::from_source(INTRO).unwrap(), false);
    w.preferences.set_analytics_opt_in(true);

    w.engine.launch_tour("Feedback");
    w.engine.process_pending();

    let survey = w.engine.current_step().unwrap().survey().unwrap();
    assert!(!survey.is_rating_visible);
    assert_eq!(survey.rating_text_title, "How did we do?");

    // Closing a survey finishes the tour quietly.
    w.bus.step_closed("survey", StepType::Survey);
    w.engine.process_pending();
    assert!(!w.engine.is_active());
    assert!(w.overlay.callouts().is_empty());
}

#[test]
fn unsupported_steps_are_dropped() {
    let w = world(TourRegistry::from_source(INTRO).unwrap(), true);
    let odd = w.engine.guide("Odd").unwrap();
    assert_eq!(odd.len(), 1);
    assert_eq!(odd.steps[0].name, "hello");
}

#[test]
fn full_walk_with_next_and_back() {
    let mut w = world(TourRegistry::from_source(INTRO).unwrap(), true);
    w.bus.start_tour("Intro");
    w.bus.next_step("Intro");
    w.bus.next_step("Intro");
    w.bus.previous_step("Intro");
    w.bus.next_step("Intro");
    w.engine.process_pending();
    assert_eq!(w.engine.current_step().unwrap().name, "canvas");

    w.bus.next_step("Intro");
    w.engine.process_pending();
    assert!(!w.engine.is_active());
    assert_eq!(
        w.overlay.presented(),
        ["welcome", "library", "canvas", "library", "canvas"]
    );

    // Re-armed: the same tour can run again.
    w.bus.start_tour("Intro");
    w.engine.process_pending();
    assert_eq!(w.engine.active_guide(), Some("Intro"));
}

#[tokio::test]
async fn loads_pascal_case_guides_from_disk() {
    let registry = TourRegistry::from_path(&fixture("pascal_guides.json"))
        .await
        .unwrap();
    assert_eq!(registry.names(), ["GetStarted"]);

    let mut w = world(registry, true);
    let guide = w.engine.guide("GetStarted").unwrap();
    assert_eq!(guide.len(), 3);
    assert_eq!(guide.total_tooltips, 2);

    let tooltip = &guide.steps[1];
    assert_eq!(
        tooltip.kind,
        StepKind::Tooltip {
            pointer_direction: Some(PointerDirection::TopLeft),
            total_tooltips: 2,
        }
    );
    assert_eq!(tooltip.anchor.handle, UiHandle::new("sidebarGrid"));
    assert_eq!(tooltip.anchor.vertical_offset, 10.0);

    let survey = guide.steps[2].survey().unwrap();
    assert_eq!(survey.rating_text_title, "Rate this guide");
    assert!(survey.is_rating_visible);

    w.engine.launch_tour("GetStarted");
    w.engine.process_pending();
    assert!(w.engine.is_active());
}

#[tokio::test]
async fn unreadable_source_disables_tours() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guides.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let mut w = world(TourRegistry::load_or_empty(&path).await, true);
    w.engine.launch_tour("GetStarted");
    assert_eq!(w.engine.process_pending(), 1);
    assert!(!w.engine.is_active());
    assert!(w.overlay.events().is_empty());
}

#[tokio::test]
async fn spawned_engine_runs_tours_from_any_publisher() {
    let w = world(TourRegistry::from_source(INTRO).unwrap(), true);
    let World {
        engine,
        bus,
        overlay,
        mut observer,
        ..
    } = w;
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = engine.spawn(async move {
        let _ = stop_rx.await;
    });

    // A second publisher, e.g. a menu entry, holding its own bus clone.
    let menu = bus.clone();
    menu.start_tour("Intro");
    bus.step_closed("welcome", StepType::Welcome);

    let finish = timeout(TEST_TIMEOUT, async {
        loop {
            match observer.recv().await {
                Ok(TourSignal::Finish { guide }) => break guide,
                Ok(_) => continue,
                Err(e) => panic!("bus closed: {e}"),
            }
        }
    })
    .await
    .expect("finish signal within timeout");
    assert_eq!(finish, "Intro");

    stop_tx.send(()).unwrap();
    let engine = timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
    assert!(!engine.is_active());
    assert_eq!(overlay.callouts().len(), 1);
}
