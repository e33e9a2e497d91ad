use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader};

use guided_tour::config::TourConfig;
use guided_tour::host::memory::{ResourceTable, StaticPreferences, StaticUiTree};
use guided_tour::host::{OverlayHost, TourHost};
use guided_tour::tour::{
    InfoCallout, PresentableStep, StepKind, TourEngine, TourEventBus, TourRegistry,
};

/// Overlay host that draws popups as lines on stdout.
#[derive(Default)]
struct ConsoleOverlay {
    on_screen: Mutex<Option<PresentableStep>>,
}

impl ConsoleOverlay {
    /// The user closed the popup themselves.
    fn close_on_screen(&self) -> Option<PresentableStep> {
        self.on_screen.lock().ok().and_then(|mut s| s.take())
    }
}

impl OverlayHost for ConsoleOverlay {
    fn set_background_visible(&self, visible: bool) {
        println!("[overlay] background {}", if visible { "shown" } else { "hidden" });
    }

    fn present_step(&self, step: &PresentableStep) {
        let position = match &step.kind {
            StepKind::Tooltip { total_tooltips, .. } => format!(" (of {total_tooltips})"),
            StepKind::Survey(s) if s.is_rating_visible => " [rating]".to_string(),
            _ => String::new(),
        };
        println!(
            "[{}] {}{} @ {} ({:?})",
            step.step_type(),
            step.text.title,
            position,
            step.anchor.handle,
            step.anchor.placement,
        );
        if !step.text.body.is_empty() {
            println!("    {}", step.text.body);
        }
        if let Ok(mut slot) = self.on_screen.lock() {
            *slot = Some(step.clone());
        }
    }

    fn dismiss_step(&self, step: &PresentableStep) {
        println!("[overlay] dismissed {}", step.name);
        if let Ok(mut slot) = self.on_screen.lock() {
            *slot = None;
        }
    }

    fn show_callout(&self, callout: &InfoCallout) {
        let anchor = callout
            .anchor
            .as_ref()
            .map(|h| h.to_string())
            .unwrap_or_else(|| "window".to_string());
        println!("[callout @ {anchor}] {}", callout.text);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TourConfig::from_env()?;

    eprintln!("Guided Tour v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Guides: {}", config.guides_path.display());

    let registry = Arc::new(TourRegistry::load_or_empty(&config.guides_path).await);

    let texts = match &config.resources_path {
        Some(path) => ResourceTable::from_path(path).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Text resources unavailable");
            ResourceTable::new()
        }),
        None => ResourceTable::new(),
    };
    eprintln!("   Text resources: {}", texts.len());

    // Elements present in the console "window", all directly under the root.
    let mut tree = StaticUiTree::new();
    for element in &config.ui_elements {
        tree.add_child(&config.root_element, element);
    }
    tree.add_child(&config.root_element, &config.status_region);

    let overlay = Arc::new(ConsoleOverlay::default());
    let host = TourHost {
        locator: Arc::new(tree),
        texts: Arc::new(texts),
        preferences: Arc::new(StaticPreferences::new(config.analytics_opt_in)),
        overlay: overlay.clone(),
    };

    let bus = TourEventBus::new(config.bus_capacity);
    let engine = TourEngine::new(config, Arc::clone(&registry), host, bus.clone());
    let status = engine.watch_status();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let engine_handle = engine.spawn(async move {
        let _ = stop_rx.await;
    });

    eprintln!("   Tours: {}", registry.names().join(", "));
    eprintln!("   Commands: start <guide>, next, back, close, finish, list, status, /quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();

        let active = status.borrow().active_guide.clone();
        match (command, active.as_deref()) {
            ("", _) => continue,
            ("/quit", _) => break,
            ("list", _) => println!("{}", registry.names().join("\n")),
            ("start", _) if !arg.is_empty() => {
                bus.start_tour(arg);
            }
            ("next", Some(guide)) => {
                bus.next_step(guide);
            }
            ("back", Some(guide)) => {
                bus.previous_step(guide);
            }
            ("finish", Some(guide)) => {
                bus.finish_tour(guide);
            }
            ("close", _) => match overlay.close_on_screen() {
                Some(step) => {
                    bus.step_closed(&step.name, step.step_type());
                }
                None => eprintln!("No step on screen"),
            },
            ("status", _) => {
                let snapshot = status.borrow().clone();
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            ("next" | "back" | "finish", None) => eprintln!("No tour running"),
            _ => eprintln!("Unknown command: {line}"),
        }
    }

    let _ = stop_tx.send(());
    let engine = engine_handle.await?;
    tracing::info!(status = ?engine.status(), "Guided tour session ended");
    Ok(())
}
