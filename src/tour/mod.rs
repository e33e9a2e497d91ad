//! Guided-tour orchestration.
//!
//! Guides are loaded once into a [`TourRegistry`], materialized into
//! presentable steps by the [`StepFactory`] against the live UI, and run one
//! at a time by the [`TourEngine`] in response to signals on the
//! [`TourEventBus`].

pub mod anchor;
pub mod bus;
pub mod engine;
pub mod factory;
pub mod loader;
pub mod model;
pub mod notifier;
pub mod registry;
pub mod step;

pub use anchor::{AnchorResolver, ResolvedAnchor};
pub use bus::{TourEventBus, TourSignal};
pub use engine::{StatusWatcher, TourEngine, TourRun, TourState, TourStatus};
pub use factory::{MaterializedGuide, StepFactory};
pub use loader::{LoadOutcome, load_guides, parse_guides};
pub use model::{GuideDefinition, PointerDirection, PopupPlacement, StepDefinition, StepType};
pub use notifier::{CompletionNotifier, InfoCallout};
pub use registry::TourRegistry;
pub use step::{PresentableStep, StepKind, SurveyContent};
