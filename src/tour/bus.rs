//! Tour signal bus: decoupled publish/subscribe for tour lifecycle signals.
//!
//! Any part of the host UI can fire a signal without knowing the engine.
//! The engine is one subscriber among any number of others.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use super::model::StepType;

/// Default broadcast channel capacity.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// A tour lifecycle signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TourSignal {
    /// Request to start the named guide.
    Start { guide: String },
    /// The named guide is over; tear it down.
    Finish { guide: String },
    /// Move the named guide on to its next step.
    Next { guide: String },
    /// Move the named guide back one step.
    Back { guide: String },
    /// The user closed a step popup.
    StepClosed { step: String, step_type: StepType },
}

impl TourSignal {
    /// Guide the signal names, if it names one.
    pub fn guide(&self) -> Option<&str> {
        match self {
            Self::Start { guide }
            | Self::Finish { guide }
            | Self::Next { guide }
            | Self::Back { guide } => Some(guide),
            Self::StepClosed { .. } => None,
        }
    }
}

/// Broadcast bus injected into the engine and anything else that publishes.
#[derive(Debug, Clone)]
pub struct TourEventBus {
    tx: broadcast::Sender<TourSignal>,
}

impl TourEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TourSignal> {
        self.tx.subscribe()
    }

    /// Publish a signal. Returns how many subscribers will see it.
    pub fn publish(&self, signal: TourSignal) -> usize {
        match self.tx.send(signal) {
            Ok(n) => n,
            Err(broadcast::error::SendError(signal)) => {
                // Nobody listening yet
                debug!(?signal, "Tour signal dropped, no subscribers");
                0
            }
        }
    }

    pub fn start_tour(&self, guide: &str) -> usize {
        self.publish(TourSignal::Start {
            guide: guide.to_string(),
        })
    }

    pub fn finish_tour(&self, guide: &str) -> usize {
        self.publish(TourSignal::Finish {
            guide: guide.to_string(),
        })
    }

    pub fn next_step(&self, guide: &str) -> usize {
        self.publish(TourSignal::Next {
            guide: guide.to_string(),
        })
    }

    pub fn previous_step(&self, guide: &str) -> usize {
        self.publish(TourSignal::Back {
            guide: guide.to_string(),
        })
    }

    pub fn step_closed(&self, step: &str, step_type: StepType) -> usize {
        self.publish(TourSignal::StepClosed {
            step: step.to_string(),
            step_type,
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for TourEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_every_signal() {
        let bus = TourEventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.start_tour("Intro"), 2);
        bus.step_closed("welcome", StepType::Welcome);

        for rx in [&mut a, &mut b] {
            assert_eq!(
                rx.recv().await.unwrap(),
                TourSignal::Start {
                    guide: "Intro".to_string()
                }
            );
            assert_eq!(
                rx.recv().await.unwrap(),
                TourSignal::StepClosed {
                    step: "welcome".to_string(),
                    step_type: StepType::Welcome,
                }
            );
        }
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = TourEventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.finish_tour("Intro"), 0);
    }

    #[test]
    fn signals_serialize_with_type_tag() {
        let json = serde_json::to_value(TourSignal::Next {
            guide: "Intro".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "next");
        assert_eq!(json["guide"], "Intro");

        let closed: TourSignal = serde_json::from_str(
            r#"{"type": "step_closed", "step": "survey", "step_type": "SURVEY"}"#,
        )
        .unwrap();
        assert_eq!(closed.guide(), None);
        assert_eq!(
            closed,
            TourSignal::StepClosed {
                step: "survey".to_string(),
                step_type: StepType::Survey,
            }
        );
    }
}
