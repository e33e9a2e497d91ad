//! Guided Tour: declarative multi-step onboarding tours driven by signals.

pub mod config;
pub mod error;
pub mod host;
pub mod tour;
