//! Step factory: turns step definitions into presentable steps.

use tracing::{debug, warn};

use crate::error::TourError;
use crate::host::{PreferenceStore, TextResolver};

use super::anchor::{AnchorResolver, ResolvedAnchor};
use super::model::{ExtraContent, GuideDefinition, StepDefinition, StepType};
use super::step::{PresentableStep, StepKind, StepText, SurveyContent, SurveyField};

/// A guide with every supported step materialized, in presentation order.
#[derive(Debug, Clone)]
pub struct MaterializedGuide {
    pub name: String,
    pub steps: Vec<PresentableStep>,
    pub total_tooltips: usize,
}

impl MaterializedGuide {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Builds [`PresentableStep`]s from definitions, resolving text through the
/// host and freezing preference-dependent fields at build time.
pub struct StepFactory<'a> {
    texts: &'a dyn TextResolver,
    preferences: &'a dyn PreferenceStore,
    survey_content_width: f64,
}

impl<'a> StepFactory<'a> {
    pub fn new(
        texts: &'a dyn TextResolver,
        preferences: &'a dyn PreferenceStore,
        survey_content_width: f64,
    ) -> Self {
        Self {
            texts,
            preferences,
            survey_content_width,
        }
    }

    /// Materialize every step of `guide`. Steps of unsupported types are dropped.
    pub fn materialize_guide(
        &self,
        guide: &GuideDefinition,
        anchors: &AnchorResolver<'_>,
    ) -> MaterializedGuide {
        // Counted up front so every tooltip carries the same total.
        let total_tooltips = guide.total_tooltips();

        let steps = guide
            .steps
            .iter()
            .filter_map(|def| {
                let anchor = anchors.resolve_popup(&def.host_popup_info);
                self.materialize(def, anchor, total_tooltips)
            })
            .collect();

        MaterializedGuide {
            name: guide.name.clone(),
            steps,
            total_tooltips,
        }
    }

    /// Build one step, or `None` when its type is not supported.
    pub fn materialize(
        &self,
        def: &StepDefinition,
        anchor: ResolvedAnchor,
        total_tooltips: usize,
    ) -> Option<PresentableStep> {
        let text = StepText {
            title: self.text(&def.step_content.title),
            body: self.text(&def.step_content.formatted_text),
        };

        let kind = match &def.step_type {
            StepType::Welcome => StepKind::Welcome,
            StepType::Tooltip => StepKind::Tooltip {
                pointer_direction: def.tooltip_pointer_direction,
                total_tooltips,
            },
            StepType::Survey => StepKind::Survey(SurveyContent {
                is_rating_visible: self.preferences.analytics_opt_in(),
                rating_text_title: text.body.clone(),
                content_width: self.survey_content_width,
            }),
            StepType::Unsupported(raw) => {
                let e = TourError::UnsupportedStepType {
                    step: def.name.clone(),
                    step_type: raw.clone(),
                };
                warn!(error = %e, "Dropping step");
                return None;
            }
        };

        let mut step = PresentableStep {
            name: def.name.clone(),
            sequence: def.sequence,
            width: def.width,
            height: def.height,
            anchor,
            text,
            kind,
        };

        if def.step_type.is_survey() {
            self.apply_extra_content(&mut step, &def.extra_content);
        }

        Some(step)
    }

    /// Assign survey fields from resolved resource text. Unknown property
    /// names are skipped.
    pub fn apply_extra_content(&self, step: &mut PresentableStep, extras: &[ExtraContent]) {
        for extra in extras {
            let Some(field) = SurveyField::from_property(&extra.property) else {
                let e = TourError::UnknownSurveyProperty {
                    property: extra.property.clone(),
                };
                debug!(step = %step.name, error = %e, "Skipping extra content");
                continue;
            };
            step.set_survey_field(field, self.text(&extra.value));
        }
    }

    fn text(&self, key: &str) -> String {
        if key.is_empty() {
            return String::new();
        }
        self.texts.resolve(key).unwrap_or_else(|| {
            debug!(key, "Missing text resource");
            String::new()
        })
    }
}
