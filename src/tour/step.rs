//! Presentable steps: definitions with anchors and text resolved.

use serde::Serialize;

use super::anchor::ResolvedAnchor;
use super::model::{PointerDirection, StepType};

/// Resolved title and body text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepText {
    pub title: String,
    pub body: String,
}

/// Survey-only fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyContent {
    /// Frozen from the analytics opt-in preference when the step was built.
    pub is_rating_visible: bool,
    pub rating_text_title: String,
    pub content_width: f64,
}

/// Survey properties that extra content entries may set. Title and body
/// text come from the step content keys and are not settable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyField {
    Name,
    RatingTextTitle,
}

impl SurveyField {
    /// Match a property name from the definition source.
    pub fn from_property(property: &str) -> Option<Self> {
        match property {
            "Name" | "name" => Some(Self::Name),
            "RatingTextTitle" | "ratingTextTitle" => Some(Self::RatingTextTitle),
            _ => None,
        }
    }
}

/// Type-specific part of a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    Welcome,
    Tooltip {
        pointer_direction: Option<PointerDirection>,
        /// Tooltip and survey steps in the owning guide.
        total_tooltips: usize,
    },
    Survey(SurveyContent),
}

/// A step ready to be shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentableStep {
    pub name: String,
    pub sequence: i32,
    pub width: f64,
    pub height: f64,
    pub anchor: ResolvedAnchor,
    pub text: StepText,
    pub kind: StepKind,
}

impl PresentableStep {
    pub fn step_type(&self) -> StepType {
        match self.kind {
            StepKind::Welcome => StepType::Welcome,
            StepKind::Tooltip { .. } => StepType::Tooltip,
            StepKind::Survey(_) => StepType::Survey,
        }
    }

    pub fn total_tooltips(&self) -> Option<usize> {
        match self.kind {
            StepKind::Tooltip { total_tooltips, .. } => Some(total_tooltips),
            _ => None,
        }
    }

    pub fn survey(&self) -> Option<&SurveyContent> {
        match &self.kind {
            StepKind::Survey(content) => Some(content),
            _ => None,
        }
    }

    /// Set one survey field. Returns `false` if this is not a survey step.
    pub fn set_survey_field(&mut self, field: SurveyField, value: String) -> bool {
        let StepKind::Survey(survey) = &mut self.kind else {
            return false;
        };
        match field {
            SurveyField::Name => self.name = value,
            SurveyField::RatingTextTitle => survey.rating_text_title = value,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::UiHandle;
    use crate::tour::model::PopupPlacement;

    fn step(kind: StepKind) -> PresentableStep {
        PresentableStep {
            name: "s".to_string(),
            sequence: 0,
            width: 0.0,
            height: 0.0,
            anchor: ResolvedAnchor {
                host_name: "root".to_string(),
                handle: UiHandle::new("root"),
                placement: PopupPlacement::Center,
                vertical_offset: 0.0,
                horizontal_offset: 0.0,
            },
            text: StepText::default(),
            kind,
        }
    }

    #[test]
    fn survey_fields_only_apply_to_surveys() {
        let mut welcome = step(StepKind::Welcome);
        assert!(!welcome.set_survey_field(SurveyField::Name, "x".to_string()));
        assert_eq!(welcome.name, "s");

        let mut survey = step(StepKind::Survey(SurveyContent {
            is_rating_visible: true,
            rating_text_title: String::new(),
            content_width: 300.0,
        }));
        assert!(survey.set_survey_field(SurveyField::RatingTextTitle, "Rate us".to_string()));
        assert!(survey.set_survey_field(SurveyField::Name, "feedback".to_string()));
        assert_eq!(survey.survey().unwrap().rating_text_title, "Rate us");
        assert_eq!(survey.name, "feedback");
        assert_eq!(survey.step_type(), StepType::Survey);
    }

    #[test]
    fn unknown_property_names_do_not_map() {
        assert_eq!(
            SurveyField::from_property("RatingTextTitle"),
            Some(SurveyField::RatingTextTitle)
        );
        assert_eq!(SurveyField::from_property("Name"), Some(SurveyField::Name));
        assert!(SurveyField::from_property("IsRatingVisible").is_none());
        // Content text is not a survey property.
        assert!(SurveyField::from_property("Title").is_none());
        assert!(SurveyField::from_property("FormattedText").is_none());
        assert!(SurveyField::from_property("Color").is_none());
    }
}
