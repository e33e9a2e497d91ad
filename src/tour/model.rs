//! Tour definition model: the immutable data read from the guides source.
//!
//! Field names follow the camelCase layout of the definition format; the
//! PascalCase spelling used by older guide files is accepted as an alias.
//! Enumerated values are matched case-insensitively, ignoring `_` and `-`.

use serde::{Deserialize, Serialize};

/// Lowercase and strip separators so `BOTTOM_LEFT`, `bottomLeft` and
/// `bottom-left` all compare equal.
fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Kind of a tour step.
///
/// Unrecognized names do not fail parsing; they are kept as `Unsupported`
/// and the step is dropped when the guide is materialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepType {
    Welcome,
    Tooltip,
    Survey,
    Unsupported(String),
}

impl StepType {
    /// Whether this step counts towards the "step X of N" total.
    pub fn counts_as_tooltip(&self) -> bool {
        matches!(self, Self::Tooltip | Self::Survey)
    }

    pub fn is_survey(&self) -> bool {
        matches!(self, Self::Survey)
    }
}

impl From<String> for StepType {
    fn from(raw: String) -> Self {
        match normalize(&raw).as_str() {
            "welcome" => Self::Welcome,
            "tooltip" => Self::Tooltip,
            "survey" => Self::Survey,
            _ => Self::Unsupported(raw),
        }
    }
}

impl From<StepType> for String {
    fn from(step_type: StepType) -> Self {
        step_type.to_string()
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Welcome => write!(f, "welcome"),
            Self::Tooltip => write!(f, "tooltip"),
            Self::Survey => write!(f, "survey"),
            Self::Unsupported(raw) => write!(f, "{raw}"),
        }
    }
}

/// Where a popup is placed relative to its host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum PopupPlacement {
    Top,
    Bottom,
    Left,
    Right,
    #[default]
    Center,
    Absolute,
    AbsolutePoint,
    Relative,
    RelativePoint,
    Mouse,
    MousePoint,
    Custom,
}

impl TryFrom<String> for PopupPlacement {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match normalize(&raw).as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "center" | "centre" => Ok(Self::Center),
            "absolute" => Ok(Self::Absolute),
            "absolutepoint" => Ok(Self::AbsolutePoint),
            "relative" => Ok(Self::Relative),
            "relativepoint" => Ok(Self::RelativePoint),
            "mouse" => Ok(Self::Mouse),
            "mousepoint" => Ok(Self::MousePoint),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("unknown popup placement {raw:?}")),
        }
    }
}

/// Which corner or edge of a tooltip the pointer arrow is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum PointerDirection {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Left,
    Right,
}

impl TryFrom<String> for PointerDirection {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        match normalize(&raw).as_str() {
            "topleft" => Ok(Self::TopLeft),
            "topright" => Ok(Self::TopRight),
            "bottomleft" => Ok(Self::BottomLeft),
            "bottomright" => Ok(Self::BottomRight),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(format!("unknown tooltip pointer direction {raw:?}")),
        }
    }
}

/// Anchoring metadata: which host element a popup attaches to and how.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPopupInfo {
    #[serde(rename = "hostUIElementString", alias = "HostUIElementString", default)]
    pub host_ui_element: String,
    #[serde(alias = "PopupPlacement", default)]
    pub popup_placement: PopupPlacement,
    #[serde(alias = "VerticalPopupOffset", default)]
    pub vertical_popup_offset: f64,
    #[serde(alias = "HorizontalPopupOffset", default)]
    pub horizontal_popup_offset: f64,
}

/// Resource keys for the text a step displays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepContent {
    /// Key of the body text.
    #[serde(alias = "FormattedText", default)]
    pub formatted_text: String,
    /// Key of the title text.
    #[serde(alias = "Title", default)]
    pub title: String,
}

/// One `(property, resource key)` pair applied to survey steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraContent {
    #[serde(alias = "Property")]
    pub property: String,
    #[serde(alias = "Value")]
    pub value: String,
}

/// A single step as written in the definition source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    #[serde(alias = "Name", default)]
    pub name: String,
    #[serde(alias = "Sequence")]
    pub sequence: i32,
    #[serde(alias = "StepType")]
    pub step_type: StepType,
    #[serde(alias = "Width", default)]
    pub width: f64,
    #[serde(alias = "Height", default)]
    pub height: f64,
    #[serde(
        alias = "TooltipPointerDirection",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tooltip_pointer_direction: Option<PointerDirection>,
    #[serde(alias = "HostPopupInfo", default)]
    pub host_popup_info: HostPopupInfo,
    #[serde(alias = "StepContent", default)]
    pub step_content: StepContent,
    /// Only honoured for survey steps.
    #[serde(
        rename = "stepExtraContent",
        alias = "StepExtraContent",
        alias = "extraProperties",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extra_content: Vec<ExtraContent>,
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideDefinition {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "GuideSteps", alias = "guideSteps", default)]
    pub steps: Vec<StepDefinition>,
}

impl GuideDefinition {
    /// Number of tooltip and survey steps, i.e. the N in "step X of N".
    pub fn total_tooltips(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.step_type.counts_as_tooltip())
            .count()
    }
}
