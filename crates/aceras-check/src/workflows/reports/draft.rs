//! Vision-model drafts and their reconciliation with reporter edits.
//!
//! The model output is untrusted: it is parsed from loose JSON, range-checked with the
//! same rules as manual intake, and only then offered to the reporter for review. Whether
//! the reporter changed anything is decided by comparing fields against the snapshot taken
//! when review started.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{
    BooleanFlag, GeoPoint, Obstruction, ObstructionSet, RangeError, Rating, ReportCategory,
    UnknownTag,
};
use super::intake::{RawReportIntake, RawSeguridad, ValidationError};

/// Ratings at or below this value count as a reported problem when inferring a category.
const LOW_RATING: u8 = 2;

/// Model confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Result<Self, RangeError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RangeError::Confidence(value))
        }
    }

    pub const fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = RangeError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidewalkWidth {
    Narrow,
    Adequate,
    Wide,
}

impl FromStr for SidewalkWidth {
    type Err = UnknownTag;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "narrow" => Ok(SidewalkWidth::Narrow),
            "adequate" => Ok(SidewalkWidth::Adequate),
            "wide" => Ok(SidewalkWidth::Wide),
            _ => Err(UnknownTag {
                kind: "sidewalk width",
                tag: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Good,
    Acceptable,
    Poor,
}

impl FromStr for ImageQuality {
    type Err = UnknownTag;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(ImageQuality::Good),
            "acceptable" => Ok(ImageQuality::Acceptable),
            "poor" => Ok(ImageQuality::Poor),
            _ => Err(UnknownTag {
                kind: "image quality",
                tag: raw.to_string(),
            }),
        }
    }
}

/// Vision-model output as received, before any checks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSidewalkAnalysis {
    pub confidence: Option<f64>,
    pub sidewalk_visible: Option<bool>,
    pub has_sidewalk: Option<bool>,
    pub sidewalk_width: Option<String>,
    pub width_rating: Option<f64>,
    pub obstructions: Vec<String>,
    pub has_lighting: Option<bool>,
    pub lighting_rating: Option<f64>,
    pub condition_rating: Option<f64>,
    pub safety_rating: Option<f64>,
    pub accessibility_rating: Option<f64>,
    pub description: Option<String>,
    pub detected_issues: Vec<String>,
    pub image_quality: Option<String>,
    pub quality_issues: Vec<String>,
    pub retake_recommended: Option<bool>,
}

/// Range-checked sidewalk analysis, either as drafted by the model or as edited by the
/// reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidewalkAnalysis {
    pub confidence: Confidence,
    pub sidewalk_visible: bool,
    pub has_sidewalk: BooleanFlag,
    pub sidewalk_width: Option<SidewalkWidth>,
    pub width_rating: Option<Rating>,
    #[serde(default)]
    pub obstructions: ObstructionSet,
    pub has_lighting: BooleanFlag,
    pub lighting_rating: Option<Rating>,
    pub condition_rating: Option<Rating>,
    pub safety_rating: Option<Rating>,
    pub accessibility_rating: Option<Rating>,
    pub description: String,
    #[serde(default)]
    pub detected_issues: Vec<String>,
    pub image_quality: ImageQuality,
    #[serde(default)]
    pub quality_issues: Vec<String>,
    #[serde(default)]
    pub retake_recommended: bool,
}

/// Failure to turn a model payload into a [`SidewalkAnalysis`].
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("malformed analysis payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

fn rating(field: &'static str, value: Option<f64>) -> Result<Option<Rating>, ValidationError> {
    Ok(value.map(|raw| Rating::checked(field, raw)).transpose()?)
}

impl SidewalkAnalysis {
    /// Parse untyped model output. `confidence`, `description`, and `imageQuality` are
    /// required; everything else may be absent.
    pub fn from_payload(payload: Value) -> Result<Self, DraftError> {
        let raw: RawSidewalkAnalysis = serde_json::from_value(payload)?;
        Ok(Self::try_from(raw)?)
    }
}

impl TryFrom<RawSidewalkAnalysis> for SidewalkAnalysis {
    type Error = ValidationError;

    fn try_from(raw: RawSidewalkAnalysis) -> Result<Self, Self::Error> {
        let confidence = raw
            .confidence
            .ok_or(ValidationError::MissingField("confidence"))?;
        let description = raw
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ValidationError::MissingField("description"))?;
        let image_quality = raw
            .image_quality
            .ok_or(ValidationError::MissingField("imageQuality"))?
            .parse::<ImageQuality>()?;

        Ok(Self {
            confidence: Confidence::new(confidence)?,
            sidewalk_visible: raw.sidewalk_visible.unwrap_or(false),
            has_sidewalk: BooleanFlag::from(raw.has_sidewalk),
            sidewalk_width: raw
                .sidewalk_width
                .map(|width| width.parse::<SidewalkWidth>())
                .transpose()?,
            width_rating: rating("widthRating", raw.width_rating)?,
            obstructions: ObstructionSet::parse(&raw.obstructions)?,
            has_lighting: BooleanFlag::from(raw.has_lighting),
            lighting_rating: rating("lightingRating", raw.lighting_rating)?,
            condition_rating: rating("conditionRating", raw.condition_rating)?,
            safety_rating: rating("safetyRating", raw.safety_rating)?,
            accessibility_rating: rating("accessibilityRating", raw.accessibility_rating)?,
            description,
            detected_issues: raw.detected_issues,
            image_quality,
            quality_issues: raw.quality_issues,
            retake_recommended: raw.retake_recommended.unwrap_or(false),
        })
    }
}

/// Fields of a [`SidewalkAnalysis`] compared during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    Confidence,
    SidewalkVisible,
    HasSidewalk,
    SidewalkWidth,
    WidthRating,
    Obstructions,
    HasLighting,
    LightingRating,
    ConditionRating,
    SafetyRating,
    AccessibilityRating,
    Description,
    DetectedIssues,
    ImageQuality,
    QualityIssues,
    RetakeRecommended,
}

impl DraftField {
    pub const fn label(self) -> &'static str {
        match self {
            DraftField::Confidence => "confidence",
            DraftField::SidewalkVisible => "sidewalkVisible",
            DraftField::HasSidewalk => "hasSidewalk",
            DraftField::SidewalkWidth => "sidewalkWidth",
            DraftField::WidthRating => "widthRating",
            DraftField::Obstructions => "obstructions",
            DraftField::HasLighting => "hasLighting",
            DraftField::LightingRating => "lightingRating",
            DraftField::ConditionRating => "conditionRating",
            DraftField::SafetyRating => "safetyRating",
            DraftField::AccessibilityRating => "accessibilityRating",
            DraftField::Description => "description",
            DraftField::DetectedIssues => "detectedIssues",
            DraftField::ImageQuality => "imageQuality",
            DraftField::QualityIssues => "qualityIssues",
            DraftField::RetakeRecommended => "retakeRecommended",
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Field-by-field diff, in declaration order.
pub fn changed_fields(draft: &SidewalkAnalysis, edited: &SidewalkAnalysis) -> Vec<DraftField> {
    let checks = [
        (DraftField::Confidence, draft.confidence != edited.confidence),
        (
            DraftField::SidewalkVisible,
            draft.sidewalk_visible != edited.sidewalk_visible,
        ),
        (DraftField::HasSidewalk, draft.has_sidewalk != edited.has_sidewalk),
        (
            DraftField::SidewalkWidth,
            draft.sidewalk_width != edited.sidewalk_width,
        ),
        (DraftField::WidthRating, draft.width_rating != edited.width_rating),
        (DraftField::Obstructions, draft.obstructions != edited.obstructions),
        (DraftField::HasLighting, draft.has_lighting != edited.has_lighting),
        (
            DraftField::LightingRating,
            draft.lighting_rating != edited.lighting_rating,
        ),
        (
            DraftField::ConditionRating,
            draft.condition_rating != edited.condition_rating,
        ),
        (DraftField::SafetyRating, draft.safety_rating != edited.safety_rating),
        (
            DraftField::AccessibilityRating,
            draft.accessibility_rating != edited.accessibility_rating,
        ),
        (DraftField::Description, draft.description != edited.description),
        (
            DraftField::DetectedIssues,
            draft.detected_issues != edited.detected_issues,
        ),
        (DraftField::ImageQuality, draft.image_quality != edited.image_quality),
        (
            DraftField::QualityIssues,
            draft.quality_issues != edited.quality_issues,
        ),
        (
            DraftField::RetakeRecommended,
            draft.retake_recommended != edited.retake_recommended,
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(field, changed)| changed.then_some(field))
        .collect()
}

/// Result of merging a model draft with the reporter's corrections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub analysis: SidewalkAnalysis,
    pub user_modified: bool,
    pub modified_fields: Vec<DraftField>,
}

/// Compare the reporter's final analysis against the draft they were shown.
pub fn reconcile(draft: &SidewalkAnalysis, edited: SidewalkAnalysis) -> Reconciliation {
    let modified_fields = changed_fields(draft, &edited);
    Reconciliation {
        user_modified: !modified_fields.is_empty(),
        modified_fields,
        analysis: edited,
    }
}

impl Reconciliation {
    /// Forward the reconciled analysis into manual-intake shape so it goes through the
    /// same validation. Without an explicit category one is inferred from the analysis.
    pub fn into_raw_intake(
        self,
        location: GeoPoint,
        address_label: Option<String>,
        road_name: Option<String>,
        category: Option<ReportCategory>,
    ) -> RawReportIntake {
        let analysis = self.analysis;
        let category = category.unwrap_or_else(|| infer_category(&analysis));
        let as_f64 = |rating: Option<Rating>| rating.map(|rating| f64::from(rating.value()));

        RawReportIntake {
            lat: Some(location.lat()),
            lng: Some(location.lng()),
            address_label,
            road_name,
            category: Some(category.tag().to_string()),
            description: Some(analysis.description),
            condition_rating: as_f64(analysis.condition_rating),
            safety_rating: as_f64(analysis.safety_rating),
            accessibility_rating: as_f64(analysis.accessibility_rating),
            severity: None,
            seguridad: RawSeguridad {
                has_sidewalk: analysis.has_sidewalk.into(),
                width_rating: as_f64(analysis.width_rating),
                obstructions: analysis
                    .obstructions
                    .iter()
                    .map(|obstruction| obstruction.tag().to_string())
                    .collect(),
                comfort_space_rating: None,
                has_lighting: analysis.has_lighting.into(),
                lighting_rating: as_f64(analysis.lighting_rating),
            },
            amenities: None,
            comodidad: None,
            interesante: None,
        }
    }
}

fn is_low(rating: Option<Rating>) -> bool {
    rating.is_some_and(|rating| rating.value() <= LOW_RATING)
}

/// Pick the most specific category the analysis supports.
pub fn infer_category(analysis: &SidewalkAnalysis) -> ReportCategory {
    if analysis.has_sidewalk == BooleanFlag::No {
        return ReportCategory::MissingSidewalk;
    }

    let obstruction_category = analysis.obstructions.iter().find_map(|obstruction| {
        match obstruction {
            Obstruction::CarrosMalEstacionados => Some(ReportCategory::ObstructionVehicle),
            Obstruction::Vendedores => Some(ReportCategory::ObstructionVendor),
            Obstruction::Construccion => Some(ReportCategory::ObstructionConstruction),
            Obstruction::Negocios => Some(ReportCategory::ObstructionBusiness),
            _ => None,
        }
    });
    if let Some(category) = obstruction_category {
        return category;
    }

    if is_low(analysis.condition_rating) || analysis.obstructions.contains(&Obstruction::Huecos) {
        ReportCategory::BrokenPavement
    } else if is_low(analysis.width_rating)
        || analysis.sidewalk_width == Some(SidewalkWidth::Narrow)
    {
        ReportCategory::NarrowSidewalk
    } else if analysis.has_lighting == BooleanFlag::No || is_low(analysis.lighting_rating) {
        ReportCategory::PoorLighting
    } else if is_low(analysis.accessibility_rating) {
        ReportCategory::AccessibilityIssue
    } else if is_low(analysis.safety_rating) {
        ReportCategory::SafetyConcern
    } else {
        ReportCategory::PositiveFeedback
    }
}

/// Review of a single draft. The snapshot is frozen when review starts; edits only touch
/// the working copy.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    snapshot: SidewalkAnalysis,
    working: SidewalkAnalysis,
}

impl ReviewSession {
    pub fn begin(draft: SidewalkAnalysis) -> Self {
        Self {
            working: draft.clone(),
            snapshot: draft,
        }
    }

    pub fn snapshot(&self) -> &SidewalkAnalysis {
        &self.snapshot
    }

    pub fn working(&self) -> &SidewalkAnalysis {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut SidewalkAnalysis {
        &mut self.working
    }

    pub fn finish(self) -> Reconciliation {
        reconcile(&self.snapshot, self.working)
    }
}
