//! Intake validation. Manual form answers and vision-model drafts both arrive as loosely
//! typed JSON and pass through [`validate`] before anything is scored or persisted.
//!
//! Unanswered ratings stay `None` all the way to storage; they are never written as `0`.

use serde::{Deserialize, Serialize};

use super::domain::{
    AmenitySet, BooleanFlag, ComodidadIntake, ContaminantSet, GeoPoint, InteresanteIntake,
    ObstructionSet, RangeError, Rating, ReportCategory, SeguridadIntake, UnknownTag,
    WalkabilityBuckets,
};

/// Rejection raised at the validation boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error(transparent)]
    UnknownTag(#[from] UnknownTag),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("unsupported photo encoding '{0}'")]
    UnsupportedPhoto(String),
    #[error("malformed photo: {0}")]
    MalformedPhoto(&'static str),
    #[error("photo is {size} bytes, limit is {max}")]
    PhotoTooLarge { size: usize, max: usize },
}

/// SEGURIDAD answers as submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSeguridad {
    pub has_sidewalk: Option<bool>,
    pub width_rating: Option<f64>,
    pub obstructions: Vec<String>,
    pub comfort_space_rating: Option<f64>,
    pub has_lighting: Option<bool>,
    pub lighting_rating: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawComodidad {
    pub shade_rating: Option<f64>,
    pub contaminants: Vec<String>,
    pub severity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInteresante {
    pub has_commerce: Option<bool>,
    pub commerce_count: Option<f64>,
    pub vibe_rating: Option<f64>,
}

/// Four-bucket questionnaire as submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawWalkabilityBuckets {
    pub amenities: Vec<String>,
    pub seguridad: RawSeguridad,
    pub comodidad: RawComodidad,
    pub interesante: RawInteresante,
}

/// Report form as submitted. SEGURIDAD answers sit at the top level to match the stored
/// record; the optional buckets are nested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawReportIntake {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address_label: Option<String>,
    pub road_name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub condition_rating: Option<f64>,
    pub safety_rating: Option<f64>,
    pub accessibility_rating: Option<f64>,
    pub severity: Option<f64>,
    #[serde(flatten)]
    pub seguridad: RawSeguridad,
    pub amenities: Option<Vec<String>>,
    pub comodidad: Option<RawComodidad>,
    pub interesante: Option<RawInteresante>,
}

/// Validated report intake, ready for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIntake {
    pub location: GeoPoint,
    pub address_label: Option<String>,
    pub road_name: Option<String>,
    pub category: ReportCategory,
    pub description: String,
    pub condition_rating: Option<Rating>,
    pub safety_rating: Option<Rating>,
    pub accessibility_rating: Option<Rating>,
    pub severity: Option<Rating>,
    pub seguridad: SeguridadIntake,
    pub utilidad: Option<AmenitySet>,
    pub comodidad: Option<ComodidadIntake>,
    pub interesante: Option<InteresanteIntake>,
}

/// Advisory completeness gates used by the form before enabling submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completeness {
    pub general: bool,
    pub seguridad: bool,
    pub missing: Vec<&'static str>,
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        self.general && self.seguridad
    }
}

impl ReportIntake {
    pub fn completeness(&self) -> Completeness {
        let mut missing = Vec::new();
        if self.condition_rating.is_none() {
            missing.push("conditionRating");
        }
        if self.accessibility_rating.is_none() {
            missing.push("accessibilityRating");
        }
        if self.severity.is_none() {
            missing.push("severity");
        }
        let general = missing.is_empty();

        let seguridad_missing = self.seguridad.missing_fields();
        let seguridad = seguridad_missing.is_empty();
        missing.extend(seguridad_missing);

        Completeness {
            general,
            seguridad,
            missing,
        }
    }
}

fn optional_rating(field: &'static str, value: Option<f64>) -> Result<Option<Rating>, RangeError> {
    value.map(|raw| Rating::checked(field, raw)).transpose()
}

fn count(field: &'static str, value: Option<f64>) -> Result<u32, RangeError> {
    match value {
        None => Ok(0),
        Some(raw) if raw.is_finite() && raw.fract() == 0.0 && raw >= 0.0 => {
            if raw > f64::from(u32::MAX) {
                Err(RangeError::Count { field, value: raw })
            } else {
                Ok(raw as u32)
            }
        }
        Some(raw) => Err(RangeError::Count { field, value: raw }),
    }
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub fn validate_seguridad(raw: RawSeguridad) -> Result<SeguridadIntake, ValidationError> {
    Ok(SeguridadIntake {
        has_sidewalk: BooleanFlag::from(raw.has_sidewalk),
        width_rating: optional_rating("widthRating", raw.width_rating)?,
        obstructions: ObstructionSet::parse(&raw.obstructions)?,
        comfort_space_rating: optional_rating("comfortSpaceRating", raw.comfort_space_rating)?,
        has_lighting: BooleanFlag::from(raw.has_lighting),
        lighting_rating: optional_rating("lightingRating", raw.lighting_rating)?,
    })
}

pub fn validate_comodidad(raw: RawComodidad) -> Result<ComodidadIntake, ValidationError> {
    let severity = raw
        .severity
        .ok_or(ValidationError::MissingField("comodidad.severity"))?;
    Ok(ComodidadIntake {
        shade_rating: optional_rating("comodidad.shadeRating", raw.shade_rating)?,
        contaminants: ContaminantSet::parse(&raw.contaminants)?,
        severity: Rating::checked("comodidad.severity", severity)?,
    })
}

pub fn validate_interesante(raw: RawInteresante) -> Result<InteresanteIntake, ValidationError> {
    Ok(InteresanteIntake {
        has_commerce: BooleanFlag::from(raw.has_commerce),
        commerce_count: count("interesante.commerceCount", raw.commerce_count)?,
        vibe_rating: optional_rating("interesante.vibeRating", raw.vibe_rating)?,
    })
}

/// Validate the standalone four-bucket questionnaire.
pub fn validate_buckets(raw: RawWalkabilityBuckets) -> Result<WalkabilityBuckets, ValidationError> {
    Ok(WalkabilityBuckets {
        utilidad: AmenitySet::parse(&raw.amenities)?,
        seguridad: validate_seguridad(raw.seguridad)?,
        comodidad: validate_comodidad(raw.comodidad)?,
        interesante: validate_interesante(raw.interesante)?,
    })
}

/// Validate a report submission. Location, category, and description are hard
/// requirements; every supplied rating must be in range. Missing ratings are allowed and
/// surface through [`ReportIntake::completeness`].
pub fn validate(raw: RawReportIntake) -> Result<ReportIntake, ValidationError> {
    let lat = raw.lat.ok_or(ValidationError::MissingField("lat"))?;
    let lng = raw.lng.ok_or(ValidationError::MissingField("lng"))?;
    let location = GeoPoint::new(lat, lng)?;

    let category = required_text("category", raw.category)?.parse::<ReportCategory>()?;
    let description = required_text("description", raw.description)?;

    Ok(ReportIntake {
        location,
        address_label: optional_text(raw.address_label),
        road_name: optional_text(raw.road_name),
        category,
        description,
        condition_rating: optional_rating("conditionRating", raw.condition_rating)?,
        safety_rating: optional_rating("safetyRating", raw.safety_rating)?,
        accessibility_rating: optional_rating("accessibilityRating", raw.accessibility_rating)?,
        severity: optional_rating("severity", raw.severity)?,
        seguridad: validate_seguridad(raw.seguridad)?,
        utilidad: raw
            .amenities
            .map(|amenities| AmenitySet::parse(&amenities))
            .transpose()?,
        comodidad: raw.comodidad.map(validate_comodidad).transpose()?,
        interesante: raw.interesante.map(validate_interesante).transpose()?,
    })
}
