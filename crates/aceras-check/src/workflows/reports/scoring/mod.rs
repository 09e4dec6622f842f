//! Walkability rubric. Every scorer here is pure and total: given range-checked intake it
//! cannot fail, so all error handling lives in [`super::intake`].

pub(crate) mod rules;

use serde::{Deserialize, Serialize};

use super::domain::{
    AmenitySet, ComodidadIntake, InteresanteIntake, Rating, SeguridadIntake, WalkabilityBuckets,
};
use super::intake::ReportIntake;
use rules::{MAX_COMODIDAD, MAX_INTERESANTE, MAX_SEGURIDAD, MAX_TOTAL, MAX_UTILIDAD};

/// One of the four independently capped scoring categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Utilidad,
    Seguridad,
    Comodidad,
    Interesante,
}

impl Bucket {
    pub const fn max_points(self) -> f64 {
        match self {
            Bucket::Utilidad => MAX_UTILIDAD,
            Bucket::Seguridad => MAX_SEGURIDAD,
            Bucket::Comodidad => MAX_COMODIDAD,
            Bucket::Interesante => MAX_INTERESANTE,
        }
    }
}

/// Individual rubric terms, so a score can be explained line by line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Amenities,
    Sidewalk,
    Width,
    Obstructions,
    ComfortSpace,
    Lighting,
    Shade,
    Contamination,
    Commerce,
    Vibe,
}

/// Discrete contribution to a bucket score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub bucket: Bucket,
    pub factor: ScoreFactor,
    pub points: f64,
    pub notes: String,
}

impl ScoreComponent {
    fn new(bucket: Bucket, factor: ScoreFactor, points: f64, notes: impl Into<String>) -> Self {
        Self {
            bucket,
            factor,
            points,
            notes: notes.into(),
        }
    }
}

fn rating_note(label: &str, rating: Option<Rating>) -> String {
    match rating {
        Some(rating) => format!("{label} rated {rating}"),
        None => format!("{label} not rated"),
    }
}

fn bucket_total(components: &[ScoreComponent], cap: f64) -> f64 {
    components
        .iter()
        .map(|component| component.points)
        .sum::<f64>()
        .min(cap)
}

/// SEGURIDAD scorer: five independent one-point terms, capped at 5.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeguridadScorer;

impl SeguridadScorer {
    pub fn score(&self, intake: &SeguridadIntake) -> f64 {
        bucket_total(&self.breakdown(intake), MAX_SEGURIDAD)
    }

    pub fn breakdown(&self, intake: &SeguridadIntake) -> Vec<ScoreComponent> {
        let lighting_notes = if intake.has_lighting.is_yes() {
            rating_note("lighting", intake.lighting_rating)
        } else {
            "no confirmed lighting".to_string()
        };

        vec![
            ScoreComponent::new(
                Bucket::Seguridad,
                ScoreFactor::Sidewalk,
                rules::sidewalk_points(intake.has_sidewalk),
                if intake.has_sidewalk.is_yes() {
                    "sidewalk present"
                } else {
                    "sidewalk missing or unknown"
                },
            ),
            ScoreComponent::new(
                Bucket::Seguridad,
                ScoreFactor::Width,
                rules::quality_tier(intake.width_rating),
                rating_note("width", intake.width_rating),
            ),
            ScoreComponent::new(
                Bucket::Seguridad,
                ScoreFactor::Obstructions,
                rules::obstruction_points(intake.obstructions.len()),
                format!("{} obstruction(s) reported", intake.obstructions.len()),
            ),
            ScoreComponent::new(
                Bucket::Seguridad,
                ScoreFactor::ComfortSpace,
                rules::quality_tier(intake.comfort_space_rating),
                rating_note("buffer from traffic", intake.comfort_space_rating),
            ),
            ScoreComponent::new(
                Bucket::Seguridad,
                ScoreFactor::Lighting,
                rules::lighting_points(intake.has_lighting, intake.lighting_rating),
                lighting_notes,
            ),
        ]
    }
}

/// Per-bucket scores plus their exact, unrounded sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkabilityScores {
    pub utilidad: f64,
    pub seguridad: f64,
    pub comodidad: f64,
    pub interesante: f64,
    pub total: f64,
}

impl WalkabilityScores {
    fn from_buckets(utilidad: f64, seguridad: f64, comodidad: f64, interesante: f64) -> Self {
        Self {
            utilidad,
            seguridad,
            comodidad,
            interesante,
            total: utilidad + seguridad + comodidad + interesante,
        }
    }

    pub fn bucket(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Utilidad => self.utilidad,
            Bucket::Seguridad => self.seguridad,
            Bucket::Comodidad => self.comodidad,
            Bucket::Interesante => self.interesante,
        }
    }

    /// Whole-number percentage of the 10-point maximum, rounded half away from zero.
    pub fn rounded_percent(&self) -> u8 {
        ((self.total / MAX_TOTAL) * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn ensure_within_bounds(&self) -> Result<(), ScoreRangeError> {
        for bucket in [
            Bucket::Utilidad,
            Bucket::Seguridad,
            Bucket::Comodidad,
            Bucket::Interesante,
        ] {
            let value = self.bucket(bucket);
            if !(0.0..=bucket.max_points()).contains(&value) {
                return Err(ScoreRangeError { bucket, value });
            }
        }
        Ok(())
    }
}

/// Raised when a computed bucket escapes its documented range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{bucket:?} score {value} is outside its documented range")]
pub struct ScoreRangeError {
    pub bucket: Bucket,
    pub value: f64,
}

/// Scheme tag stored on every record. The legacy single-rating percentage is not produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringScheme {
    #[default]
    FourBucket,
}

/// Four-bucket composition of UTILIDAD, SEGURIDAD, COMODIDAD, and INTERESANTE.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkabilityScorer {
    seguridad: SeguridadScorer,
}

impl WalkabilityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, buckets: &WalkabilityBuckets) -> WalkabilityScores {
        WalkabilityScores::from_buckets(
            self.utilidad(&buckets.utilidad),
            self.seguridad.score(&buckets.seguridad),
            self.comodidad(&buckets.comodidad),
            self.interesante(&buckets.interesante),
        )
    }

    /// Score a submitted report. Buckets the reporter skipped contribute zero.
    pub fn score_report(&self, intake: &ReportIntake) -> WalkabilityScores {
        WalkabilityScores::from_buckets(
            intake
                .utilidad
                .as_ref()
                .map(|amenities| self.utilidad(amenities))
                .unwrap_or(0.0),
            self.seguridad.score(&intake.seguridad),
            intake
                .comodidad
                .as_ref()
                .map(|comodidad| self.comodidad(comodidad))
                .unwrap_or(0.0),
            intake
                .interesante
                .as_ref()
                .map(|interesante| self.interesante(interesante))
                .unwrap_or(0.0),
        )
    }

    pub fn components(&self, buckets: &WalkabilityBuckets) -> Vec<ScoreComponent> {
        let mut components = self.utilidad_components(&buckets.utilidad);
        components.extend(self.seguridad.breakdown(&buckets.seguridad));
        components.extend(self.comodidad_components(&buckets.comodidad));
        components.extend(self.interesante_components(&buckets.interesante));
        components
    }

    pub fn utilidad(&self, amenities: &AmenitySet) -> f64 {
        bucket_total(&self.utilidad_components(amenities), MAX_UTILIDAD)
    }

    pub fn comodidad(&self, intake: &ComodidadIntake) -> f64 {
        bucket_total(&self.comodidad_components(intake), MAX_COMODIDAD)
    }

    pub fn interesante(&self, intake: &InteresanteIntake) -> f64 {
        bucket_total(&self.interesante_components(intake), MAX_INTERESANTE)
    }

    fn utilidad_components(&self, amenities: &AmenitySet) -> Vec<ScoreComponent> {
        vec![ScoreComponent::new(
            Bucket::Utilidad,
            ScoreFactor::Amenities,
            rules::amenity_points(amenities.len()),
            format!("{} destination(s) within walking distance", amenities.len()),
        )]
    }

    fn comodidad_components(&self, intake: &ComodidadIntake) -> Vec<ScoreComponent> {
        vec![
            ScoreComponent::new(
                Bucket::Comodidad,
                ScoreFactor::Shade,
                rules::quality_tier(intake.shade_rating),
                rating_note("shade", intake.shade_rating),
            ),
            ScoreComponent::new(
                Bucket::Comodidad,
                ScoreFactor::Contamination,
                rules::contamination_points(intake.contaminants.len(), intake.severity),
                format!(
                    "{} contaminant(s) at severity {}",
                    intake.contaminants.len(),
                    intake.severity
                ),
            ),
        ]
    }

    fn interesante_components(&self, intake: &InteresanteIntake) -> Vec<ScoreComponent> {
        let commerce_notes = if intake.has_commerce.is_yes() {
            format!("{} storefront(s)", intake.commerce_count)
        } else {
            "no street-level commerce".to_string()
        };

        vec![
            ScoreComponent::new(
                Bucket::Interesante,
                ScoreFactor::Commerce,
                rules::commerce_points(intake.has_commerce, intake.commerce_count),
                commerce_notes,
            ),
            ScoreComponent::new(
                Bucket::Interesante,
                ScoreFactor::Vibe,
                rules::vibe_points(intake.vibe_rating),
                rating_note("vibe", intake.vibe_rating),
            ),
        ]
    }
}
