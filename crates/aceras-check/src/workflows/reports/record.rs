use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AuthorId, ReportCategory, ReportId, ReportStatus};
use super::draft::{Confidence, DraftField, SidewalkAnalysis};
use super::intake::{Completeness, ReportIntake};
use super::photo::PhotoReference;
use super::scoring::{ScoreRangeError, ScoringScheme, WalkabilityScorer, WalkabilityScores};

/// Provenance kept for reports drafted by the vision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiProvenance {
    pub ai_confidence: Confidence,
    pub ai_model: String,
    pub user_modified: bool,
    pub modified_fields: Vec<DraftField>,
    pub ai_processed_at: DateTime<Utc>,
    /// Draft exactly as the model produced it, before any edits.
    pub ai_draft: SidewalkAnalysis,
}

/// Persisted report. Scores are derived once from the intake at creation; only status,
/// photo, and `updated_at` change afterwards. Deserialization re-checks score bounds and
/// timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ReportRecordRepr")]
pub struct ReportRecord {
    id: ReportId,
    author: AuthorId,
    intake: ReportIntake,
    scoring_scheme: ScoringScheme,
    scores: WalkabilityScores,
    status: ReportStatus,
    photo: Option<PhotoReference>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ai: Option<AiProvenance>,
}

/// Attempt to move a report backwards or sideways in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("cannot move report from {from} to {to}")]
    Regression {
        from: ReportStatus,
        to: ReportStatus,
    },
}

/// Stored record that breaks a creation-time invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    ScoreRange(#[from] ScoreRangeError),
    #[error("updatedAt {updated_at} precedes createdAt {created_at}")]
    Timestamps {
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRecordRepr {
    id: ReportId,
    author: AuthorId,
    intake: ReportIntake,
    scoring_scheme: ScoringScheme,
    scores: WalkabilityScores,
    status: ReportStatus,
    photo: Option<PhotoReference>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ai: Option<AiProvenance>,
}

impl TryFrom<ReportRecordRepr> for ReportRecord {
    type Error = RecordError;

    fn try_from(repr: ReportRecordRepr) -> Result<Self, Self::Error> {
        repr.scores.ensure_within_bounds()?;
        if repr.updated_at < repr.created_at {
            return Err(RecordError::Timestamps {
                created_at: repr.created_at,
                updated_at: repr.updated_at,
            });
        }
        Ok(Self {
            id: repr.id,
            author: repr.author,
            intake: repr.intake,
            scoring_scheme: repr.scoring_scheme,
            scores: repr.scores,
            status: repr.status,
            photo: repr.photo,
            created_at: repr.created_at,
            updated_at: repr.updated_at,
            ai: repr.ai,
        })
    }
}

impl ReportRecord {
    pub fn new(
        id: ReportId,
        author: AuthorId,
        intake: ReportIntake,
        ai: Option<AiProvenance>,
        scorer: &WalkabilityScorer,
        now: DateTime<Utc>,
    ) -> Result<Self, ScoreRangeError> {
        let scores = scorer.score_report(&intake);
        scores.ensure_within_bounds()?;

        Ok(Self {
            id,
            author,
            intake,
            scoring_scheme: ScoringScheme::FourBucket,
            scores,
            status: ReportStatus::Pending,
            photo: None,
            created_at: now,
            updated_at: now,
            ai,
        })
    }

    pub fn id(&self) -> &ReportId {
        &self.id
    }

    pub fn author(&self) -> &AuthorId {
        &self.author
    }

    pub fn intake(&self) -> &ReportIntake {
        &self.intake
    }

    pub fn scoring_scheme(&self) -> ScoringScheme {
        self.scoring_scheme
    }

    pub fn scores(&self) -> &WalkabilityScores {
        &self.scores
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn photo(&self) -> Option<&PhotoReference> {
        self.photo.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn ai(&self) -> Option<&AiProvenance> {
        self.ai.as_ref()
    }

    pub fn ai_generated(&self) -> bool {
        self.ai.is_some()
    }

    pub fn advance_status(
        &mut self,
        next: ReportStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StatusError> {
        if !self.status.can_advance_to(next) {
            return Err(StatusError::Regression {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch(now);
        Ok(())
    }

    pub fn attach_photo(&mut self, photo: PhotoReference, now: DateTime<Utc>) {
        self.photo = Some(photo);
        self.touch(now);
    }

    /// `updated_at` never moves backwards, even if the caller's clock does.
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = self.updated_at.max(now);
    }

    pub fn view(&self) -> ReportView {
        let location = self.intake.location;
        ReportView {
            report_id: self.id.clone(),
            author_id: self.author.clone(),
            status: self.status.label(),
            category: self.intake.category,
            lat: location.lat(),
            lng: location.lng(),
            address_label: self.intake.address_label.clone(),
            road_name: self.intake.road_name.clone(),
            description: self.intake.description.clone(),
            scoring_scheme: self.scoring_scheme,
            scores: self.scores,
            walkability_percent: self.scores.rounded_percent(),
            completeness: self.intake.completeness(),
            photo: self.photo.clone(),
            ai_generated: self.ai_generated(),
            user_modified: self.ai.as_ref().map(|ai| ai.user_modified),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Representation of a report exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub report_id: ReportId,
    pub author_id: AuthorId,
    pub status: &'static str,
    pub category: ReportCategory,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub road_name: Option<String>,
    pub description: String,
    pub scoring_scheme: ScoringScheme,
    pub scores: WalkabilityScores,
    pub walkability_percent: u8,
    pub completeness: Completeness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<PhotoReference>,
    pub ai_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_modified: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
