use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::domain::{AuthorId, GeoPoint, ReportCategory, ReportId, ReportStatus};
use super::draft::{reconcile, DraftError, SidewalkAnalysis};
use super::intake::{
    validate, validate_buckets, RawReportIntake, RawWalkabilityBuckets, ValidationError,
};
use super::photo::PhotoUpload;
use super::record::{AiProvenance, ReportRecord, StatusError};
use super::repository::{
    NewReportEvent, PhotoStore, PhotoStoreError, ReportNotifier, ReportRepository, RepositoryError,
};
use super::scoring::{ScoreComponent, ScoreRangeError, WalkabilityScorer, WalkabilityScores};

const DEFAULT_PHOTO_MAX_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
const MAX_PAGE_SIZE: usize = 200;

/// Intake limits and provenance defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub photo_max_bytes: usize,
    /// Recorded on AI-drafted reports.
    pub ai_model: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            photo_max_bytes: DEFAULT_PHOTO_MAX_BYTES,
            ai_model: DEFAULT_AI_MODEL.to_string(),
        }
    }
}

/// Reviewed vision-model draft ready for submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSubmission {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address_label: Option<String>,
    #[serde(default)]
    pub road_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Model output as returned by the vision collaborator.
    pub draft: Value,
    /// Reporter's corrected analysis; absent when the draft was accepted untouched.
    #[serde(default)]
    pub edited: Option<Value>,
    /// `data:image/...;base64,...` URL of the analysed photo.
    #[serde(default)]
    pub photo: Option<String>,
}

/// Scored prototype questionnaire with its line-by-line breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkabilityAssessment {
    pub scores: WalkabilityScores,
    pub walkability_percent: u8,
    pub components: Vec<ScoreComponent>,
}

/// Service composing validation, scoring, persistence, photo storage, and live updates.
pub struct ReportService<R, P, N> {
    repository: Arc<R>,
    photos: Arc<P>,
    notifier: Arc<N>,
    scorer: WalkabilityScorer,
    settings: ReportSettings,
}

static REPORT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_report_id() -> ReportId {
    let id = REPORT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReportId(format!("rpt-{id:06}"))
}

impl<R, P, N> ReportService<R, P, N>
where
    R: ReportRepository + 'static,
    P: PhotoStore + 'static,
    N: ReportNotifier + 'static,
{
    pub fn new(
        repository: Arc<R>,
        photos: Arc<P>,
        notifier: Arc<N>,
        settings: ReportSettings,
    ) -> Self {
        Self {
            repository,
            photos,
            notifier,
            scorer: WalkabilityScorer::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Submit a manually completed report with an optional photo data URL.
    pub fn submit_manual(
        &self,
        author: AuthorId,
        raw: RawReportIntake,
        photo: Option<String>,
    ) -> Result<ReportRecord, ReportServiceError> {
        self.submit(author, raw, photo, None)
    }

    /// Submit a reviewed vision-model draft. Edits are diffed against the original draft
    /// and the merged result goes through the same validation as a manual report.
    pub fn submit_ai_draft(
        &self,
        author: AuthorId,
        submission: AiSubmission,
    ) -> Result<ReportRecord, ReportServiceError> {
        let draft = SidewalkAnalysis::from_payload(submission.draft)?;
        let edited = match submission.edited {
            Some(payload) => SidewalkAnalysis::from_payload(payload)?,
            None => draft.clone(),
        };
        let location =
            GeoPoint::new(submission.lat, submission.lng).map_err(ValidationError::from)?;
        let category = submission
            .category
            .as_deref()
            .map(str::parse::<ReportCategory>)
            .transpose()
            .map_err(ValidationError::from)?;

        let reconciliation = reconcile(&draft, edited);
        debug!(
            modified = ?reconciliation.modified_fields,
            "reconciled AI draft"
        );

        let provenance = AiProvenance {
            ai_confidence: draft.confidence,
            ai_model: self.settings.ai_model.clone(),
            user_modified: reconciliation.user_modified,
            modified_fields: reconciliation.modified_fields.clone(),
            ai_processed_at: Utc::now(),
            ai_draft: draft,
        };
        let raw = reconciliation.into_raw_intake(
            location,
            submission.address_label,
            submission.road_name,
            category,
        );

        self.submit(author, raw, submission.photo, Some(provenance))
    }

    fn submit(
        &self,
        author: AuthorId,
        raw: RawReportIntake,
        photo: Option<String>,
        ai: Option<AiProvenance>,
    ) -> Result<ReportRecord, ReportServiceError> {
        let intake = validate(raw)?;
        let photo = photo
            .map(|data_url| PhotoUpload::from_data_url(&data_url, self.settings.photo_max_bytes))
            .transpose()?;

        let report_id = next_report_id();
        let record = ReportRecord::new(
            report_id.clone(),
            author,
            intake,
            ai,
            &self.scorer,
            Utc::now(),
        )?;
        let mut stored = self.repository.insert(record)?;

        if let Some(photo) = photo {
            let reference = self
                .photos
                .upload(&report_id, &photo)
                .map_err(|source| ReportServiceError::Photo {
                    report_id: report_id.clone(),
                    source,
                })?;
            stored.attach_photo(reference, Utc::now());
            self.repository.update(stored.clone())?;
        }

        let location = stored.intake().location;
        let event = NewReportEvent {
            report_id: report_id.clone(),
            lat: location.lat(),
            lng: location.lng(),
        };
        if let Err(err) = self.notifier.publish(event) {
            warn!(%report_id, error = %err, "new report notification failed");
        }

        info!(
            %report_id,
            category = %stored.intake().category,
            total = stored.scores().total,
            ai_generated = stored.ai_generated(),
            "report submitted"
        );
        Ok(stored)
    }

    pub fn get(&self, report_id: &ReportId) -> Result<ReportRecord, ReportServiceError> {
        let record = self
            .repository
            .fetch(report_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Newest reports first.
    pub fn list(&self, limit: usize) -> Result<Vec<ReportRecord>, ReportServiceError> {
        Ok(self.repository.recent(page_size(limit))?)
    }

    pub fn by_author(
        &self,
        author: &AuthorId,
        limit: usize,
    ) -> Result<Vec<ReportRecord>, ReportServiceError> {
        Ok(self.repository.by_author(author, page_size(limit))?)
    }

    /// Move a report forward through moderation.
    pub fn advance_status(
        &self,
        report_id: &ReportId,
        next: ReportStatus,
    ) -> Result<ReportRecord, ReportServiceError> {
        let mut record = self.get(report_id)?;
        let previous = record.status();
        record.advance_status(next, Utc::now())?;
        self.repository.update(record.clone())?;
        info!(%report_id, from = %previous, to = %next, "report status advanced");
        Ok(record)
    }

    /// Score the standalone four-bucket questionnaire without persisting anything.
    pub fn score_walkability(
        &self,
        raw: RawWalkabilityBuckets,
    ) -> Result<WalkabilityAssessment, ReportServiceError> {
        let buckets = validate_buckets(raw)?;
        let scores = self.scorer.score(&buckets);
        scores.ensure_within_bounds()?;
        Ok(WalkabilityAssessment {
            walkability_percent: scores.rounded_percent(),
            components: self.scorer.components(&buckets),
            scores,
        })
    }
}

fn page_size(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// Error raised by the report service.
#[derive(Debug, thiserror::Error)]
pub enum ReportServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("report {report_id} was stored but its photo upload failed: {source}")]
    Photo {
        report_id: ReportId,
        #[source]
        source: PhotoStoreError,
    },
    #[error(transparent)]
    ScoreRange(#[from] ScoreRangeError),
}

impl ReportServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReportServiceError::Validation(_) | ReportServiceError::Draft(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ReportServiceError::Status(_)
            | ReportServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            ReportServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            ReportServiceError::Repository(RepositoryError::Unavailable(_))
            | ReportServiceError::Photo { .. }
            | ReportServiceError::ScoreRange(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
