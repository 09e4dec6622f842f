//! Sidewalk report intake, walkability scoring, and moderation.

pub mod domain;
pub mod draft;
pub mod intake;
pub mod photo;
pub mod record;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Amenity, AmenitySet, AuthorId, BooleanFlag, ComodidadIntake, Contaminant, ContaminantSet,
    GeoPoint, InteresanteIntake, Obstruction, ObstructionSet, RangeError, Rating, ReportCategory,
    ReportId, ReportStatus, SeguridadIntake, TagSet, UnknownTag, WalkabilityBuckets,
};
pub use draft::{
    infer_category, reconcile, Confidence, DraftError, DraftField, ImageQuality, Reconciliation,
    ReviewSession, SidewalkAnalysis, SidewalkWidth,
};
pub use intake::{
    validate, validate_buckets, Completeness, RawComodidad, RawInteresante, RawReportIntake,
    RawSeguridad, RawWalkabilityBuckets, ReportIntake, ValidationError,
};
pub use photo::{ImageEncoding, PhotoReference, PhotoUpload};
pub use record::{AiProvenance, RecordError, ReportRecord, ReportView, StatusError};
pub use repository::{
    NewReportEvent, NotifyError, PhotoStore, PhotoStoreError, ReportNotifier, ReportRepository,
    RepositoryError,
};
pub use router::report_router;
pub use scoring::{
    Bucket, ScoreComponent, ScoreFactor, ScoreRangeError, ScoringScheme, SeguridadScorer,
    WalkabilityScorer, WalkabilityScores,
};
pub use service::{
    AiSubmission, ReportService, ReportServiceError, ReportSettings, WalkabilityAssessment,
};
