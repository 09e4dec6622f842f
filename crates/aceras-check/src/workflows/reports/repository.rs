use serde::{Deserialize, Serialize};

use super::domain::{AuthorId, ReportId};
use super::photo::{PhotoReference, PhotoUpload};
use super::record::ReportRecord;

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ReportRepository: Send + Sync {
    fn insert(&self, record: ReportRecord) -> Result<ReportRecord, RepositoryError>;
    fn update(&self, record: ReportRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ReportId) -> Result<Option<ReportRecord>, RepositoryError>;
    /// Newest first.
    fn recent(&self, limit: usize) -> Result<Vec<ReportRecord>, RepositoryError>;
    /// Newest first.
    fn by_author(
        &self,
        author: &AuthorId,
        limit: usize,
    ) -> Result<Vec<ReportRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("report already exists")]
    Conflict,
    #[error("report not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Blob storage for report photos.
pub trait PhotoStore: Send + Sync {
    fn upload(
        &self,
        report_id: &ReportId,
        photo: &PhotoUpload,
    ) -> Result<PhotoReference, PhotoStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PhotoStoreError {
    #[error("photo storage unavailable: {0}")]
    Unavailable(String),
    #[error("photo rejected by storage: {0}")]
    Rejected(String),
}

/// Outbound hook announcing new reports to live map subscribers.
pub trait ReportNotifier: Send + Sync {
    fn publish(&self, event: NewReportEvent) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReportEvent {
    pub report_id: ReportId,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
