use aceras_check::workflows::reports::{
    AuthorId, NewReportEvent, NotifyError, PhotoReference, PhotoStore, PhotoStoreError,
    PhotoUpload, ReportId, ReportNotifier, ReportRecord, ReportRepository, RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, String> {
    mutex
        .lock()
        .map_err(|_| "in-memory store lock poisoned".to_string())
}

/// Insertion-ordered report store standing in for the hosted database.
#[derive(Default, Clone)]
pub(crate) struct InMemoryReportRepository {
    records: Arc<Mutex<Vec<ReportRecord>>>,
}

impl InMemoryReportRepository {
    fn guard(&self) -> Result<MutexGuard<'_, Vec<ReportRecord>>, RepositoryError> {
        lock(&self.records).map_err(RepositoryError::Unavailable)
    }
}

impl ReportRepository for InMemoryReportRepository {
    fn insert(&self, record: ReportRecord) -> Result<ReportRecord, RepositoryError> {
        let mut guard = self.guard()?;
        if guard.iter().any(|existing| existing.id() == record.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn update(&self, record: ReportRecord) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id() == record.id())
            .ok_or(RepositoryError::NotFound)?;
        *slot = record;
        Ok(())
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<ReportRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard.iter().find(|record| record.id() == id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ReportRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }

    fn by_author(
        &self,
        author: &AuthorId,
        limit: usize,
    ) -> Result<Vec<ReportRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard
            .iter()
            .rev()
            .filter(|record| record.author() == author)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Keeps uploaded photo bytes in memory under `reports/<id>/photo.<ext>` keys.
#[derive(Default, Clone)]
pub(crate) struct InMemoryPhotoStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

/// Prefers `jpg`, then the MIME subtype itself, then the first registered extension.
fn photo_extension(content_type: &str) -> &'static str {
    let Some(extensions) = mime_guess::get_mime_extensions_str(content_type) else {
        return "bin";
    };
    let subtype = content_type.split_once('/').map(|(_, subtype)| subtype);
    extensions
        .iter()
        .find(|extension| **extension == "jpg")
        .or_else(|| {
            extensions
                .iter()
                .find(|extension| Some(**extension) == subtype)
        })
        .or_else(|| extensions.first())
        .copied()
        .unwrap_or("bin")
}

pub(crate) fn storage_key(report_id: &ReportId, content_type: &str) -> String {
    format!(
        "reports/{report_id}/photo.{}",
        photo_extension(content_type)
    )
}

impl PhotoStore for InMemoryPhotoStore {
    fn upload(
        &self,
        report_id: &ReportId,
        photo: &PhotoUpload,
    ) -> Result<PhotoReference, PhotoStoreError> {
        let content_type = photo.encoding().content_type();
        let key = storage_key(report_id, content_type);
        let mut guard = lock(&self.objects).map_err(PhotoStoreError::Unavailable)?;
        guard.insert(key.clone(), photo.bytes().to_vec());
        Ok(PhotoReference {
            storage_key: key,
            content_type: content_type.to_string(),
            size_bytes: photo.size_bytes(),
        })
    }
}

impl InMemoryPhotoStore {
    pub(crate) fn object_count(&self) -> usize {
        lock(&self.objects).map(|guard| guard.len()).unwrap_or(0)
    }
}

/// Records new-report events and logs them in place of a realtime channel.
#[derive(Default, Clone)]
pub(crate) struct LoggingReportNotifier {
    events: Arc<Mutex<Vec<NewReportEvent>>>,
}

impl ReportNotifier for LoggingReportNotifier {
    fn publish(&self, event: NewReportEvent) -> Result<(), NotifyError> {
        info!(report_id = %event.report_id, lat = event.lat, lng = event.lng, "new report");
        let mut guard = lock(&self.events).map_err(NotifyError::Transport)?;
        guard.push(event);
        Ok(())
    }
}

impl LoggingReportNotifier {
    pub(crate) fn events(&self) -> Vec<NewReportEvent> {
        lock(&self.events)
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
