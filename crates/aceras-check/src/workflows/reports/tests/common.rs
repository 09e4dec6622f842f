use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};

use crate::workflows::reports::domain::{
    AmenitySet, AuthorId, BooleanFlag, ComodidadIntake, ContaminantSet, InteresanteIntake,
    ObstructionSet, Rating, ReportId, SeguridadIntake, WalkabilityBuckets,
};
use crate::workflows::reports::intake::{RawReportIntake, RawSeguridad};
use crate::workflows::reports::photo::{PhotoReference, PhotoUpload};
use crate::workflows::reports::record::ReportRecord;
use crate::workflows::reports::repository::{
    NewReportEvent, NotifyError, PhotoStore, PhotoStoreError, ReportNotifier, ReportRepository,
    RepositoryError,
};
use crate::workflows::reports::{report_router, ReportService, ReportSettings};

/// Eight-byte PNG signature.
pub(super) const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

pub(super) fn rating(value: u8) -> Rating {
    Rating::new(value).expect("valid rating")
}

pub(super) fn author() -> AuthorId {
    AuthorId("user-ana".to_string())
}

/// hasSidewalk=true, width 4, no obstructions, comfort 4, lit with rating 5.
pub(super) fn scenario_a() -> SeguridadIntake {
    SeguridadIntake {
        has_sidewalk: BooleanFlag::Yes,
        width_rating: Some(rating(4)),
        obstructions: ObstructionSet::new(),
        comfort_space_rating: Some(rating(4)),
        has_lighting: BooleanFlag::Yes,
        lighting_rating: Some(rating(5)),
    }
}

/// No sidewalk, no width, two obstructions, comfort 3, unlit with a stale lighting rating.
pub(super) fn scenario_b() -> SeguridadIntake {
    SeguridadIntake {
        has_sidewalk: BooleanFlag::No,
        width_rating: None,
        obstructions: ObstructionSet::parse(["huecos", "vendedores"]).expect("known tags"),
        comfort_space_rating: Some(rating(3)),
        has_lighting: BooleanFlag::No,
        lighting_rating: Some(rating(5)),
    }
}

/// Scenario A with five distinct obstructions.
pub(super) fn scenario_c() -> SeguridadIntake {
    SeguridadIntake {
        obstructions: ObstructionSet::parse([
            "huecos",
            "interrupciones",
            "carros_mal_estacionados",
            "construccion",
            "vendedores",
        ])
        .expect("known tags"),
        ..scenario_a()
    }
}

pub(super) fn buckets() -> WalkabilityBuckets {
    WalkabilityBuckets {
        utilidad: AmenitySet::parse(["parque", "supermercado", "clinica"]).expect("known tags"),
        seguridad: scenario_a(),
        comodidad: ComodidadIntake {
            shade_rating: Some(rating(3)),
            contaminants: ContaminantSet::parse(["ruido"]).expect("known tags"),
            severity: rating(2),
        },
        interesante: InteresanteIntake {
            has_commerce: BooleanFlag::Yes,
            commerce_count: 1,
            vibe_rating: Some(rating(4)),
        },
    }
}

/// Complete manual report whose SEGURIDAD score is exactly 4.
pub(super) fn raw_report() -> RawReportIntake {
    RawReportIntake {
        lat: Some(8.9824),
        lng: Some(-79.5199),
        address_label: Some("Vía España, Bella Vista".to_string()),
        road_name: Some("Vía España".to_string()),
        category: Some("broken_pavement".to_string()),
        description: Some("Acera con huecos frente a la parada".to_string()),
        condition_rating: Some(2.0),
        safety_rating: Some(3.0),
        accessibility_rating: Some(2.0),
        severity: Some(4.0),
        seguridad: RawSeguridad {
            has_sidewalk: Some(true),
            width_rating: Some(3.0),
            obstructions: vec!["huecos".to_string(), "basura".to_string()],
            comfort_space_rating: Some(4.0),
            has_lighting: Some(true),
            lighting_rating: Some(4.0),
        },
        amenities: None,
        comodidad: None,
        interesante: None,
    }
}

pub(super) fn raw_report_json() -> Value {
    json!({
        "lat": 8.9824,
        "lng": -79.5199,
        "category": "broken_pavement",
        "description": "Acera con huecos frente a la parada",
        "conditionRating": 2,
        "safetyRating": 3,
        "accessibilityRating": 2,
        "severity": 4,
        "hasSidewalk": true,
        "widthRating": 3,
        "obstructions": ["huecos", "basura"],
        "comfortSpaceRating": 4,
        "hasLighting": true,
        "lightingRating": 4
    })
}

/// Vision-model output in the shape the analysis endpoint returns.
pub(super) fn analysis_payload() -> Value {
    json!({
        "confidence": 0.82,
        "sidewalkVisible": true,
        "hasSidewalk": true,
        "sidewalkWidth": "adequate",
        "widthRating": 4,
        "obstructions": ["cars", "trash"],
        "hasLighting": null,
        "lightingRating": null,
        "conditionRating": 3,
        "safetyRating": 3,
        "accessibilityRating": 4,
        "description": "Acera ocupada por carros estacionados",
        "detectedIssues": ["carros sobre la acera"],
        "imageQuality": "good",
        "qualityIssues": [],
        "retakeRecommended": false
    })
}

pub(super) type TestService = ReportService<MemoryRepository, MemoryPhotos, MemoryNotifier>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemoryPhotos>,
    Arc<MemoryNotifier>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let photos = Arc::new(MemoryPhotos::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = ReportService::new(
        repository.clone(),
        photos.clone(),
        notifier.clone(),
        ReportSettings::default(),
    );
    (service, repository, photos, notifier)
}

/// Insertion-ordered store; `recent` returns newest first.
#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<Vec<ReportRecord>>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl ReportRepository for MemoryRepository {
    fn insert(&self, record: ReportRecord) -> Result<ReportRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.id() == record.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn update(&self, record: ReportRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id() == record.id())
            .ok_or(RepositoryError::NotFound)?;
        *slot = record;
        Ok(())
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<ReportRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| record.id() == id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ReportRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }

    fn by_author(
        &self,
        author: &AuthorId,
        limit: usize,
    ) -> Result<Vec<ReportRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .rev()
            .filter(|record| record.author() == author)
            .take(limit)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableRepository;

impl ReportRepository for UnavailableRepository {
    fn insert(&self, _record: ReportRecord) -> Result<ReportRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: ReportRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ReportId) -> Result<Option<ReportRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<ReportRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn by_author(
        &self,
        _author: &AuthorId,
        _limit: usize,
    ) -> Result<Vec<ReportRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryPhotos {
    uploads: Mutex<Vec<(ReportId, usize)>>,
    offline: bool,
}

impl MemoryPhotos {
    pub(super) fn offline() -> Self {
        Self {
            uploads: Mutex::default(),
            offline: true,
        }
    }

    pub(super) fn uploads(&self) -> Vec<(ReportId, usize)> {
        self.uploads.lock().expect("photo mutex poisoned").clone()
    }
}

impl PhotoStore for MemoryPhotos {
    fn upload(
        &self,
        report_id: &ReportId,
        photo: &PhotoUpload,
    ) -> Result<PhotoReference, PhotoStoreError> {
        if self.offline {
            return Err(PhotoStoreError::Unavailable("bucket offline".to_string()));
        }
        self.uploads
            .lock()
            .expect("photo mutex poisoned")
            .push((report_id.clone(), photo.size_bytes()));
        Ok(PhotoReference {
            storage_key: format!("reports/{report_id}/photo"),
            content_type: photo.encoding().content_type().to_string(),
            size_bytes: photo.size_bytes(),
        })
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<NewReportEvent>>,
    offline: bool,
}

impl MemoryNotifier {
    pub(super) fn offline() -> Self {
        Self {
            events: Mutex::default(),
            offline: true,
        }
    }

    pub(super) fn events(&self) -> Vec<NewReportEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl ReportNotifier for MemoryNotifier {
    fn publish(&self, event: NewReportEvent) -> Result<(), NotifyError> {
        if self.offline {
            return Err(NotifyError::Transport("socket closed".to_string()));
        }
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    report_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn approx(left: f64, right: f64) -> bool {
    (left - right).abs() < 1e-9
}
