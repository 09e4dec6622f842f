use chrono::{Duration, TimeZone, Utc};

use super::common::*;
use crate::workflows::reports::domain::{ReportId, ReportStatus};
use crate::workflows::reports::intake::validate;
use crate::workflows::reports::photo::PhotoReference;
use crate::workflows::reports::record::{ReportRecord, StatusError};
use crate::workflows::reports::scoring::{ScoringScheme, WalkabilityScorer};

fn record() -> ReportRecord {
    let created = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
    ReportRecord::new(
        ReportId("rpt-test".to_string()),
        author(),
        validate(raw_report()).expect("valid report"),
        None,
        &WalkabilityScorer::new(),
        created,
    )
    .expect("scores in range")
}

#[test]
fn new_records_start_pending_with_four_bucket_scores() {
    let record = record();

    assert_eq!(record.status(), ReportStatus::Pending);
    assert_eq!(record.scoring_scheme(), ScoringScheme::FourBucket);
    assert_eq!(record.scores().seguridad, 4.0);
    assert_eq!(record.created_at(), record.updated_at());
    assert!(!record.ai_generated());
}

#[test]
fn status_moves_forward_and_refreshes_updated_at() {
    let mut record = record();
    let later = record.created_at() + Duration::hours(2);

    record
        .advance_status(ReportStatus::Verified, later)
        .expect("pending to verified");
    assert_eq!(record.status(), ReportStatus::Verified);
    assert_eq!(record.updated_at(), later);

    record
        .advance_status(ReportStatus::Resolved, later + Duration::days(1))
        .expect("verified to resolved");
    assert_eq!(record.status(), ReportStatus::Resolved);
}

#[test]
fn pending_may_skip_directly_to_resolved() {
    let mut record = record();
    let now = record.created_at() + Duration::minutes(5);
    assert!(record.advance_status(ReportStatus::Resolved, now).is_ok());
}

#[test]
fn status_never_regresses_or_repeats() {
    let mut record = record();
    let now = record.created_at() + Duration::minutes(5);
    record
        .advance_status(ReportStatus::Verified, now)
        .expect("forward");

    assert_eq!(
        record.advance_status(ReportStatus::Pending, now),
        Err(StatusError::Regression {
            from: ReportStatus::Verified,
            to: ReportStatus::Pending,
        })
    );
    assert!(record.advance_status(ReportStatus::Verified, now).is_err());
    assert_eq!(record.status(), ReportStatus::Verified);
}

#[test]
fn created_at_is_immutable_and_updated_at_monotonic() {
    let mut record = record();
    let created = record.created_at();
    let earlier = created - Duration::hours(1);

    record.attach_photo(
        PhotoReference {
            storage_key: "reports/rpt-test/photo".to_string(),
            content_type: "image/jpeg".to_string(),
            size_bytes: 1024,
        },
        earlier,
    );

    assert_eq!(record.created_at(), created);
    assert!(record.updated_at() >= created);
    assert!(record.photo().is_some());
}

#[test]
fn view_exposes_rounded_percent_and_completeness() {
    let view = record().view();

    assert_eq!(view.walkability_percent, 40);
    assert_eq!(view.status, "pending");
    assert!(view.completeness.is_complete());
    assert_eq!(view.user_modified, None);

    let encoded = serde_json::to_value(&view).expect("serialize view");
    assert_eq!(encoded["reportId"], "rpt-test");
    assert_eq!(encoded["scoringScheme"], "four_bucket");
    assert_eq!(encoded["category"], "broken_pavement");
}

#[test]
fn stored_records_reload_with_their_state() {
    let mut record = record();
    let later = record.created_at() + Duration::hours(3);
    record
        .advance_status(ReportStatus::Verified, later)
        .expect("forward");

    let encoded = serde_json::to_value(&record).expect("serialize record");
    let reloaded: ReportRecord = serde_json::from_value(encoded).expect("record reloads");

    assert_eq!(reloaded.id(), record.id());
    assert_eq!(reloaded.status(), ReportStatus::Verified);
    assert_eq!(reloaded.updated_at(), later);
    assert_eq!(reloaded.scoring_scheme(), ScoringScheme::FourBucket);
    assert_eq!(reloaded.scores().seguridad, record.scores().seguridad);
}

#[test]
fn stored_record_with_out_of_range_score_is_rejected() {
    let mut encoded = serde_json::to_value(record()).expect("serialize record");
    encoded["scores"]["seguridad"] = serde_json::json!(7.0);

    let error = serde_json::from_value::<ReportRecord>(encoded).expect_err("score rejected");
    assert!(error.to_string().contains("Seguridad score 7"));
}

#[test]
fn stored_record_updated_before_creation_is_rejected() {
    let record = record();
    let mut encoded = serde_json::to_value(&record).expect("serialize record");
    let earlier = record.created_at() - Duration::minutes(1);
    encoded["updatedAt"] = serde_json::to_value(earlier).expect("serialize timestamp");

    let error = serde_json::from_value::<ReportRecord>(encoded).expect_err("timestamps rejected");
    assert!(error.to_string().contains("precedes createdAt"));
}
