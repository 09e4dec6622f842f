use crate::infra::{InMemoryPhotoStore, InMemoryReportRepository, LoggingReportNotifier};
use aceras_check::error::AppError;
use aceras_check::workflows::reports::{
    validate_buckets, AiSubmission, AuthorId, RawReportIntake, RawWalkabilityBuckets,
    ReportRecord, ReportService, ReportSettings, ReportStatus, ScoreComponent, WalkabilityScorer,
    WalkabilityScores,
};
use clap::Args;
use serde_json::json;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// PNG signature bytes standing in for a camera capture.
const DEMO_PHOTO: &str = "data:image/png;base64,iVBORw0KGgo=";

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Questionnaire JSON file. Reads stdin when omitted.
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
    /// Print the assessment as JSON instead of a table.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Author recorded on the sample reports.
    #[arg(long, default_value = "demo-user")]
    pub(crate) author: String,
    /// Skip the AI-drafted report.
    #[arg(long)]
    pub(crate) skip_ai: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let raw = match args.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let questionnaire: RawWalkabilityBuckets = serde_json::from_str(&raw)?;
    let buckets = validate_buckets(questionnaire)?;

    let scorer = WalkabilityScorer::new();
    let scores = scorer.score(&buckets);
    let components = scorer.components(&buckets);

    if args.json {
        let payload = json!({
            "scores": scores,
            "walkabilityPercent": scores.rounded_percent(),
            "components": components,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        render_scores(&scores, &components);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryReportRepository::default());
    let photos = Arc::new(InMemoryPhotoStore::default());
    let notifier = Arc::new(LoggingReportNotifier::default());
    let service = ReportService::new(
        repository,
        Arc::clone(&photos),
        Arc::clone(&notifier),
        ReportSettings::default(),
    );
    let author = AuthorId(args.author);

    println!("Aceras Check demo");

    let manual: RawReportIntake = serde_json::from_value(json!({
        "lat": 8.9824,
        "lng": -79.5199,
        "addressLabel": "Vía España, Bella Vista",
        "roadName": "Vía España",
        "category": "obstruction_vendor",
        "description": "Puestos de venta ocupan casi toda la acera",
        "conditionRating": 3,
        "accessibilityRating": 2,
        "severity": 4,
        "hasSidewalk": true,
        "widthRating": 3,
        "obstructions": ["vendedores", "basura"],
        "comfortSpaceRating": 2,
        "hasLighting": true,
        "lightingRating": 3,
        "amenities": ["supermercado", "comercio"],
        "comodidad": { "shadeRating": 2, "contaminants": ["ruido"], "severity": 4 },
        "interesante": { "hasCommerce": true, "commerceCount": 5, "vibeRating": 4 }
    }))?;
    let record = service.submit_manual(author.clone(), manual, Some(DEMO_PHOTO.to_string()))?;
    println!("\nManual report");
    render_record(&record);

    if !args.skip_ai {
        let submission: AiSubmission = serde_json::from_value(json!({
            "lat": 8.9936,
            "lng": -79.5197,
            "draft": {
                "confidence": 0.78,
                "sidewalkVisible": true,
                "hasSidewalk": true,
                "sidewalkWidth": "narrow",
                "widthRating": 2,
                "obstructions": ["cars"],
                "hasLighting": false,
                "lightingRating": null,
                "conditionRating": 3,
                "safetyRating": 2,
                "accessibilityRating": 2,
                "description": "Carros estacionados sobre una acera angosta",
                "detectedIssues": ["carros sobre la acera"],
                "imageQuality": "good",
                "qualityIssues": [],
                "retakeRecommended": false
            },
            "edited": {
                "confidence": 0.78,
                "sidewalkVisible": true,
                "hasSidewalk": true,
                "sidewalkWidth": "narrow",
                "widthRating": 1,
                "obstructions": ["cars", "holes"],
                "hasLighting": false,
                "lightingRating": null,
                "conditionRating": 2,
                "safetyRating": 2,
                "accessibilityRating": 2,
                "description": "Carros estacionados sobre una acera angosta y con huecos",
                "detectedIssues": ["carros sobre la acera"],
                "imageQuality": "good",
                "qualityIssues": [],
                "retakeRecommended": false
            }
        }))?;
        let record = service.submit_ai_draft(author.clone(), submission)?;
        println!("\nAI-drafted report");
        render_record(&record);
        if let Some(ai) = record.ai() {
            let fields: Vec<String> = ai.modified_fields.iter().map(ToString::to_string).collect();
            println!(
                "- model {} | confidence {:.2} | edited fields: {}",
                ai.ai_model,
                ai.ai_confidence.value(),
                if fields.is_empty() {
                    "none".to_string()
                } else {
                    fields.join(", ")
                }
            );
        }
    }

    let verified = service.advance_status(record.id(), ReportStatus::Verified)?;
    println!(
        "\nModeration: {} moved to {}",
        verified.id(),
        verified.status()
    );

    let mine = service.by_author(&author, 10)?;
    println!(
        "\n{} report(s) by {} | {} photo(s) stored | {} live update(s) published",
        mine.len(),
        author,
        photos.object_count(),
        notifier.events().len()
    );
    Ok(())
}

fn render_record(record: &ReportRecord) {
    let intake = record.intake();
    let scores = record.scores();
    println!(
        "- {} [{}] {} at ({:.4}, {:.4})",
        record.id(),
        record.status(),
        intake.category,
        intake.location.lat(),
        intake.location.lng()
    );
    println!(
        "- walkability {:.2}/10 ({}%)",
        scores.total,
        scores.rounded_percent()
    );
    println!(
        "- utilidad {:.2} | seguridad {:.2} | comodidad {:.2} | interesante {:.2}",
        scores.utilidad,
        scores.seguridad,
        scores.comodidad,
        scores.interesante
    );
    let completeness = intake.completeness();
    if completeness.is_complete() {
        println!("- intake complete");
    } else {
        println!("- missing: {}", completeness.missing.join(", "));
    }
    if let Some(photo) = record.photo() {
        println!("- photo {} ({} bytes)", photo.storage_key, photo.size_bytes);
    }
}

fn render_scores(scores: &WalkabilityScores, components: &[ScoreComponent]) {
    println!(
        "Walkability {:.2}/10 ({}%)",
        scores.total,
        scores.rounded_percent()
    );
    for component in components {
        println!(
            "  - {:?}/{:?}: {:.2} ({})",
            component.bucket, component.factor, component.points, component.notes
        );
    }
}
