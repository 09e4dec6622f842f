use super::super::domain::{BooleanFlag, Rating};

pub(crate) const MAX_UTILIDAD: f64 = 1.0;
pub(crate) const MAX_SEGURIDAD: f64 = 5.0;
pub(crate) const MAX_COMODIDAD: f64 = 2.0;
pub(crate) const MAX_INTERESANTE: f64 = 2.0;
pub(crate) const MAX_TOTAL: f64 = MAX_UTILIDAD + MAX_SEGURIDAD + MAX_COMODIDAD + MAX_INTERESANTE;

const AMENITY_WEIGHT: f64 = 0.2;
const OBSTRUCTION_PENALTY: f64 = 0.25;
const CONTAMINANT_PENALTY: f64 = 0.3;
const SEVERE_CONTAMINATION_PENALTY: f64 = 0.2;
const SEVERE_CONTAMINATION_THRESHOLD: u8 = 4;
const BUSY_COMMERCE_THRESHOLD: u32 = 3;

/// Shared tiering for width, comfort space, and shade: 4-5 earns a full point, 3 earns half.
pub(crate) fn quality_tier(rating: Option<Rating>) -> f64 {
    match rating.map(Rating::value) {
        Some(4..=5) => 1.0,
        Some(3) => 0.5,
        _ => 0.0,
    }
}

pub(crate) fn sidewalk_points(has_sidewalk: BooleanFlag) -> f64 {
    if has_sidewalk.is_yes() {
        1.0
    } else {
        0.0
    }
}

/// One point minus a quarter per distinct obstruction, floored at zero.
pub(crate) fn obstruction_points(distinct: usize) -> f64 {
    (1.0 - OBSTRUCTION_PENALTY * distinct as f64).max(0.0)
}

/// Lighting counts only when the street is confirmed lit. Unlike the width tiering, a
/// rating of 2 still earns half a point.
pub(crate) fn lighting_points(has_lighting: BooleanFlag, rating: Option<Rating>) -> f64 {
    if !has_lighting.is_yes() {
        return 0.0;
    }
    match rating.map(Rating::value) {
        Some(4..=5) => 1.0,
        Some(2..=3) => 0.5,
        _ => 0.0,
    }
}

pub(crate) fn amenity_points(toggled: usize) -> f64 {
    (AMENITY_WEIGHT * toggled as f64).min(MAX_UTILIDAD)
}

pub(crate) fn contamination_points(distinct: usize, severity: Rating) -> f64 {
    let severe = if severity.value() >= SEVERE_CONTAMINATION_THRESHOLD {
        SEVERE_CONTAMINATION_PENALTY
    } else {
        0.0
    };
    (1.0 - CONTAMINANT_PENALTY * distinct as f64 - severe).max(0.0)
}

pub(crate) fn commerce_points(has_commerce: BooleanFlag, count: u32) -> f64 {
    if !has_commerce.is_yes() {
        return 0.0;
    }
    if count >= BUSY_COMMERCE_THRESHOLD {
        1.5
    } else {
        1.0
    }
}

pub(crate) fn vibe_points(rating: Option<Rating>) -> f64 {
    rating
        .map(|rating| (f64::from(rating.value()) / 5.0).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}
