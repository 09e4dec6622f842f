use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Out-of-domain numeric input. Values are rejected rather than clamped so corrupt upstream
/// data is surfaced instead of masked.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    #[error("{field} must be a whole number between 1 and 5 (found {value})")]
    Rating { field: &'static str, value: f64 },
    #[error("{field} must be a non-negative whole number (found {value})")]
    Count { field: &'static str, value: f64 },
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
    #[error("confidence {0} is outside [0, 1]")]
    Confidence(f64),
}

/// Likert-style quality judgment on a 1 (worst) to 5 (best) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, RangeError> {
        Self::checked("rating", f64::from(value))
    }

    /// Validate an untyped JSON number, naming the offending field on failure.
    pub fn checked(field: &'static str, value: f64) -> Result<Self, RangeError> {
        let whole = value.is_finite() && value.fract() == 0.0;
        if whole && value >= f64::from(Self::MIN) && value <= f64::from(Self::MAX) {
            Ok(Self(value as u8))
        } else {
            Err(RangeError::Rating { field, value })
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<f64> for Rating {
    type Error = RangeError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::checked("rating", value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/5", self.0)
    }
}

/// Yes/no answer that may be left unanswered. Serialized as `true`, `false`, or `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum BooleanFlag {
    Yes,
    No,
    #[default]
    Unknown,
}

impl BooleanFlag {
    pub const fn is_yes(self) -> bool {
        matches!(self, BooleanFlag::Yes)
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, BooleanFlag::Unknown)
    }
}

impl From<Option<bool>> for BooleanFlag {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => BooleanFlag::Yes,
            Some(false) => BooleanFlag::No,
            None => BooleanFlag::Unknown,
        }
    }
}

impl From<bool> for BooleanFlag {
    fn from(value: bool) -> Self {
        Self::from(Some(value))
    }
}

impl From<BooleanFlag> for Option<bool> {
    fn from(flag: BooleanFlag) -> Self {
        match flag {
            BooleanFlag::Yes => Some(true),
            BooleanFlag::No => Some(false),
            BooleanFlag::Unknown => None,
        }
    }
}

/// Tag outside a fixed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{tag}'")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub tag: String,
}

fn normalize_tag(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// Sidewalk obstruction vocabulary. Vision-model output uses English aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Obstruction {
    #[serde(alias = "holes")]
    Huecos,
    #[serde(alias = "interruptions")]
    Interrupciones,
    #[serde(alias = "cars")]
    CarrosMalEstacionados,
    #[serde(alias = "construction")]
    Construccion,
    #[serde(alias = "vendors")]
    Vendedores,
    #[serde(alias = "business")]
    Negocios,
    #[serde(alias = "trees", alias = "roots")]
    ArbolesRaices,
    #[serde(alias = "garbage", alias = "trash")]
    Basura,
}

impl Obstruction {
    pub const ALL: [Obstruction; 8] = [
        Obstruction::Huecos,
        Obstruction::Interrupciones,
        Obstruction::CarrosMalEstacionados,
        Obstruction::Construccion,
        Obstruction::Vendedores,
        Obstruction::Negocios,
        Obstruction::ArbolesRaices,
        Obstruction::Basura,
    ];

    pub const fn tag(self) -> &'static str {
        match self {
            Obstruction::Huecos => "huecos",
            Obstruction::Interrupciones => "interrupciones",
            Obstruction::CarrosMalEstacionados => "carros_mal_estacionados",
            Obstruction::Construccion => "construccion",
            Obstruction::Vendedores => "vendedores",
            Obstruction::Negocios => "negocios",
            Obstruction::ArbolesRaices => "arboles_raices",
            Obstruction::Basura => "basura",
        }
    }
}

impl FromStr for Obstruction {
    type Err = UnknownTag;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let tag = normalize_tag(raw);
        let parsed = match tag.as_str() {
            "huecos" | "holes" => Obstruction::Huecos,
            "interrupciones" | "interruptions" => Obstruction::Interrupciones,
            "carros_mal_estacionados" | "cars" => Obstruction::CarrosMalEstacionados,
            "construccion" | "construction" => Obstruction::Construccion,
            "vendedores" | "vendors" => Obstruction::Vendedores,
            "negocios" | "business" => Obstruction::Negocios,
            "arboles_raices" | "trees" | "roots" => Obstruction::ArbolesRaices,
            "basura" | "garbage" | "trash" => Obstruction::Basura,
            _ => {
                return Err(UnknownTag {
                    kind: "obstruction",
                    tag: raw.to_string(),
                })
            }
        };
        Ok(parsed)
    }
}

/// Airborne or ambient nuisances that reduce comfort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contaminant {
    #[serde(alias = "trash")]
    Basura,
    #[serde(alias = "smell")]
    Olores,
    #[serde(alias = "smoke")]
    Humo,
    #[serde(alias = "noise")]
    Ruido,
}

impl Contaminant {
    pub const fn tag(self) -> &'static str {
        match self {
            Contaminant::Basura => "basura",
            Contaminant::Olores => "olores",
            Contaminant::Humo => "humo",
            Contaminant::Ruido => "ruido",
        }
    }
}

impl FromStr for Contaminant {
    type Err = UnknownTag;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_tag(raw).as_str() {
            "basura" | "trash" => Ok(Contaminant::Basura),
            "olores" | "smell" => Ok(Contaminant::Olores),
            "humo" | "smoke" => Ok(Contaminant::Humo),
            "ruido" | "noise" => Ok(Contaminant::Ruido),
            _ => Err(UnknownTag {
                kind: "contaminant",
                tag: raw.to_string(),
            }),
        }
    }
}

/// Destinations reachable within a fifteen minute walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amenity {
    #[serde(alias = "park")]
    Parque,
    #[serde(alias = "market")]
    Supermercado,
    #[serde(alias = "clinic")]
    Clinica,
    #[serde(alias = "shops")]
    Comercio,
    #[serde(alias = "work")]
    TrabajoEscuela,
}

impl Amenity {
    pub const ALL: [Amenity; 5] = [
        Amenity::Parque,
        Amenity::Supermercado,
        Amenity::Clinica,
        Amenity::Comercio,
        Amenity::TrabajoEscuela,
    ];

    pub const fn tag(self) -> &'static str {
        match self {
            Amenity::Parque => "parque",
            Amenity::Supermercado => "supermercado",
            Amenity::Clinica => "clinica",
            Amenity::Comercio => "comercio",
            Amenity::TrabajoEscuela => "trabajo_escuela",
        }
    }
}

impl FromStr for Amenity {
    type Err = UnknownTag;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_tag(raw).as_str() {
            "parque" | "park" => Ok(Amenity::Parque),
            "supermercado" | "market" => Ok(Amenity::Supermercado),
            "clinica" | "clinic" => Ok(Amenity::Clinica),
            "comercio" | "shops" => Ok(Amenity::Comercio),
            "trabajo_escuela" | "work" => Ok(Amenity::TrabajoEscuela),
            _ => Err(UnknownTag {
                kind: "amenity",
                tag: raw.to_string(),
            }),
        }
    }
}

/// Unordered, duplicate-free collection of vocabulary tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet<T: Ord>(BTreeSet<T>);

impl<T: Ord> TagSet<T> {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Returns `false` when the tag was already present.
    pub fn insert(&mut self, tag: T) -> bool {
        self.0.insert(tag)
    }

    pub fn contains(&self, tag: &T) -> bool {
        self.0.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T: Ord + FromStr<Err = UnknownTag>> TagSet<T> {
    /// Parse raw tags, collapsing duplicates and aliases.
    pub fn parse<I, S>(tags: I) -> Result<Self, UnknownTag>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter()
            .map(|tag| tag.as_ref().parse::<T>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }
}

impl<T: Ord> Default for TagSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> FromIterator<T> for TagSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub type ObstructionSet = TagSet<Obstruction>;
pub type ContaminantSet = TagSet<Contaminant>;
pub type AmenitySet = TagSet<Amenity>;

/// SEGURIDAD answers: sidewalk existence, width, obstructions, traffic buffer, lighting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeguridadIntake {
    pub has_sidewalk: BooleanFlag,
    pub width_rating: Option<Rating>,
    #[serde(default)]
    pub obstructions: ObstructionSet,
    pub comfort_space_rating: Option<Rating>,
    pub has_lighting: BooleanFlag,
    pub lighting_rating: Option<Rating>,
}

impl SeguridadIntake {
    /// Lighting rating honoured only when lighting is confirmed present; a stale value left
    /// behind after the user flips `has_lighting` is ignored.
    pub fn effective_lighting_rating(&self) -> Option<Rating> {
        if self.has_lighting.is_yes() {
            self.lighting_rating
        } else {
            None
        }
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_sidewalk.is_known() {
            missing.push("hasSidewalk");
        }
        if self.width_rating.is_none() {
            missing.push("widthRating");
        }
        if self.comfort_space_rating.is_none() {
            missing.push("comfortSpaceRating");
        }
        if !self.has_lighting.is_known() {
            missing.push("hasLighting");
        }
        if self.has_lighting.is_yes() && self.lighting_rating.is_none() {
            missing.push("lightingRating");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// COMODIDAD answers: shade coverage and perceived contamination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComodidadIntake {
    pub shade_rating: Option<Rating>,
    #[serde(default)]
    pub contaminants: ContaminantSet,
    pub severity: Rating,
}

/// INTERESANTE answers: street-level commerce and overall vibe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteresanteIntake {
    pub has_commerce: BooleanFlag,
    pub commerce_count: u32,
    pub vibe_rating: Option<Rating>,
}

/// Full four-bucket questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkabilityBuckets {
    pub utilidad: AmenitySet,
    pub seguridad: SeguridadIntake,
    pub comodidad: ComodidadIntake,
    pub interesante: InteresanteIntake,
}

/// WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoPointRepr")]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, RangeError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(RangeError::Latitude(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(RangeError::Longitude(lng));
        }
        Ok(Self { lat, lng })
    }

    pub const fn lat(self) -> f64 {
        self.lat
    }

    pub const fn lng(self) -> f64 {
        self.lng
    }

    /// Key with five decimal places (about one metre), used for memoizing lookups.
    pub fn cache_key(self) -> String {
        format!("{:.5},{:.5}", self.lat, self.lng)
    }
}

#[derive(Deserialize)]
struct GeoPointRepr {
    lat: f64,
    lng: f64,
}

impl TryFrom<GeoPointRepr> for GeoPoint {
    type Error = RangeError;

    fn try_from(repr: GeoPointRepr) -> Result<Self, Self::Error> {
        Self::new(repr.lat, repr.lng)
    }
}

/// Report categories offered by the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    MissingSidewalk,
    NarrowSidewalk,
    BrokenPavement,
    ObstructionVehicle,
    ObstructionVendor,
    ObstructionConstruction,
    ObstructionBusiness,
    MissingCrossing,
    PoorLighting,
    SafetyConcern,
    AccessibilityIssue,
    PositiveFeedback,
}

impl ReportCategory {
    pub const fn tag(self) -> &'static str {
        match self {
            ReportCategory::MissingSidewalk => "missing_sidewalk",
            ReportCategory::NarrowSidewalk => "narrow_sidewalk",
            ReportCategory::BrokenPavement => "broken_pavement",
            ReportCategory::ObstructionVehicle => "obstruction_vehicle",
            ReportCategory::ObstructionVendor => "obstruction_vendor",
            ReportCategory::ObstructionConstruction => "obstruction_construction",
            ReportCategory::ObstructionBusiness => "obstruction_business",
            ReportCategory::MissingCrossing => "missing_crossing",
            ReportCategory::PoorLighting => "poor_lighting",
            ReportCategory::SafetyConcern => "safety_concern",
            ReportCategory::AccessibilityIssue => "accessibility_issue",
            ReportCategory::PositiveFeedback => "positive_feedback",
        }
    }
}

impl FromStr for ReportCategory {
    type Err = UnknownTag;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let category = match normalize_tag(raw).as_str() {
            "missing_sidewalk" => ReportCategory::MissingSidewalk,
            "narrow_sidewalk" => ReportCategory::NarrowSidewalk,
            "broken_pavement" => ReportCategory::BrokenPavement,
            "obstruction_vehicle" => ReportCategory::ObstructionVehicle,
            "obstruction_vendor" => ReportCategory::ObstructionVendor,
            "obstruction_construction" => ReportCategory::ObstructionConstruction,
            "obstruction_business" => ReportCategory::ObstructionBusiness,
            "missing_crossing" => ReportCategory::MissingCrossing,
            "poor_lighting" => ReportCategory::PoorLighting,
            "safety_concern" => ReportCategory::SafetyConcern,
            "accessibility_issue" => ReportCategory::AccessibilityIssue,
            "positive_feedback" => ReportCategory::PositiveFeedback,
            _ => {
                return Err(UnknownTag {
                    kind: "report category",
                    tag: raw.to_string(),
                })
            }
        };
        Ok(category)
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Moderation lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Verified,
    Resolved,
}

impl ReportStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::Resolved => "resolved",
        }
    }

    pub fn can_advance_to(self, next: ReportStatus) -> bool {
        next > self
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifier wrapper for persisted reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub String);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to the authenticated author supplied by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(pub String);

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
