//! Caching and pacing in front of an external geocoding service.
//!
//! No HTTP client ships with the crate. Callers implement [`Geocoder`] over whichever
//! provider they use and wrap it in [`CachedGeocoder`], which memoizes search and reverse
//! lookups and keeps outbound calls at least [`GeocodingConfig::min_interval`] apart.

mod address;
mod cache;
mod limiter;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeocodingConfig;
use crate::workflows::reports::GeoPoint;

pub use address::{
    format_address, normalize_query, parse_bounding_box, road_name, AddressParts, BoundingBox,
};
pub use cache::GeocodeCache;
pub use limiter::RequestLimiter;

/// A single place as returned by an OpenStreetMap-style geocoder.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPlace {
    #[serde(default)]
    pub place_id: Option<u64>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub boundingbox: Option<Vec<String>>,
    #[serde(default)]
    pub address: Option<AddressParts>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub lat: f64,
    pub lng: f64,
    pub address_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub road_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl Place {
    /// Normalize a raw result. Results without parseable in-range coordinates are dropped.
    pub fn from_raw(raw: &RawPlace) -> Option<Self> {
        let lat = raw.lat.trim().parse::<f64>().ok()?;
        let lng = raw.lon.trim().parse::<f64>().ok()?;
        let point = GeoPoint::new(lat, lng).ok()?;
        Some(Self::at(point, raw))
    }

    fn at(point: GeoPoint, raw: &RawPlace) -> Self {
        Self {
            lat: point.lat(),
            lng: point.lng(),
            address_label: format_address(raw.display_name.as_deref(), raw.address.as_ref()),
            road_name: road_name(raw.address.as_ref()),
            bounding_box: raw.boundingbox.as_deref().and_then(parse_bounding_box),
        }
    }

    pub fn point(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.lat, self.lng).ok()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
    #[error("geocoder rejected the request: {0}")]
    Rejected(String),
}

/// Provider seam. Implementations perform a single outbound lookup with no caching.
pub trait Geocoder: Send + Sync {
    fn search(&self, query: &str) -> Result<Vec<RawPlace>, GeocodeError>;
    fn reverse(&self, point: GeoPoint) -> Result<Option<RawPlace>, GeocodeError>;
}

pub struct CachedGeocoder<G> {
    inner: Arc<G>,
    limiter: RequestLimiter,
    searches: GeocodeCache<Vec<Place>>,
    reverses: GeocodeCache<Option<Place>>,
}

impl<G> CachedGeocoder<G>
where
    G: Geocoder + 'static,
{
    pub fn new(inner: Arc<G>, config: &GeocodingConfig) -> Self {
        Self {
            inner,
            limiter: RequestLimiter::new(config.min_interval),
            searches: GeocodeCache::new(config.cache_ttl, config.cache_capacity),
            reverses: GeocodeCache::new(config.cache_ttl, config.cache_capacity),
        }
    }

    /// Free-text place search. Blank queries short-circuit without touching the provider.
    pub async fn search(&self, query: &str) -> Result<Vec<Place>, GeocodeError> {
        let key = normalize_query(query);
        if key.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(hit) = self.searches.get(&key) {
            debug!(query = %key, "geocode search cache hit");
            return Ok(hit);
        }

        self.limiter.acquire().await;
        let places: Vec<Place> = self
            .inner
            .search(query.trim())?
            .iter()
            .filter_map(Place::from_raw)
            .collect();
        self.searches.insert(key, places.clone());
        Ok(places)
    }

    /// Reverse lookup. The returned place keeps the requested coordinates rather than the
    /// provider's snapped ones. "Nothing here" answers are cached like hits; errors are not.
    pub async fn reverse(&self, point: GeoPoint) -> Result<Option<Place>, GeocodeError> {
        let key = point.cache_key();
        if let Some(hit) = self.reverses.get(&key) {
            debug!(key = %key, "geocode reverse cache hit");
            return Ok(hit);
        }

        self.limiter.acquire().await;
        let place = self
            .inner
            .reverse(point)?
            .map(|raw| Place::at(point, &raw));
        self.reverses.insert(key, place.clone());
        Ok(place)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct CountingGeocoder {
        searches: AtomicUsize,
        reverses: AtomicUsize,
        offline: bool,
    }

    fn bella_vista() -> RawPlace {
        let address: BTreeMap<String, String> = [
            ("road", "Vía España"),
            ("house_number", "120"),
            ("suburb", "Bella Vista"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
        RawPlace {
            place_id: Some(42),
            display_name: Some("Vía España, Bella Vista, Panamá".to_string()),
            lat: "8.98241".to_string(),
            lon: "-79.51993".to_string(),
            boundingbox: Some(vec![
                "8.98".to_string(),
                "8.99".to_string(),
                "-79.53".to_string(),
                "-79.51".to_string(),
            ]),
            address: Some(address),
        }
    }

    impl Geocoder for CountingGeocoder {
        fn search(&self, _query: &str) -> Result<Vec<RawPlace>, GeocodeError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if self.offline {
                return Err(GeocodeError::Unavailable("offline".to_string()));
            }
            let broken = RawPlace {
                lat: "not-a-number".to_string(),
                ..bella_vista()
            };
            Ok(vec![bella_vista(), broken])
        }

        fn reverse(&self, _point: GeoPoint) -> Result<Option<RawPlace>, GeocodeError> {
            self.reverses.fetch_add(1, Ordering::SeqCst);
            if self.offline {
                return Err(GeocodeError::Unavailable("offline".to_string()));
            }
            Ok(Some(bella_vista()))
        }
    }

    fn config() -> GeocodingConfig {
        GeocodingConfig {
            cache_ttl: Duration::from_secs(600),
            cache_capacity: 8,
            min_interval: Duration::ZERO,
        }
    }

    #[test]
    fn loaded_config_drives_cache_and_pacing() {
        let config = GeocodingConfig {
            cache_ttl: Duration::from_secs(30),
            cache_capacity: 1,
            min_interval: Duration::from_millis(1_100),
        };
        let geocoder = CachedGeocoder::new(Arc::new(CountingGeocoder::default()), &config);

        assert_eq!(geocoder.limiter.min_interval(), config.min_interval);
        geocoder.reverses.insert("a", None);
        geocoder.reverses.insert("b", None);
        assert_eq!(geocoder.reverses.len(), 1);
    }

    #[tokio::test]
    async fn search_results_are_cached_by_normalized_query() {
        let inner = Arc::new(CountingGeocoder::default());
        let geocoder = CachedGeocoder::new(Arc::clone(&inner), &config());

        let first = geocoder.search("  Vía España ").await.expect("search");
        let second = geocoder.search("vía españa").await.expect("search");

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(first[0].address_label, "Vía España 120, Bella Vista");
        assert_eq!(first[0].road_name.as_deref(), Some("Vía España"));
        assert!(first[0].bounding_box.is_some());
        assert_eq!(inner.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_search_skips_the_provider() {
        let inner = Arc::new(CountingGeocoder::default());
        let geocoder = CachedGeocoder::new(Arc::clone(&inner), &config());

        assert!(geocoder.search("   ").await.expect("search").is_empty());
        assert_eq!(inner.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reverse_keeps_requested_point_and_caches_nearby_lookups() {
        let inner = Arc::new(CountingGeocoder::default());
        let geocoder = CachedGeocoder::new(Arc::clone(&inner), &config());
        let point = GeoPoint::new(8.982400, -79.519900).expect("point");
        let nearby = GeoPoint::new(8.9824001, -79.5199002).expect("point");

        let place = geocoder
            .reverse(point)
            .await
            .expect("reverse")
            .expect("place");
        geocoder.reverse(nearby).await.expect("reverse");

        assert_eq!(place.lat, 8.9824);
        assert_eq!(place.lng, -79.5199);
        assert_eq!(inner.reverses.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_errors_propagate_and_are_not_cached() {
        let inner = Arc::new(CountingGeocoder {
            offline: true,
            ..CountingGeocoder::default()
        });
        let geocoder = CachedGeocoder::new(Arc::clone(&inner), &config());
        let point = GeoPoint::new(8.99, -79.52).expect("point");

        assert!(matches!(
            geocoder.reverse(point).await,
            Err(GeocodeError::Unavailable(_))
        ));
        assert!(geocoder.reverse(point).await.is_err());
        assert_eq!(inner.reverses.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn raw_places_outside_the_globe_are_dropped() {
        let raw = RawPlace {
            lat: "91.0".to_string(),
            ..bella_vista()
        };
        assert!(Place::from_raw(&raw).is_none());
        assert!(Place::from_raw(&bella_vista()).is_some());
    }
}
