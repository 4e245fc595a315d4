//! Collaborator contracts for geocoding and driving directions.
//!
//! The engine never talks to a network service directly. It consumes a
//! [`Geocoder`] and a [`DirectionsProvider`]; this module also ships a JSON
//! backed [`FixtureProvider`] implementing both, and [`CachingGeocoder`],
//! which memoises successful lookups of any geocoder.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::cache::normalize_address;
use crate::distance::Coordinate;
use crate::error::{Error, Result};
use crate::graph::parse_polyline;

/// Tolerance, in degrees, when matching fixture route endpoints.
const ENDPOINT_TOLERANCE: f64 = 1e-6;

/// Geocoder answer for one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedAddress {
    pub lng: f64,
    pub lat: f64,
    #[serde(default)]
    pub display_name: String,
}

impl GeocodedAddress {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// One candidate driving route between a start and an end point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteVariant {
    /// Ordered polyline vertices.
    pub coords: Vec<Coordinate>,
    /// Provider-reported length in meters.
    pub distance: f64,
    /// Provider-reported duration in seconds.
    pub duration: f64,
    /// Variant tag such as `direct`, `waypoint_0` or `strategy_2`.
    pub route_type: String,
    #[serde(default)]
    pub route_name: String,
}

/// Resolves free-text addresses to coordinates.
///
/// Resolution is best effort: `None` means the address could not be
/// resolved and the caller treats it as an input error.
pub trait Geocoder: Send + Sync {
    fn resolve(&self, address: &str) -> Option<GeocodedAddress>;
}

/// Fetches every route variant the provider offers between two points.
///
/// An empty list signals failure.
pub trait DirectionsProvider: Send + Sync {
    fn multi_route(&self, start: Coordinate, end: Coordinate) -> Vec<RouteVariant>;
}

impl<T: Geocoder + ?Sized> Geocoder for Arc<T> {
    fn resolve(&self, address: &str) -> Option<GeocodedAddress> {
        (**self).resolve(address)
    }
}

impl<T: DirectionsProvider + ?Sized> DirectionsProvider for Arc<T> {
    fn multi_route(&self, start: Coordinate, end: Coordinate) -> Vec<RouteVariant> {
        (**self).multi_route(start, end)
    }
}

/// Memoises successful resolutions of an inner geocoder.
///
/// Failures are not remembered so a transient miss can succeed later.
#[derive(Debug)]
pub struct CachingGeocoder<G> {
    inner: G,
    memo: Mutex<HashMap<String, GeocodedAddress>>,
}

impl<G: Geocoder> CachingGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Number of memoised addresses.
    pub fn len(&self) -> usize {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<G: Geocoder> Geocoder for CachingGeocoder<G> {
    fn resolve(&self, address: &str) -> Option<GeocodedAddress> {
        let key = normalize_address(address);
        if let Some(hit) = self
            .memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Some(hit.clone());
        }

        let resolved = self.inner.resolve(address)?;
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, resolved.clone());
        Some(resolved)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    addresses: HashMap<String, GeocodedAddress>,
    #[serde(default)]
    routes: Vec<FixtureRoute>,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureRoute {
    start: Coordinate,
    end: Coordinate,
    variants: Vec<FixtureVariant>,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureVariant {
    route_type: String,
    #[serde(default)]
    route_name: String,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    /// `lng,lat;lng,lat` text form.
    polyline: String,
}

impl From<&FixtureVariant> for RouteVariant {
    fn from(variant: &FixtureVariant) -> Self {
        RouteVariant {
            coords: parse_polyline(&variant.polyline),
            distance: variant.distance,
            duration: variant.duration,
            route_type: variant.route_type.clone(),
            route_name: variant.route_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct FixtureEntry {
    start: Coordinate,
    end: Coordinate,
    variants: Vec<RouteVariant>,
}

/// Geocoder and directions provider backed by a JSON fixture.
///
/// ```json
/// {
///   "addresses": { "Xiangtan University": { "lng": 112.86, "lat": 27.88, "display_name": "..." } },
///   "routes": [
///     { "start": { "lat": 27.88, "lng": 112.86 }, "end": { "lat": 27.83, "lng": 112.94 },
///       "variants": [ { "route_type": "direct", "distance": 9000, "duration": 900,
///                       "polyline": "112.86,27.88;112.94,27.83" } ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixtureProvider {
    addresses: HashMap<String, GeocodedAddress>,
    routes: Vec<FixtureEntry>,
}

impl FixtureProvider {
    /// Load a fixture file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| Error::FixtureLoad {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let provider = Self::from_json(&raw).map_err(|err| Error::FixtureLoad {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        tracing::debug!(
            path = %path.display(),
            addresses = provider.addresses.len(),
            routes = provider.routes.len(),
            "loaded fixture provider"
        );
        Ok(provider)
    }

    /// Parse fixture JSON.
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: FixtureFile = serde_json::from_str(raw)?;
        let addresses = file
            .addresses
            .into_iter()
            .map(|(address, geocoded)| (normalize_address(&address), geocoded))
            .collect();
        let routes = file
            .routes
            .iter()
            .map(|route| FixtureEntry {
                start: route.start,
                end: route.end,
                variants: route.variants.iter().map(RouteVariant::from).collect(),
            })
            .collect();
        Ok(Self { addresses, routes })
    }

    /// Addresses the fixture can resolve, sorted.
    pub fn known_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.addresses.keys().cloned().collect();
        addresses.sort();
        addresses
    }
}

impl Geocoder for FixtureProvider {
    fn resolve(&self, address: &str) -> Option<GeocodedAddress> {
        self.addresses.get(&normalize_address(address)).cloned()
    }
}

impl DirectionsProvider for FixtureProvider {
    fn multi_route(&self, start: Coordinate, end: Coordinate) -> Vec<RouteVariant> {
        self.routes
            .iter()
            .find(|route| same_point(route.start, start) && same_point(route.end, end))
            .map(|route| route.variants.clone())
            .unwrap_or_default()
    }
}

fn same_point(a: Coordinate, b: Coordinate) -> bool {
    (a.lat - b.lat).abs() <= ENDPOINT_TOLERANCE && (a.lng - b.lng).abs() <= ENDPOINT_TOLERANCE
}
