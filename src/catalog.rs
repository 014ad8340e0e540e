//! Shipping vocabularies known at training time
//! Ship types, cargo categories and ports (with coordinates for display and
//! synthetic distance generation)

use std::collections::HashMap;
use std::sync::LazyLock;

pub const SHIP_TYPES: [&str; 8] = [
    "Reefer Ship",
    "Bulk Carrier",
    "General Cargo Ship",
    "LNG Carrier",
    "Chemical Tanker",
    "Oil Tanker",
    "Container Ship",
    "Ro-Ro Ship",
];

pub const PRODUCT_CATEGORIES: [&str; 8] = [
    "Food",
    "Automobile",
    "Pharma",
    "Machinery",
    "FMCG",
    "Chemicals",
    "Electronics",
    "Crude Oil",
];

/// Port coordinates - maps port name to (latitude, longitude)
pub static PORT_COORDS: LazyLock<HashMap<&'static str, (f64, f64)>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // Indian west coast
    m.insert("Mumbai Port", (19.0760, 72.8777));
    m.insert("JNPT Port", (18.9499, 72.9528));
    m.insert("Kandla Port", (23.0339, 70.2204));
    m.insert("Kochi Port", (9.9312, 76.2673));

    // Indian east coast
    m.insert("Chennai Port", (13.0827, 80.2707));
    m.insert("Paradip Port", (20.3166, 86.6114));
    m.insert("Tuticorin Port", (8.7642, 78.1348));
    m.insert("Vizag Port", (17.6868, 83.2185));

    // International
    m.insert("Rotterdam", (51.9244, 4.4777));
    m.insert("Singapore", (1.2644, 103.8200));
    m.insert("Dubai", (25.2769, 55.2962));

    m
});

/// Sorted port names, for deterministic iteration
pub fn port_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = PORT_COORDS.keys().copied().collect();
    names.sort_unstable();
    names
}

pub fn port_coordinates(port: &str) -> Option<(f64, f64)> {
    PORT_COORDS.get(port).copied()
}

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two ports, `None` if either is unknown
pub fn great_circle_km(origin: &str, destination: &str) -> Option<f64> {
    let (lat1, lon1) = port_coordinates(origin)?;
    let (lat2, lon2) = port_coordinates(destination)?;

    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    Some(2.0 * EARTH_RADIUS_KM * a.sqrt().asin())
}

/// Typical sea distance for a port pair with no table entry
pub const DEFAULT_ROUTE_DISTANCE_KM: f64 = 8000.0;

/// Average leg length used to estimate port calls
pub const KM_PER_PORT_CALL: f64 = 1500.0;

/// Known sea-route distances in km, one entry per unordered pair
const ROUTE_DISTANCES: [(&str, &str, f64); 4] = [
    ("Mumbai Port", "Rotterdam", 12000.0),
    ("Mumbai Port", "Singapore", 4200.0),
    ("Mumbai Port", "Dubai", 3000.0),
    ("Chennai Port", "Singapore", 3600.0),
];

/// Sea-route distance between two ports. Either direction matches a table
/// entry; anything else gets `DEFAULT_ROUTE_DISTANCE_KM`.
pub fn route_distance_km(origin: &str, destination: &str) -> f64 {
    ROUTE_DISTANCES
        .iter()
        .find(|(a, b, _)| (*a == origin && *b == destination) || (*a == destination && *b == origin))
        .map(|(_, _, km)| *km)
        .unwrap_or(DEFAULT_ROUTE_DISTANCE_KM)
}

/// Expected number of port calls for a voyage, at least 2
pub fn estimate_ports(distance_km: f64) -> u32 {
    ((distance_km / KM_PER_PORT_CALL) as u32).max(2)
}
