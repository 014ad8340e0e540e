//! Route profiles and the route projector
//!
//! A single base risk and base distance are projected across the named route
//! variants so that Primary, Safer and Faster can be compared side by side.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{EngineError, Result};

/// Cruise speed used for travel time (km/h)
pub const AVG_SPEED_KMPH: f64 = 30.0;
/// Freight cost per km (₹)
pub const COST_PER_KM: f64 = 20.0;
/// CO2 emitted per km sailed (tonnes)
pub const CO2_PER_KM_TONS: f64 = 0.015;
/// Insurance premium per risk point (₹)
pub const INSURANCE_RISK_COEFF: f64 = 500.0;
/// Risk-induced delay at 100% risk (days)
pub const MAX_RISK_DELAY_DAYS: f64 = 4.0;

/// Names every deployed route table must define, in declaration order
pub const REQUIRED_ROUTES: [&str; 3] = ["Primary", "Safer", "Faster"];

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteProfile {
    pub name: String,
    pub distance_factor: f64,
    pub risk_factor: f64,
}

impl RouteProfile {
    pub fn new(name: &str, distance_factor: f64, risk_factor: f64) -> Self {
        Self {
            name: name.to_string(),
            distance_factor,
            risk_factor,
        }
    }

    fn validate(&self) -> Result<()> {
        for (label, factor) in [("distance_factor", self.distance_factor), ("risk_factor", self.risk_factor)] {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(EngineError::config(format!(
                    "route `{}` has non-positive {} ({})",
                    self.name, label, factor
                )));
            }
        }
        Ok(())
    }
}

/// Validated, ordered set of route profiles
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RouteTable {
    profiles: Vec<RouteProfile>,
}

impl RouteTable {
    /// Build a table; the names must be exactly Primary, Safer and Faster and
    /// every factor must be positive.
    pub fn new(profiles: Vec<RouteProfile>) -> Result<Self> {
        for profile in &profiles {
            profile.validate()?;
        }
        for required in REQUIRED_ROUTES {
            let count = profiles.iter().filter(|p| p.name == required).count();
            if count != 1 {
                return Err(EngineError::config(format!(
                    "route `{}` must be defined exactly once (found {})",
                    required, count
                )));
            }
        }
        if let Some(extra) = profiles.iter().find(|p| !REQUIRED_ROUTES.contains(&p.name.as_str())) {
            return Err(EngineError::config(format!("unexpected route profile `{}`", extra.name)));
        }
        Ok(Self { profiles })
    }

    /// Load a JSON array of profiles
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let profiles: Vec<RouteProfile> = serde_json::from_str(&raw)
            .map_err(|e| EngineError::config(format!("invalid route table {}: {}", path.display(), e)))?;
        let table = Self::new(profiles)?;
        info!(path = %path.display(), "loaded route profiles");
        Ok(table)
    }

    pub fn profiles(&self) -> &[RouteProfile] {
        &self.profiles
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            profiles: vec![
                RouteProfile::new("Primary", 1.0, 1.0),
                RouteProfile::new("Safer", 1.15, 0.7),
                RouteProfile::new("Faster", 0.9, 1.25),
            ],
        }
    }
}

/// Process-wide projection constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParams {
    pub avg_speed_kmph: f64,
    pub cost_per_km: f64,
    pub co2_per_km_tons: f64,
    pub insurance_risk_coeff: f64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            avg_speed_kmph: AVG_SPEED_KMPH,
            cost_per_km: COST_PER_KM,
            co2_per_km_tons: CO2_PER_KM_TONS,
            insurance_risk_coeff: INSURANCE_RISK_COEFF,
        }
    }
}

impl ProjectionParams {
    pub fn validate(&self) -> Result<()> {
        if !self.avg_speed_kmph.is_finite() || self.avg_speed_kmph <= 0.0 {
            return Err(EngineError::config("avg_speed_kmph must be positive"));
        }
        for (label, value) in [
            ("cost_per_km", self.cost_per_km),
            ("co2_per_km_tons", self.co2_per_km_tons),
            ("insurance_risk_coeff", self.insurance_risk_coeff),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::config(format!("{} must be non-negative", label)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteProjection {
    pub route_name: String,
    pub distance_km: f64,
    pub risk_pct: f64,
    pub delay_days: f64,
    pub eta: NaiveDateTime,
    pub cost: f64,
    pub co2_tons: f64,
    pub insurance: f64,
}

/// `departure` plus `hours`, rounded to whole seconds; `None` when the offset
/// does not fit a calendar date.
fn eta_after(departure: NaiveDateTime, hours: f64) -> Option<NaiveDateTime> {
    let secs = (hours * 3600.0).round();
    if !secs.is_finite() || secs.abs() >= i64::MAX as f64 {
        return None;
    }
    departure.checked_add_signed(Duration::try_seconds(secs as i64)?)
}

/// Project a base risk and distance across every route profile, in table order.
pub fn project(
    base_risk: f64,
    base_distance_km: f64,
    departure: NaiveDateTime,
    table: &RouteTable,
    params: &ProjectionParams,
) -> Result<Vec<RouteProjection>> {
    if !base_risk.is_finite() || base_risk < 0.0 {
        return Err(EngineError::schema("base_risk", format!("must be a non-negative number (got {})", base_risk)));
    }
    if !base_distance_km.is_finite() || base_distance_km <= 0.0 {
        return Err(EngineError::schema(
            "shipment_distance_km",
            format!("must be a positive number (got {})", base_distance_km),
        ));
    }
    params.validate()?;

    table
        .profiles()
        .iter()
        .map(|profile| {
            profile.validate()?;

            let distance_km = base_distance_km * profile.distance_factor;
            let risk_pct = round_to(base_risk * profile.risk_factor, 2).min(100.0);
            let delay_days = round_to(risk_pct / 100.0 * MAX_RISK_DELAY_DAYS, 1);

            let travel_hours = distance_km / params.avg_speed_kmph;
            let eta = eta_after(departure, travel_hours + delay_days * 24.0)
                .ok_or_else(|| EngineError::computation(format!("ETA overflow for route `{}`", profile.name)))?;

            let cost = round_to(distance_km * params.cost_per_km, 2);
            Ok(RouteProjection {
                route_name: profile.name.clone(),
                distance_km,
                risk_pct,
                delay_days,
                eta,
                cost,
                co2_tons: round_to(distance_km * params.co2_per_km_tons, 2),
                insurance: round_to(cost * 0.01 + risk_pct * params.insurance_risk_coeff, 2),
            })
        })
        .collect()
}

/// Weights of the balanced pick, applied to cost, transit time and risk
pub const BALANCED_WEIGHTS: (f64, f64, f64) = (0.4, 0.3, 0.3);

/// Best route per criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRanking {
    pub safest: String,
    pub fastest: String,
    pub cheapest: String,
    pub balanced: String,
}

/// First route with the minimum key; earlier routes win ties.
fn first_min_by(routes: &[RouteProjection], key: impl Fn(&RouteProjection) -> f64) -> Option<&RouteProjection> {
    routes.iter().min_by(|a, b| key(a).total_cmp(&key(b)))
}

/// Min-max scale to [0, 1]; a constant column scales to all zeros.
fn min_max(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    values
        .iter()
        .map(|v| if range > f64::EPSILON { (v - min) / range } else { 0.0 })
        .collect()
}

/// Weighted cost/time/risk pick. Each term is min-max scaled across the
/// routes first, otherwise cost (in currency units) swamps the other two.
fn balanced_pick(routes: &[RouteProjection]) -> Option<&RouteProjection> {
    let (w_cost, w_time, w_risk) = BALANCED_WEIGHTS;
    let column = |key: fn(&RouteProjection) -> f64| min_max(&routes.iter().map(key).collect::<Vec<_>>());
    let cost = column(|r| r.cost);
    // departure is shared, so arrival order is transit-time order
    let time = column(|r| r.eta.and_utc().timestamp() as f64);
    let risk = column(|r| r.risk_pct);

    let scores: Vec<f64> = (0..routes.len())
        .map(|i| w_cost * cost[i] + w_time * time[i] + w_risk * risk[i])
        .collect();
    let best = (0..routes.len()).min_by(|a, b| scores[*a].total_cmp(&scores[*b]))?;
    routes.get(best)
}

/// Rank projections by risk, delay, cost and the balanced score. Ties keep
/// table order.
pub fn rank(routes: &[RouteProjection]) -> Option<RouteRanking> {
    Some(RouteRanking {
        safest: first_min_by(routes, |r| r.risk_pct)?.route_name.clone(),
        fastest: first_min_by(routes, |r| r.delay_days)?.route_name.clone(),
        cheapest: first_min_by(routes, |r| r.cost)?.route_name.clone(),
        balanced: balanced_pick(routes)?.route_name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn departure() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(8, 0, 0).unwrap()
    }

    fn project_default(base_risk: f64) -> Vec<RouteProjection> {
        project(base_risk, 8500.0, departure(), &RouteTable::default(), &ProjectionParams::default()).unwrap()
    }

    #[test]
    fn test_default_table_is_valid() {
        let table = RouteTable::default();
        assert_eq!(RouteTable::new(table.profiles().to_vec()).unwrap(), table);
    }

    #[test]
    fn test_projection_values() {
        let routes = project_default(42.0);
        let names: Vec<&str> = routes.iter().map(|r| r.route_name.as_str()).collect();
        assert_eq!(names, REQUIRED_ROUTES);

        let primary = &routes[0];
        assert_eq!(primary.distance_km, 8500.0);
        assert_eq!(primary.risk_pct, 42.0);
        assert_eq!(primary.delay_days, 1.7);
        assert_eq!(primary.cost, 170_000.0);
        assert_eq!(primary.co2_tons, 127.5);
        assert_eq!(primary.insurance, 1700.0 + 42.0 * 500.0);

        // 8500 / 30 = 283.33h travel + 1.7 * 24 = 40.8h delay
        let expected = departure() + Duration::seconds(((8500.0 / 30.0 + 40.8) * 3600.0_f64).round() as i64);
        assert_eq!(primary.eta, expected);

        assert_eq!(routes[1].risk_pct, 29.4);
        assert_eq!(routes[2].risk_pct, 52.5);
        assert_eq!(routes[2].delay_days, 2.1);
    }

    #[test]
    fn test_risk_is_clamped() {
        for base in [0.0, 50.0, 79.99, 80.0, 99.0, 100.0, 250.0] {
            for r in project_default(base) {
                assert!(r.risk_pct <= 100.0, "{} -> {}", base, r.risk_pct);
                assert!(r.delay_days <= MAX_RISK_DELAY_DAYS);
            }
        }
        assert_eq!(project_default(90.0)[2].risk_pct, 100.0);
    }

    #[test]
    fn test_risk_increases_with_factor() {
        let run = |factor: f64| {
            let mut profiles = RouteTable::default().profiles().to_vec();
            profiles[1].risk_factor = factor;
            let table = RouteTable::new(profiles).unwrap();
            project(42.0, 8500.0, departure(), &table, &ProjectionParams::default()).unwrap()[1].risk_pct
        };
        assert!(run(0.6) < run(0.7));
        assert!(run(0.7) < run(1.3));
        assert_eq!(run(3.0), run(5.0));
    }

    #[test]
    fn test_invalid_profiles_are_config_errors() {
        let mut profiles = RouteTable::default().profiles().to_vec();
        profiles[2].risk_factor = 0.0;
        assert!(matches!(RouteTable::new(profiles), Err(EngineError::Config(_))));

        let mut profiles = RouteTable::default().profiles().to_vec();
        profiles[0].distance_factor = -1.0;
        assert!(matches!(RouteTable::new(profiles), Err(EngineError::Config(_))));

        let mut profiles = RouteTable::default().profiles().to_vec();
        profiles.pop();
        let err = RouteTable::new(profiles).unwrap_err();
        assert!(err.to_string().contains("Faster"));

        let mut profiles = RouteTable::default().profiles().to_vec();
        profiles.push(RouteProfile::new("Scenic", 1.4, 0.9));
        assert!(matches!(RouteTable::new(profiles), Err(EngineError::Config(_))));

        let mut profiles = RouteTable::default().profiles().to_vec();
        profiles.push(RouteProfile::new("Safer", 1.2, 0.6));
        assert!(matches!(RouteTable::new(profiles), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let table = RouteTable::default();
        let params = ProjectionParams::default();
        assert!(project(-1.0, 8500.0, departure(), &table, &params).is_err());
        assert!(project(f64::NAN, 8500.0, departure(), &table, &params).is_err());
        assert!(project(40.0, 0.0, departure(), &table, &params).is_err());

        let slow = ProjectionParams {
            avg_speed_kmph: 0.0,
            ..ProjectionParams::default()
        };
        assert!(matches!(
            project(40.0, 8500.0, departure(), &table, &slow),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_ranking() {
        let ranking = rank(&project_default(42.0)).unwrap();
        assert_eq!(ranking.safest, "Safer");
        assert_eq!(ranking.fastest, "Safer");
        assert_eq!(ranking.cheapest, "Faster");
        assert_eq!(ranking.balanced, "Faster");
    }

    #[test]
    fn test_ranking_ties_keep_table_order() {
        // zero risk: every route has 0 risk and 0 delay
        let ranking = rank(&project_default(0.0)).unwrap();
        assert_eq!(ranking.safest, "Primary");
        assert_eq!(ranking.fastest, "Primary");
        assert!(rank(&[]).is_none());
    }

    #[test]
    fn test_balanced_pick_weighs_all_terms() {
        // near-equal distances: the safer route wins on risk and transit time
        let table = RouteTable::new(vec![
            RouteProfile::new("Primary", 1.0, 1.0),
            RouteProfile::new("Safer", 1.01, 0.5),
            RouteProfile::new("Faster", 0.99, 1.5),
        ])
        .unwrap();
        let routes = project(40.0, 8500.0, departure(), &table, &ProjectionParams::default()).unwrap();
        let ranking = rank(&routes).unwrap();
        assert_eq!(ranking.cheapest, "Faster");
        assert_eq!(ranking.balanced, "Safer");
    }

    #[test]
    fn test_min_max_constant_column() {
        assert_eq!(min_max(&[3.0, 3.0]), vec![0.0, 0.0]);
        assert_eq!(min_max(&[1.0, 3.0, 2.0]), vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_huge_distance_is_computation_error() {
        let table = RouteTable::default();
        let params = ProjectionParams::default();
        for distance in [1e14, 1e300] {
            let result = project(42.0, distance, departure(), &table, &params);
            assert!(matches!(result, Err(EngineError::Computation(_))), "distance {}", distance);
        }
        // fits in a Duration but not in the calendar
        assert!(matches!(
            project(42.0, 1e12, departure(), &table, &params),
            Err(EngineError::Computation(_))
        ));
    }

    #[test]
    fn test_load_table() {
        let dir = std::env::temp_dir().join(format!("cargo_guard_routes_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("routes.json");

        std::fs::write(&path, serde_json::to_string(&RouteTable::default()).unwrap()).unwrap();
        assert_eq!(RouteTable::load(&path).unwrap(), RouteTable::default());

        std::fs::write(&path, r#"[{"name": "Primary", "distance_factor": 1.0, "risk_factor": 1.0}]"#).unwrap();
        assert!(matches!(RouteTable::load(&path), Err(EngineError::Config(_))));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
