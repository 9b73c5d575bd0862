///! Batch SGP4 propagation of element sets to geodetic position samples
use super::types::{ElementSet, PositionSample, SelectionEntry};
use chrono::{DateTime, Utc};

/// WGS-84 flattening factor
const FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Mean Earth radius in meters, used for great-circle surface distance
const EARTH_MEAN_RADIUS_M: f64 = 6_371_000.0;

/// Observer geodetic location, degrees
#[derive(Debug, Clone, Copy)]
pub struct Observer {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

/// Geodetic position in the units the conversion produces: radians and km
struct GeodeticPosition {
    latitude_rad: f64,
    longitude_rad: f64,
    height_km: f64,
}

/// Propagate a batch of selection entries to a single instant.
///
/// Each entry is processed independently: a TLE parse failure, a propagation
/// failure or a non-finite result skips that entry only and never aborts the
/// batch. Output preserves the input entry order. Pure function of its
/// inputs; nothing is mutated.
pub fn compute_positions(
    entries: &[SelectionEntry],
    at: DateTime<Utc>,
    observer: Option<Observer>,
) -> Vec<PositionSample> {
    let gmst = gmst_at(at);

    let mut samples = Vec::with_capacity(entries.len());
    for entry in entries {
        match compute_sample(entry, at, gmst, observer) {
            Some(sample) => samples.push(sample),
            None => tracing::debug!("Skipping catalog id {} (propagation failed)", entry.catalog_id),
        }
    }
    samples
}

/// Propagate a single candidate element set and return its great-circle
/// distance from the observer in meters. Used by the nearest-N ingestion
/// filter; None when the candidate cannot be propagated.
pub fn candidate_distance_m(set: &ElementSet, at: DateTime<Utc>, observer: Observer) -> Option<f64> {
    let gmst = gmst_at(at);
    let (latitude_deg, longitude_deg, _altitude_m) = propagate_lines(&set.line1, &set.line2, at, gmst)?;
    Some(haversine_distance_m(
        observer.latitude_deg,
        observer.longitude_deg,
        latitude_deg,
        longitude_deg,
    ))
}

fn compute_sample(
    entry: &SelectionEntry,
    at: DateTime<Utc>,
    gmst: f64,
    observer: Option<Observer>,
) -> Option<PositionSample> {
    let (latitude_deg, longitude_deg, altitude_m) = propagate_lines(&entry.line1, &entry.line2, at, gmst)?;

    let distance_m = observer.map(|obs| {
        haversine_distance_m(obs.latitude_deg, obs.longitude_deg, latitude_deg, longitude_deg)
    });

    Some(PositionSample {
        index: entry.index,
        catalog_id: entry.catalog_id,
        name: entry
            .name
            .clone()
            .unwrap_or_else(|| format!("Satellite {}", entry.catalog_id)),
        latitude_deg,
        longitude_deg,
        altitude_m,
        distance_m,
    })
}

/// Parse, propagate and convert one element pair; None on any failure or
/// non-finite intermediate.
fn propagate_lines(line1: &str, line2: &str, at: DateTime<Utc>, gmst: f64) -> Option<(f64, f64, f64)> {
    let elements = sgp4::Elements::from_tle(None, line1.as_bytes(), line2.as_bytes()).ok()?;
    let constants = sgp4::Constants::from_elements(&elements).ok()?;
    let minutes = elements.datetime_to_minutes_since_epoch(&at.naive_utc()).ok()?;
    let prediction = constants.propagate(minutes).ok()?;

    if !prediction.position.iter().all(|v| v.is_finite()) {
        return None;
    }

    let geodetic = eci_to_geodetic(&prediction.position, gmst);
    let latitude_deg = geodetic.latitude_rad.to_degrees();
    let longitude_deg = normalize_longitude(geodetic.longitude_rad.to_degrees());
    let altitude_m = geodetic.height_km * 1000.0;

    if !latitude_deg.is_finite() || !longitude_deg.is_finite() || !altitude_m.is_finite() {
        return None;
    }

    Some((latitude_deg, longitude_deg, altitude_m))
}

/// Greenwich Mean Sidereal Time in radians at a UTC instant
fn gmst_at(at: DateTime<Utc>) -> f64 {
    sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&at.naive_utc()))
}

/// ECI (TEME) position in km to geodetic coordinates, rotating by GMST and
/// iterating latitude on the WGS-84 ellipsoid.
fn eci_to_geodetic(position: &[f64; 3], gmst: f64) -> GeodeticPosition {
    let e2 = FLATTENING * (2.0 - FLATTENING);
    let theta = position[1].atan2(position[0]);
    let r = (position[0] * position[0] + position[1] * position[1]).sqrt();

    let longitude_rad = wrap_pi(theta - gmst);
    let mut latitude_rad = position[2].atan2(r);
    let mut c = 1.0;

    for _ in 0..10 {
        let phi = latitude_rad;
        c = 1.0 / (1.0 - e2 * phi.sin() * phi.sin()).sqrt();
        latitude_rad = (position[2] + sgp4::WGS84.ae * c * e2 * phi.sin()).atan2(r);
        if (latitude_rad - phi).abs() < 1e-10 {
            break;
        }
    }

    let height_km = r / latitude_rad.cos() - sgp4::WGS84.ae * c;

    GeodeticPosition {
        latitude_rad,
        longitude_rad,
        height_km,
    }
}

/// Great-circle surface distance in meters (spherical law of haversines)
pub fn haversine_distance_m(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let dlat = (lat2_deg - lat1_deg).to_radians();
    let dlon = (lon2_deg - lon1_deg).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_MEAN_RADIUS_M * c
}

/// Wrap an angle to [-pi, pi)
fn wrap_pi(angle: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    (angle + std::f64::consts::PI).rem_euclid(two_pi) - std::f64::consts::PI
}

/// Canonical longitude branch [-180, 180)
fn normalize_longitude(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}
