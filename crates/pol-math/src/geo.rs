//! Spherical geometry over latitude/longitude coordinate sets.
//!
//! All public distances are meters on a spherical Earth. Longitudes enter
//! every formula through trigonometric differences, so results are stable
//! across the antimeridian and near the poles.

use std::collections::HashSet;

/// Spherical Earth radius used for point-to-point distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// IUGG mean Earth radius, used to convert a metric neighborhood radius to a
/// unit-sphere central angle.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance between two coordinates, in meters.
///
/// Inputs are degrees. Returns NaN if any coordinate is NaN.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    central_angle_rad(
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    ) * EARTH_RADIUS_M
}

/// Haversine central angle between two points given in radians.
///
/// This is the unit-sphere distance; multiply by a radius to get meters.
pub fn central_angle_rad(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Spherical center of mass of a coordinate set, optionally weighted.
///
/// Coordinates are averaged as unit-sphere Cartesian vectors and converted
/// back to (lat, lon) degrees. Returns None for empty input, mismatched
/// slice lengths, or a non-positive total weight.
pub fn center_of_mass(lats: &[f64], lons: &[f64], weights: Option<&[f64]>) -> Option<(f64, f64)> {
    if lats.is_empty() || lats.len() != lons.len() {
        return None;
    }
    if let Some(w) = weights {
        if w.len() != lats.len() {
            return None;
        }
    }

    let mut x = 0.0;
    let mut y = 0.0;
    let mut z = 0.0;
    let mut total_weight = 0.0;
    for i in 0..lats.len() {
        let w = weights.map_or(1.0, |w| w[i]);
        let lat = lats[i].to_radians();
        let lon = lons[i].to_radians();
        x += lat.cos() * lon.cos() * w;
        y += lat.cos() * lon.sin() * w;
        z += lat.sin() * w;
        total_weight += w;
    }
    if total_weight <= 0.0 {
        return None;
    }
    x /= total_weight;
    y /= total_weight;
    z /= total_weight;

    let lon = y.atan2(x);
    let hyp = (x * x + y * y).sqrt();
    let lat = z.atan2(hyp);
    Some((lat.to_degrees(), lon.to_degrees()))
}

/// Radius of gyration in meters: root-mean-square great-circle distance of
/// the coordinate set from its spherical center of mass.
///
/// The unweighted form deduplicates identical coordinate pairs first, so a
/// position visited many times contributes once to the spread. Returns None
/// under the same conditions as [`center_of_mass`].
pub fn radius_of_gyration_m(
    lats: &[f64],
    lons: &[f64],
    weights: Option<&[f64]>,
) -> Option<f64> {
    let (ulats, ulons);
    let (lats, lons, weights) = match weights {
        Some(w) => (lats, lons, Some(w)),
        None => {
            let mut seen = HashSet::new();
            let mut la = Vec::with_capacity(lats.len());
            let mut lo = Vec::with_capacity(lons.len());
            for (&lat, &lon) in lats.iter().zip(lons.iter()) {
                if seen.insert((lat.to_bits(), lon.to_bits())) {
                    la.push(lat);
                    lo.push(lon);
                }
            }
            ulats = la;
            ulons = lo;
            (ulats.as_slice(), ulons.as_slice(), None)
        }
    };

    let (cm_lat, cm_lon) = center_of_mass(lats, lons, weights)?;
    let mut sum_sq = 0.0;
    let mut total_weight = 0.0;
    for i in 0..lats.len() {
        let w = weights.map_or(1.0, |w| w[i]);
        let d = haversine_distance_m(lats[i], lons[i], cm_lat, cm_lon);
        sum_sq += d * d * w;
        total_weight += w;
    }
    Some((sum_sq / total_weight).sqrt())
}

/// Member coordinate closest to the planar centroid of the set.
///
/// The centroid is the arithmetic mean of (lat, lon); the returned pair is
/// the actual member minimizing great-circle distance to it, so the result
/// always corresponds to an observed position. First minimum wins on ties.
/// Returns None for empty input or mismatched slice lengths.
pub fn centermost_point(lats: &[f64], lons: &[f64]) -> Option<(f64, f64)> {
    if lats.is_empty() || lats.len() != lons.len() {
        return None;
    }
    let n = lats.len() as f64;
    let mean_lat = lats.iter().sum::<f64>() / n;
    let mean_lon = lons.iter().sum::<f64>() / n;

    let mut best = (lats[0], lons[0]);
    let mut best_dist = f64::INFINITY;
    for (&lat, &lon) in lats.iter().zip(lons.iter()) {
        let d = haversine_distance_m(lat, lon, mean_lat, mean_lon);
        if d < best_dist {
            best_dist = d;
            best = (lat, lon);
        }
    }
    Some(best)
}
