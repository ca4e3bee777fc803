//! Spatial clustering of stay points into locations.
//!
//! Runs density-based clustering over the full stay-point history of one
//! subject, drops noise, and merges cluster id, representative coordinate,
//! and member stay fields into a location-visit table sorted by arrival.
//!
//! The representative coordinate of a cluster is its **centermost point**:
//! the member position nearest the cluster's planar centroid, so it always
//! corresponds to an observed stay rather than a synthetic mean.

mod dbscan;

use std::collections::BTreeMap;

use pol_common::{LocationVisit, Result, StayPoint};
use pol_math::{centermost_point, EARTH_MEAN_RADIUS_M};

use crate::config::ClusterConfig;

/// Output of one clustering run.
#[derive(Debug, Clone)]
pub struct ClusteredLocations {
    /// One row per member stay point, sorted by arrival time.
    pub visits: Vec<LocationVisit>,
    /// Number of discovered locations.
    pub n_clusters: usize,
    /// Davies-Bouldin separation score; lower is better. Defined only when
    /// at least two clusters exist.
    pub quality: Option<f64>,
}

/// Density clusterer over one subject's stay points.
#[derive(Debug, Clone)]
pub struct StayPointClusterer {
    config: ClusterConfig,
}

impl StayPointClusterer {
    /// Create a clusterer, validating the configuration up front.
    pub fn new(config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        Ok(StayPointClusterer { config })
    }

    /// Group stay points into locations.
    ///
    /// Returns `None` with a warning for degenerate input: fewer than two
    /// stay points, or a run where every point lands in noise.
    pub fn cluster(&self, stay_points: &[StayPoint]) -> Option<ClusteredLocations> {
        if stay_points.len() < 2 {
            tracing::warn!(
                n_stay_points = stay_points.len(),
                "too few stay points to cluster"
            );
            return None;
        }

        let lats_rad: Vec<f64> = stay_points.iter().map(|s| s.lat.to_radians()).collect();
        let lons_rad: Vec<f64> = stay_points.iter().map(|s| s.lon.to_radians()).collect();
        let eps_rad = self.config.distance_m / EARTH_MEAN_RADIUS_M;

        let labels = dbscan::dbscan(&lats_rad, &lons_rad, eps_rad, self.config.min_k);

        // Group member indices per cluster id; noise drops out here.
        let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, label) in labels.iter().enumerate() {
            if let Some(id) = label {
                members.entry(*id).or_default().push(idx);
            }
        }
        if members.is_empty() {
            tracing::warn!(
                n_stay_points = stay_points.len(),
                distance_m = self.config.distance_m,
                min_k = self.config.min_k,
                "clustering produced only noise; consider relaxing parameters"
            );
            return None;
        }

        let mut visits = Vec::with_capacity(stay_points.len());
        let mut cluster_coords: Vec<Vec<(f64, f64)>> = Vec::with_capacity(members.len());
        for (id, idxs) in &members {
            let lats: Vec<f64> = idxs.iter().map(|&i| stay_points[i].lat).collect();
            let lons: Vec<f64> = idxs.iter().map(|&i| stay_points[i].lon).collect();
            // Non-empty by construction.
            let (centroid_lat, centroid_lon) = centermost_point(&lats, &lons)?;
            tracing::trace!(
                location_id = id,
                n_members = idxs.len(),
                centroid_lat,
                centroid_lon,
                "location formed"
            );

            for &i in idxs {
                let sp = &stay_points[i];
                visits.push(LocationVisit {
                    subject_id: sp.subject_id.clone(),
                    location_id: *id as u32,
                    centroid_lat,
                    centroid_lon,
                    arrived: sp.arrived,
                    lat: sp.lat,
                    lon: sp.lon,
                    departed: sp.departed,
                    duration_minutes: sp.duration_minutes,
                    n_points: sp.n_points,
                });
            }
            cluster_coords.push(lats.into_iter().zip(lons).collect());
        }
        visits.sort_by_key(|v| v.arrived);

        let n_clusters = members.len();
        let quality = davies_bouldin(&cluster_coords);
        tracing::debug!(
            n_stay_points = stay_points.len(),
            n_clusters,
            n_noise = stay_points.len() - visits.len(),
            quality,
            "clustering finished"
        );

        Some(ClusteredLocations {
            visits,
            n_clusters,
            quality,
        })
    }
}

/// Davies-Bouldin index over degree coordinates with Euclidean distance.
///
/// Intra-cluster spread is the mean distance to the cluster centroid; the
/// index averages, over clusters, the worst spread-to-separation ratio
/// against any other cluster. Undefined for fewer than two clusters.
fn davies_bouldin(clusters: &[Vec<(f64, f64)>]) -> Option<f64> {
    if clusters.len() < 2 {
        return None;
    }

    let centroids: Vec<(f64, f64)> = clusters
        .iter()
        .map(|m| {
            let n = m.len() as f64;
            let lat = m.iter().map(|p| p.0).sum::<f64>() / n;
            let lon = m.iter().map(|p| p.1).sum::<f64>() / n;
            (lat, lon)
        })
        .collect();
    let spreads: Vec<f64> = clusters
        .iter()
        .zip(&centroids)
        .map(|(m, c)| m.iter().map(|p| euclidean(*p, *c)).sum::<f64>() / m.len() as f64)
        .collect();

    let k = clusters.len();
    let mut total = 0.0;
    for i in 0..k {
        let mut worst = 0.0f64;
        for j in 0..k {
            if i == j {
                continue;
            }
            let separation = euclidean(centroids[i], centroids[j]);
            // Coincident centroids contribute nothing rather than dividing
            // by zero.
            if separation > 0.0 {
                worst = worst.max((spreads[i] + spreads[j]) / separation);
            }
        }
        total += worst;
    }
    Some(total / k as f64)
}

fn euclidean(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
