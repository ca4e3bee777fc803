//! Density-based clustering of points on the unit sphere.
//!
//! Hand-rolled DBSCAN with a haversine central-angle metric over radian
//! coordinates. `min_samples` counts the point itself and the neighborhood
//! test is inclusive (angle <= eps). Border points join the first core
//! cluster that reaches them; noise points stay unlabeled and never receive
//! a cluster id.

use std::collections::VecDeque;

use pol_math::central_angle_rad;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointLabel {
    Undefined,
    Noise,
    Cluster(usize),
}

/// Cluster radian coordinates. Returns one label per input point; `None`
/// marks noise. Cluster ids are contiguous from 0 in discovery order.
pub(crate) fn dbscan(
    lats_rad: &[f64],
    lons_rad: &[f64],
    eps_rad: f64,
    min_samples: usize,
) -> Vec<Option<usize>> {
    debug_assert_eq!(lats_rad.len(), lons_rad.len());
    let n = lats_rad.len();
    let mut labels = vec![PointLabel::Undefined; n];
    let mut next_cluster = 0usize;

    for p in 0..n {
        if labels[p] != PointLabel::Undefined {
            continue;
        }
        let neighbors = region_query(lats_rad, lons_rad, eps_rad, p);
        if neighbors.len() < min_samples {
            labels[p] = PointLabel::Noise;
            continue;
        }

        let cluster = next_cluster;
        next_cluster += 1;
        labels[p] = PointLabel::Cluster(cluster);

        let mut frontier: VecDeque<usize> = neighbors.into();
        while let Some(q) = frontier.pop_front() {
            match labels[q] {
                PointLabel::Noise => {
                    // Density-reachable but not core: border point.
                    labels[q] = PointLabel::Cluster(cluster);
                }
                PointLabel::Undefined => {
                    labels[q] = PointLabel::Cluster(cluster);
                    let reach = region_query(lats_rad, lons_rad, eps_rad, q);
                    if reach.len() >= min_samples {
                        frontier.extend(reach);
                    }
                }
                PointLabel::Cluster(_) => {}
            }
        }
    }

    labels
        .into_iter()
        .map(|label| match label {
            PointLabel::Cluster(id) => Some(id),
            _ => None,
        })
        .collect()
}

/// Indices with central angle <= eps from point `p`, `p` itself included.
fn region_query(lats: &[f64], lons: &[f64], eps: f64, p: usize) -> Vec<usize> {
    (0..lats.len())
        .filter(|&q| central_angle_rad(lats[p], lons[p], lats[q], lons[q]) <= eps)
        .collect()
}
