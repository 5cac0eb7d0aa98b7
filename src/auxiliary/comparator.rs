//! Deterministic total orders and gap clustering for symmetry eigenvalues.
//!
//! Symmetry eigenvalues computed numerically come with noise, yet the number
//! of distinct eigenvalue classes directly determines how many symmetry
//! subspaces are reported. The orders defined here are strict, transitive and
//! reproducible so that the clustering step cannot depend on the incidental
//! ordering of its inputs.

use std::f64::consts::PI;

use num_complex::Complex;
use ordered_float::OrderedFloat;

#[cfg(test)]
#[path = "comparator_tests.rs"]
mod comparator_tests;

/// Returns the normalised phase of a complex number in $`[0, 1)`$, measured
/// anticlockwise from the positive real axis.
pub fn normalised_angle(z: Complex<f64>) -> f64 {
    (z.arg() / (2.0 * PI)).rem_euclid(1.0)
}

/// Returns the sort key of a complex number: primary key the normalised angle
/// in $`[0, 1)`$, secondary key the magnitude.
pub fn complex_sort_key(z: Complex<f64>) -> [OrderedFloat<f64>; 2] {
    [OrderedFloat(normalised_angle(z)), OrderedFloat(z.norm())]
}

/// Returns the indices that sort a slice of complex numbers by
/// [`complex_sort_key`].
pub fn argsort_complex(values: &[Complex<f64>]) -> Vec<usize> {
    let mut indices = (0..values.len()).collect::<Vec<_>>();
    indices.sort_by_key(|&i| complex_sort_key(values[i]));
    indices
}

/// Serialises a variable-length vector of complex numbers into a flat key for
/// lexicographic comparison: the length first, then the (angle, magnitude)
/// pair of every element.
pub fn serialise_vector(v: &[Complex<f64>]) -> Vec<OrderedFloat<f64>> {
    let mut key = Vec::with_capacity(1 + 2 * v.len());
    key.push(OrderedFloat(v.len() as f64));
    for z in v {
        let [angle, magnitude] = complex_sort_key(*z);
        key.push(angle);
        key.push(magnitude);
    }
    key
}

/// Returns the indices that sort a collection of complex vectors by the
/// zero-padded lexicographic order of their [`serialise_vector`] keys.
pub fn argsort_vectors(vectors: &[Vec<Complex<f64>>]) -> Vec<usize> {
    let maxlen = vectors.iter().map(|v| 1 + 2 * v.len()).max().unwrap_or(1);
    let keys = vectors
        .iter()
        .map(|v| {
            let mut key = serialise_vector(v);
            key.resize(maxlen, OrderedFloat(0.0));
            key
        })
        .collect::<Vec<_>>();
    let mut indices = (0..vectors.len()).collect::<Vec<_>>();
    indices.sort_by(|&i, &j| keys[i].cmp(&keys[j]));
    indices
}

/// Clusters real values by gaps: the values are sorted and a new cluster is
/// started wherever the difference between consecutive sorted values exceeds
/// `thresh`. Returns the clusters as index sets into the original slice,
/// ordered by ascending value.
pub fn cluster_by_gap(values: &[f64], thresh: f64) -> Vec<Vec<usize>> {
    let mut indices = (0..values.len()).collect::<Vec<_>>();
    indices.sort_by_key(|&i| OrderedFloat(values[i]));
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for (pos, &i) in indices.iter().enumerate() {
        let new_cluster = match pos {
            0 => true,
            _ => values[i] - values[indices[pos - 1]] > thresh,
        };
        if new_cluster {
            clusters.push(vec![i]);
        } else {
            clusters
                .last_mut()
                .expect("The first index should have opened a cluster.")
                .push(i);
        }
    }
    clusters
}

/// Clusters complex values lying on (or near) the unit circle by gaps in
/// their normalised phases, taking the circular wrap-around into account.
/// `thresh` is measured on the normalised angle in $`[0, 1)`$. Returns the
/// clusters as index sets into the original slice.
pub fn cluster_phases(values: &[Complex<f64>], thresh: f64) -> Vec<Vec<usize>> {
    if values.is_empty() {
        return Vec::new();
    }
    let sorted = argsort_complex(values);
    let angle = |pos: usize| normalised_angle(values[sorted[pos]]);
    let n = sorted.len();

    // Positions whose predecessor (cyclically) is further away than `thresh`.
    let boundaries = (0..n)
        .filter(|&pos| {
            let gap = if pos == 0 {
                angle(0) + 1.0 - angle(n - 1)
            } else {
                angle(pos) - angle(pos - 1)
            };
            gap > thresh
        })
        .collect::<Vec<_>>();

    if boundaries.is_empty() {
        return vec![sorted];
    }

    let mut clusters = Vec::with_capacity(boundaries.len());
    for (b, &start) in boundaries.iter().enumerate() {
        let end = boundaries[(b + 1) % boundaries.len()];
        let mut cluster = Vec::new();
        let mut pos = start;
        while pos != end {
            cluster.push(sorted[pos]);
            pos = (pos + 1) % n;
        }
        if cluster.is_empty() {
            // A single boundary covering the whole circle.
            cluster.extend(sorted.iter().copied());
        }
        clusters.push(cluster);
    }
    clusters
}

/// Returns the mean of the values selected by `indices`.
pub fn cluster_mean(values: &[Complex<f64>], indices: &[usize]) -> Complex<f64> {
    indices.iter().map(|&i| values[i]).sum::<Complex<f64>>() / (indices.len().max(1) as f64)
}
