//! Small dense linear-algebra helpers for symmetry matrices.

use anyhow::{self, format_err};
use ndarray::{Array2, ArrayView2};
use ndarray_linalg::SVD;
use num_complex::Complex;

#[cfg(test)]
#[path = "linalg_tests.rs"]
mod linalg_tests;

/// Returns the maximum absolute deviation of $`\mathbf{M}^{\dagger}\mathbf{M}`$
/// from the identity. A value close to zero certifies that `m` is unitary.
pub(crate) fn unitarity_defect(m: ArrayView2<Complex<f64>>) -> f64 {
    let mhm = m.t().mapv(|z| z.conj()).dot(&m);
    mhm.indexed_iter()
        .map(|((i, j), z)| {
            let expected = if i == j {
                Complex::new(1.0, 0.0)
            } else {
                Complex::new(0.0, 0.0)
            };
            (z - expected).norm()
        })
        .fold(0.0, f64::max)
}

/// Replaces a nearly unitary matrix by its closest exactly unitary matrix,
/// obtained by dropping the singular values from its singular value
/// decomposition.
///
/// Singular values further than `error_thresh` from unity abort with an
/// error; those further than `warn_thresh` are logged as warnings. The
/// distance of the singular values from unity is exactly the deviation of the
/// matrix from unitarity, so these thresholds implement the configurable
/// unitarity-violation policy.
pub(crate) fn orthogonalise(
    m: &Array2<Complex<f64>>,
    warn_thresh: f64,
    error_thresh: f64,
) -> Result<Array2<Complex<f64>>, anyhow::Error> {
    let (u_opt, s, vh_opt) = m
        .svd(true, true)
        .map_err(|err| format_err!("Singular value decomposition failed: {err}."))?;
    let u = u_opt.ok_or_else(|| format_err!("Missing U factor from SVD."))?;
    let vh = vh_opt.ok_or_else(|| format_err!("Missing V† factor from SVD."))?;
    let max_dev = s.iter().map(|&x| (x - 1.0).abs()).fold(0.0, f64::max);
    if max_dev > error_thresh {
        return Err(format_err!(
            "Matrix deviates from unitarity by {max_dev:.3e} (threshold {error_thresh:.3e})."
        ));
    }
    if max_dev > warn_thresh {
        log::warn!("Matrix deviates from unitarity by {max_dev:.3e}; orthogonalising.");
    }
    Ok(u.dot(&vh))
}
