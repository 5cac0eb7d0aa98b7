//! Space-group symmetry operations and their action on Bloch wavefunctions.
//!
//! ## Transformation convention
//!
//! A space-group operation $`\{W|\mathbf{t}\}`$ acts on fractional real-space
//! coordinates as $`\mathbf{x} \mapsto W\mathbf{x} + \mathbf{t}`$, with
//! $`W`$ an integer matrix of determinant ±1 and $`\mathbf{t}`$ a fractional
//! translation. A plane wave
//! $`\mathrm{e}^{2\pi\mathrm{i}(\mathbf{k}+\mathbf{G})\cdot\mathbf{r}}`$ then
//! transforms into the plane wave at
//! $`\mathbf{k} + \mathbf{G}' = W^{-\mathrm{T}}(\mathbf{k}+\mathbf{G})`$
//! carrying the non-symmorphic phase
//! $`\exp\!\left(-2\pi\mathrm{i}\,(\mathbf{k}+\mathbf{G}')\cdot\mathbf{t}\right)`$,
//! the phase being attached to the *transformed* vector. Time reversal
//! additionally conjugates the expansion coefficients, maps
//! $`\mathbf{k} \mapsto -\mathbf{k}`$, and multiplies the spin part by
//! $`-\mathrm{i}\sigma_y`$. These sign choices are fixed here once for the
//! whole crate; no call site may deviate from them.

use std::fmt;

use anyhow::{self, format_err};
use derive_builder::Builder;
use indexmap::IndexMap;
use nalgebra::{Matrix2, Matrix3, Vector3};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::auxiliary::constants::DEFAULT_INTEGER_THRESH;
use crate::chartab::IrrepTable;
use crate::symmetry::spinor_rotation::{spin_rotation, MINUS_I_SIGMA_Y};

pub mod spinor_rotation;


// ==================
// Struct definitions
// ==================

/// A structure to manage one space-group symmetry operation as supplied by an
/// external space-group provider. Operations are constructed once per run and
/// shared read-only across all k-points and bands.
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SymmetryOperation {
    /// The point-group rotation $`W`$, an integer matrix acting on fractional
    /// real-space coordinates.
    rotation: Matrix3<i32>,

    /// The fractional translation $`\mathbf{t}`$.
    #[builder(default = "Vector3::zeros()")]
    #[serde(default = "Vector3::zeros")]
    translation: Vector3<f64>,

    /// Whether the operation involves time reversal.
    #[builder(default = "false")]
    #[serde(default)]
    time_reversal: bool,

    /// The full spin-space matrix of the operation, including the
    /// time-reversal factor $`-\mathrm{i}\sigma_y`$ when
    /// [`Self::time_reversal`] is set. If absent, it is derived from the
    /// Cartesian rotation when needed.
    #[builder(default = "None")]
    #[serde(default)]
    spin_rotation: Option<Matrix2<Complex<f64>>>,
}

impl SymmetryOperationBuilder {
    fn validate(&self) -> Result<(), String> {
        let rotation = self.rotation.ok_or("No rotation found.".to_string())?;
        if det3(&rotation).abs() != 1 {
            return Err(format!(
                "The rotation matrix has determinant {}, but ±1 is required.",
                det3(&rotation)
            ));
        }
        Ok(())
    }
}

/// Returns the determinant of an integer 3×3 matrix.
fn det3(m: &Matrix3<i32>) -> i32 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
}

/// Returns the exact inverse of an integer 3×3 matrix of determinant ±1 via
/// its adjugate.
fn inverse3(m: &Matrix3<i32>) -> Result<Matrix3<i32>, anyhow::Error> {
    let det = det3(m);
    if det.abs() != 1 {
        return Err(format_err!(
            "The rotation matrix has determinant {det}, but ±1 is required."
        ));
    }
    let cof = |r1: usize, c1: usize, r2: usize, c2: usize| {
        m[(r1, c1)] * m[(r2, c2)] - m[(r1, c2)] * m[(r2, c1)]
    };
    let adjugate = Matrix3::new(
        cof(1, 1, 2, 2),
        -cof(0, 1, 2, 2),
        cof(0, 1, 1, 2),
        -cof(1, 0, 2, 2),
        cof(0, 0, 2, 2),
        -cof(0, 0, 1, 2),
        cof(1, 0, 2, 1),
        -cof(0, 0, 2, 1),
        cof(0, 0, 1, 1),
    );
    Ok(adjugate * det)
}

impl SymmetryOperation {
    /// Returns a builder to construct a new symmetry operation.
    pub fn builder() -> SymmetryOperationBuilder {
        SymmetryOperationBuilder::default()
    }

    /// Constructs the identity operation.
    pub fn identity() -> Self {
        Self::builder()
            .rotation(Matrix3::identity())
            .build()
            .expect("The identity operation should always be valid.")
    }

    /// Constructs the spatial inversion about the origin.
    pub fn inversion() -> Self {
        Self::builder()
            .rotation(-Matrix3::identity())
            .build()
            .expect("The inversion operation should always be valid.")
    }

    /// The point-group rotation acting on fractional real-space coordinates.
    pub fn rotation(&self) -> &Matrix3<i32> {
        &self.rotation
    }

    /// The fractional translation.
    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// Whether the operation involves time reversal.
    pub fn time_reversal(&self) -> bool {
        self.time_reversal
    }

    /// The exact integer inverse of the rotation.
    pub fn rotation_inverse(&self) -> Result<Matrix3<i32>, anyhow::Error> {
        inverse3(&self.rotation)
    }

    /// Checks if the spatial part of the operation is the spatial identity
    /// (up to a full lattice translation) and no time reversal is involved.
    pub fn is_identity(&self) -> bool {
        self.rotation == Matrix3::identity() && !self.time_reversal && self.has_integer_translation()
    }

    /// Checks if the spatial part of the operation is the spatial inversion
    /// about a lattice point and no time reversal is involved.
    pub fn is_inversion(&self) -> bool {
        self.rotation == -Matrix3::identity()
            && !self.time_reversal
            && self.has_integer_translation()
    }

    fn has_integer_translation(&self) -> bool {
        self.translation
            .iter()
            .all(|&t| (t - t.round()).abs() < DEFAULT_INTEGER_THRESH)
    }

    /// Returns the image of a k-point in direct coordinates:
    /// $`W^{-\mathrm{T}}\mathbf{k}`$, negated for time-reversal operations.
    pub fn transformed_kpt(&self, kpt: &Vector3<f64>) -> Result<Vector3<f64>, anyhow::Error> {
        let winv = self.rotation_inverse()?;
        let kpt_new = winv.map(f64::from).transpose() * kpt;
        if self.time_reversal {
            Ok(-kpt_new)
        } else {
            Ok(kpt_new)
        }
    }

    /// Returns the integer reciprocal-lattice shift `Δk` between the image of
    /// `kpt` under this operation and `kpt` itself, or `None` if the image is
    /// not lattice-equivalent to `kpt` (the operation is then not in the
    /// little group of `kpt`).
    pub fn reciprocal_shift(
        &self,
        kpt: &Vector3<f64>,
        thresh: f64,
    ) -> Result<Option<Vector3<i32>>, anyhow::Error> {
        let dk = self.transformed_kpt(kpt)? - kpt;
        let rounded = dk.map(f64::round);
        if (dk - rounded).iter().all(|&x| x.abs() < thresh) {
            Ok(Some(rounded.map(|x| x as i32)))
        } else {
            Ok(None)
        }
    }

    /// Returns the Cartesian matrix of the rotation with respect to the given
    /// real-space lattice (rows = basis vectors):
    /// $`R = A^{\mathrm{T}} W A^{-\mathrm{T}}`$.
    pub fn cartesian_rotation(
        &self,
        lattice: &Matrix3<f64>,
    ) -> Result<Matrix3<f64>, anyhow::Error> {
        let at = lattice.transpose();
        let at_inv = at
            .try_inverse()
            .ok_or_else(|| format_err!("The lattice is singular."))?;
        Ok(at * self.rotation.map(f64::from) * at_inv)
    }

    /// Returns the full spin-space matrix of the operation: the stored one if
    /// supplied by the space-group provider, otherwise the SU(2) matrix
    /// derived from the Cartesian rotation, composed with
    /// $`-\mathrm{i}\sigma_y`$ for time-reversal operations.
    pub fn full_spin_rotation(
        &self,
        lattice: &Matrix3<f64>,
    ) -> Result<Matrix2<Complex<f64>>, anyhow::Error> {
        if let Some(s) = self.spin_rotation {
            return Ok(s);
        }
        let su2 = spin_rotation(&self.cartesian_rotation(lattice)?)?;
        if self.time_reversal {
            Ok(su2 * *MINUS_I_SIGMA_Y)
        } else {
            Ok(su2)
        }
    }
}

impl fmt::Display for SymmetryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..3 {
            writeln!(
                f,
                " [{:>3} {:>3} {:>3} ]    {:+.5}",
                self.rotation[(r, 0)],
                self.rotation[(r, 1)],
                self.rotation[(r, 2)],
                self.translation[r]
            )?;
        }
        if self.time_reversal {
            writeln!(f, " followed by time reversal")?;
        }
        Ok(())
    }
}

/// A structure to manage the symmetry data of one crystal: the real-space
/// lattice, the space-group operations and the reference irrep character
/// tables of its high-symmetry k-points.
#[derive(Builder, Clone, Debug, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SpaceGroup {
    /// The real-space lattice (rows = Cartesian basis vectors in Å).
    lattice: Matrix3<f64>,

    /// The space-group operations, in the order defined by the space-group
    /// provider. Irrep tables refer to operations by index into this list.
    #[builder(setter(custom))]
    operations: Vec<SymmetryOperation>,

    /// Whether the wavefunctions analysed under this space group are spinors.
    spinor: bool,

    /// Reference irrep character tables, keyed by high-symmetry k-point
    /// label.
    #[builder(default = "IndexMap::new()")]
    #[serde(default)]
    irrep_tables: IndexMap<String, IrrepTable>,
}

impl SpaceGroupBuilder {
    pub fn operations(&mut self, ops: &[SymmetryOperation]) -> &mut Self {
        self.operations = Some(ops.to_vec());
        self
    }

    fn validate(&self) -> Result<(), String> {
        let operations = self
            .operations
            .as_ref()
            .ok_or("No symmetry operations found.".to_string())?;
        if operations.is_empty() {
            return Err("The operation list is empty.".to_string());
        }
        Ok(())
    }
}

impl SpaceGroup {
    /// Returns a builder to construct a new space group.
    pub fn builder() -> SpaceGroupBuilder {
        SpaceGroupBuilder::default()
    }

    /// The real-space lattice (rows = Cartesian basis vectors in Å).
    pub fn lattice(&self) -> &Matrix3<f64> {
        &self.lattice
    }

    /// The space-group operations.
    pub fn operations(&self) -> &[SymmetryOperation] {
        &self.operations
    }

    /// Whether the wavefunctions analysed under this space group are spinors.
    pub fn spinor(&self) -> bool {
        self.spinor
    }

    /// The reference irrep table registered for a high-symmetry k-point
    /// label, if any.
    pub fn irrep_table(&self, label: &str) -> Option<&IrrepTable> {
        self.irrep_tables.get(label)
    }

    /// Returns the indices of the operations in the little group of `kpt`,
    /// *i.e.* those mapping `kpt` onto itself up to a reciprocal-lattice
    /// vector.
    pub fn little_group(
        &self,
        kpt: &Vector3<f64>,
        thresh: f64,
    ) -> Result<Vec<usize>, anyhow::Error> {
        let mut indices = Vec::new();
        for (i, op) in self.operations.iter().enumerate() {
            if op.reciprocal_shift(kpt, thresh)?.is_some() {
                indices.push(i);
            }
        }
        Ok(indices)
    }

    /// Returns the index of the spatial inversion among the operations, if
    /// present.
    pub fn inversion_index(&self) -> Option<usize> {
        self.operations.iter().position(SymmetryOperation::is_inversion)
    }
}
