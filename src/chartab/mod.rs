//! Reference character tables of little groups and irrep assignment.

use std::fmt;

use derive_builder::Builder;
use indexmap::IndexMap;
use itertools::Itertools;
use nalgebra::Vector3;
use num_complex::Complex;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::io::format::short_complex;

#[cfg(test)]
#[path = "chartab_tests.rs"]
mod chartab_tests;

// ==================
// Struct definitions
// ==================

/// An assignment of a degenerate subspace to irreps of the little group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IrrepMatch {
    /// Variant for a clean assignment: the named irreps with their integer
    /// multiplicities.
    Identified(Vec<(String, usize)>),

    /// Variant for traces that admit no integer-multiplicity decomposition
    /// within the threshold. The residual is the largest absolute deviation
    /// between the computed traces and the best reconstruction.
    Unidentified {
        /// The reconstruction residual.
        residual: f64,
    },
}

impl fmt::Display for IrrepMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrrepMatch::Identified(irreps) => {
                let desc = irreps
                    .iter()
                    .map(|(name, mult)| {
                        if *mult == 1 {
                            name.clone()
                        } else {
                            format!("{mult}{name}")
                        }
                    })
                    .join(" ⊕ ");
                write!(f, "{desc}")
            }
            IrrepMatch::Unidentified { residual } => {
                write!(f, "unidentified (residual {residual:.3e})")
            }
        }
    }
}

/// A structure to manage the reference character table of the little group of
/// one high-symmetry k-point. Tables are external reference data, typically
/// deserialised from YAML, and refer to space-group operations by index.
#[derive(Builder, Clone, Debug, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct IrrepTable {
    /// The direct coordinates of the k-point the table refers to, if the
    /// provider states them.
    #[builder(default = "None")]
    #[serde(default)]
    kpt: Option<Vector3<f64>>,

    /// The indices, into the space-group operation list, of the little-group
    /// operations the characters refer to.
    operations: Vec<usize>,

    /// The expected trace of every listed operation, per irrep.
    #[builder(setter(custom))]
    irreps: IndexMap<String, Vec<Complex<f64>>>,
}

impl IrrepTableBuilder {
    pub fn irreps(&mut self, irreps: &[(&str, Vec<Complex<f64>>)]) -> &mut Self {
        self.irreps = Some(
            irreps
                .iter()
                .map(|(name, chars)| (name.to_string(), chars.clone()))
                .collect(),
        );
        self
    }

    fn validate(&self) -> Result<(), String> {
        let operations = self
            .operations
            .as_ref()
            .ok_or("No little-group operations found.".to_string())?;
        let irreps = self.irreps.as_ref().ok_or("No irreps found.".to_string())?;
        if irreps.is_empty() {
            return Err("The irrep table is empty.".to_string());
        }
        for (name, chars) in irreps.iter() {
            if chars.len() != operations.len() {
                return Err(format!(
                    "Irrep `{name}` lists {} characters for {} operations.",
                    chars.len(),
                    operations.len()
                ));
            }
        }
        Ok(())
    }
}

impl IrrepTable {
    /// Returns a builder to construct a new irrep table.
    pub fn builder() -> IrrepTableBuilder {
        IrrepTableBuilder::default()
    }

    /// The direct coordinates of the k-point the table refers to, if stated.
    pub fn kpt(&self) -> Option<&Vector3<f64>> {
        self.kpt.as_ref()
    }

    /// The indices of the little-group operations the characters refer to.
    pub fn operations(&self) -> &[usize] {
        &self.operations
    }

    /// The irrep names in table order.
    pub fn irrep_names(&self) -> impl Iterator<Item = &String> {
        self.irreps.keys()
    }

    /// The characters of a named irrep.
    pub fn characters(&self, name: &str) -> Option<&[Complex<f64>]> {
        self.irreps.get(name).map(Vec::as_slice)
    }

    /// Checks consistency of a deserialised table: every irrep must list one
    /// character per operation.
    pub fn check(&self) -> Result<(), anyhow::Error> {
        for (name, chars) in &self.irreps {
            if chars.len() != self.operations.len() {
                return Err(anyhow::format_err!(
                    "Irrep `{name}` lists {} characters for {} operations.",
                    chars.len(),
                    self.operations.len()
                ));
            }
        }
        Ok(())
    }

    /// Assigns a vector of computed subspace traces, aligned with
    /// [`Self::operations`], to irreps of the little group.
    ///
    /// Multiplicities follow from the orthogonality relation
    /// $`m_\alpha = \frac{1}{n}\sum_{g} \bar{\chi}_\alpha(g)\,\chi(g)`$ over
    /// the listed operations. Every multiplicity must lie within `thresh` of
    /// a non-negative integer and the rounded multiplicities must reconstruct
    /// the computed traces within `thresh`; otherwise the subspace is
    /// reported as unidentified together with the residual.
    pub fn match_traces(&self, traces: &[Complex<f64>], thresh: f64) -> IrrepMatch {
        let n = self.operations.len() as f64;
        let mut assignment = Vec::new();
        let mut reconstructed = vec![Complex::zero(); traces.len()];
        let mut integral = true;
        for (name, chars) in &self.irreps {
            let m: Complex<f64> = chars
                .iter()
                .zip(traces.iter())
                .map(|(x, t)| x.conj() * t)
                .sum::<Complex<f64>>()
                / n;
            let m_int = m.re.round().max(0.0);
            integral &= m.im.abs() <= thresh && (m.re - m_int).abs() <= thresh;
            if m_int > 0.5 {
                for (r, x) in reconstructed.iter_mut().zip(chars.iter()) {
                    *r += m_int * x;
                }
                assignment.push((name.clone(), m_int as usize));
            }
        }
        let residual = traces
            .iter()
            .zip(reconstructed.iter())
            .map(|(t, r)| (t - r).norm())
            .fold(0.0, f64::max);
        if !integral || residual > thresh || assignment.is_empty() {
            IrrepMatch::Unidentified { residual }
        } else {
            IrrepMatch::Identified(assignment)
        }
    }
}

impl fmt::Display for IrrepTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Little-group operations: {}",
            self.operations.iter().map(|i| (i + 1).to_string()).join(" ")
        )?;
        for (name, chars) in &self.irreps {
            writeln!(
                f,
                "{name:<8} {}",
                chars.iter().map(|x| short_complex(*x, 3)).join("  ")
            )?;
        }
        Ok(())
    }
}
