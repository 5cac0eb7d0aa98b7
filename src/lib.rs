//! # BandSym: symmetry and topology analysis of plane-wave band structures
//!
//! BandSym identifies the irreducible representations of electronic bands
//! computed by plane-wave density-functional-theory codes. Given a crystal's
//! space-group operations and the plane-wave expansion of the wavefunctions at
//! a set of k-points, it can:
//! - reconstruct the reciprocal-lattice vectors of each k-point's plane-wave
//!   expansion and reconcile them with the ordering used by the DFT code,
//! - compute the matrix representation of every little-group operation on each
//!   degenerate band subspace, including non-symmorphic phases and spinor
//!   rotations,
//! - assign irreducible representations by matching subspace traces against
//!   reference character tables of the little groups,
//! - count inversion-odd states and Kramers pairs and evaluate the
//!   $`\mathbb{Z}_2`$ and $`\mathbb{Z}_4`$ symmetry indicators, and
//! - evaluate Zak phases and Wilson loops along closed k-point paths.
//!
//! Wavefunction data enter through the [`interfaces::WavefunctionSource`]
//! capability, which presents a canonical in-memory dataset regardless of the
//! DFT code that produced the files. Space-group operations and reference
//! character tables are supplied externally (*e.g.* deserialised from YAML):
//! BandSym analyses symmetry, it does not detect it.
//!
//! This documentation details the public API of the `bandsym` crate.

pub mod analysis;
pub mod auxiliary;
pub mod bandstructure;
pub mod basis;
pub mod chartab;
pub mod drivers;
pub mod interfaces;
pub mod io;
pub mod kpoint;
pub mod symmetry;
