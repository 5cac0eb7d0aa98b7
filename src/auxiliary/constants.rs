//! Physical constants and named default tolerances.

/// The Bohr radius in Ångström (CODATA 2018).
pub const BOHR: f64 = 0.529177210903;

/// The Hartree energy in electronvolt (CODATA 2018).
pub const HARTREE_EV: f64 = 27.211386245988;

/// The free-electron kinetic prefactor $`\hbar^2/2m_\mathrm{e}`$ in
/// eV Å², so that a plane wave with wavevector $`q`$ in Å⁻¹ has kinetic
/// energy `KINETIC_PREFACTOR * q²` in eV.
pub const KINETIC_PREFACTOR: f64 = HARTREE_EV * BOHR * BOHR / 2.0;

/// Default energy threshold in eV below which two bands are considered
/// degenerate.
pub const DEFAULT_DEGEN_THRESH: f64 = 1e-8;

/// Default maximum deviation from unitarity of a subspace-restricted symmetry
/// matrix above which a warning is emitted.
pub const DEFAULT_UNITARITY_WARN_THRESH: f64 = 1e-5;

/// Default maximum deviation from unitarity of a subspace-restricted symmetry
/// matrix above which the analysis of the offending k-point is aborted.
pub const DEFAULT_UNITARITY_ERROR_THRESH: f64 = 1e-3;

/// Default gap in the sorted sequence of symmetry eigenvalues above which a
/// new eigenvalue cluster is started.
pub const DEFAULT_CLUSTER_THRESH: f64 = 0.01;

/// Default tolerance on irrep multiplicities: a computed multiplicity must lie
/// within this distance of a non-negative integer for an assignment to be
/// accepted.
pub const DEFAULT_MULTIPLICITY_THRESH: f64 = 1e-2;

/// Default tolerance when checking that a fractional vector is a
/// reciprocal-lattice (integer) vector.
pub const DEFAULT_INTEGER_THRESH: f64 = 1e-5;

/// Default distance in Å⁻¹ between consecutive k-points above which the
/// cumulative k-path coordinate treats the path as broken.
pub const DEFAULT_KPATH_BREAK_THRESH: f64 = 0.1;
