use approx::assert_relative_eq;
use nalgebra::Matrix3;

use crate::auxiliary::template_systems::{
    cubic_lattice, inversion_space_group, seven_g_cutoff, spinor_inversion_kpoint,
};
use crate::drivers::band_analysis::{BandAnalysisDriver, BandAnalysisParams};
use crate::drivers::BandSymDriver;
use crate::interfaces::{GvectorRecord, InMemorySource, RawKpoint, WavefunctionHeader};
use crate::symmetry::SpaceGroup;

/// An in-memory source carrying the spinor toy system: one inversion-odd
/// Kramers pair below one even pair at Γ, stored in the canonical
/// (count-implied) column order.
fn spinor_toy_source() -> InMemorySource {
    let template = spinor_inversion_kpoint();
    let header = WavefunctionHeader {
        nkpoints: 1,
        nbands: 4,
        ecut: seven_g_cutoff(),
        spinor: true,
        efermi: Some(0.0),
        lattice: cubic_lattice(),
    };
    let raw = RawKpoint {
        kpt: *template.kpt(),
        energies: template.energies().clone(),
        coefficients: template.coefficients().clone(),
        gvectors: GvectorRecord::Count(14),
    };
    InMemorySource::new(header, vec![raw]).unwrap()
}

#[test]
fn test_drivers_band_analysis_end_to_end() {
    let _ = env_logger::builder().is_test(true).try_init();
    let params = BandAnalysisParams::builder()
        .kpnames(Some(vec!["GM".to_string()]))
        .build()
        .unwrap();
    let mut driver = BandAnalysisDriver::builder()
        .parameters(params)
        .source(spinor_toy_source())
        .space_group(inversion_space_group(true))
        .build()
        .unwrap();

    assert!(driver.result().is_err());
    driver.run().unwrap();

    let analysis = driver.result().unwrap().analysis();
    assert_eq!(analysis.num_bandinvs, Some(2));
    assert_eq!(analysis.num_kramers_pairs, Some(1));
    assert_eq!(analysis.z2, Some(1));
    assert_eq!(analysis.z4, Some(1));
    assert_relative_eq!(analysis.gap_direct.unwrap(), 2.0, epsilon = 1e-12);

    let bs = driver.band_structure().unwrap();
    assert_eq!(bs.kpoints().len(), 1);
    assert_eq!(bs.kpoints()[0].num_bands(), 4);
}

#[test]
fn test_drivers_band_analysis_band_window() {
    // Restricting the window to the odd Kramers pair: the first band above
    // the window is the even pair at +1 eV.
    let params = BandAnalysisParams::builder()
        .ib_end(Some(2))
        .build()
        .unwrap();
    let mut driver = BandAnalysisDriver::builder()
        .parameters(params)
        .source(spinor_toy_source())
        .space_group(inversion_space_group(true))
        .build()
        .unwrap();
    driver.run().unwrap();

    let analysis = driver.result().unwrap().analysis();
    assert_eq!(analysis.num_bandinvs, Some(2));
    assert_eq!(analysis.num_kramers_pairs, Some(1));
    assert_relative_eq!(analysis.gap_direct.unwrap(), 2.0, epsilon = 1e-12);
    assert_eq!(analysis.kpoints[0].subspaces.len(), 1);
}

#[test]
fn test_drivers_band_analysis_spinor_mismatch_is_fatal() {
    let mut driver = BandAnalysisDriver::builder()
        .parameters(BandAnalysisParams::default())
        .source(spinor_toy_source())
        .space_group(inversion_space_group(false))
        .build()
        .unwrap();
    let err = driver.run().err().expect("Spinor flags disagree.");
    assert!(err.to_string().contains("spinor"));
}

#[test]
fn test_drivers_band_analysis_lattice_mismatch_is_fatal() {
    let group = SpaceGroup::builder()
        .lattice(Matrix3::identity() * 2.0)
        .operations(inversion_space_group(true).operations())
        .spinor(true)
        .build()
        .unwrap();
    let mut driver = BandAnalysisDriver::builder()
        .parameters(BandAnalysisParams::default())
        .source(spinor_toy_source())
        .space_group(group)
        .build()
        .unwrap();
    let err = driver.run().err().expect("Lattices disagree.");
    assert!(err.to_string().contains("lattice"));
}

#[test]
fn test_drivers_band_analysis_invalid_window_is_fatal() {
    let params = BandAnalysisParams::builder()
        .ib_start(Some(3))
        .ib_end(Some(2))
        .build()
        .unwrap();
    let mut driver = BandAnalysisDriver::builder()
        .parameters(params)
        .source(spinor_toy_source())
        .space_group(inversion_space_group(true))
        .build()
        .unwrap();
    assert!(driver.run().is_err());
}

#[test]
fn test_drivers_band_analysis_params_yaml_defaults() {
    let params: BandAnalysisParams = serde_yaml::from_str("{}").unwrap();
    assert!(params.ecut.is_none());
    assert!(params.kpnames.is_none());
    assert_relative_eq!(
        params.thresholds.degen,
        crate::auxiliary::constants::DEFAULT_DEGEN_THRESH,
        epsilon = 1e-20
    );
}
