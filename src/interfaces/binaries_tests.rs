use std::fs;
use std::io::Write;
use std::path::PathBuf;

use approx::assert_relative_eq;
use nalgebra::{Matrix3, Vector3};
use num_complex::Complex;

use crate::interfaces::binaries::{
    BinariesWavefunctionSource, BinaryKpointSource, ByteOrderKind,
};
use crate::interfaces::{GvectorRecord, WavefunctionSource};

type C64 = Complex<f64>;

fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("bandsym_binaries_test_{name}"));
    let mut f = fs::File::create(&path).unwrap();
    f.write_all(bytes).unwrap();
    path
}

fn le_bytes_f64(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|x| x.to_le_bytes()).collect()
}

#[test]
fn test_interfaces_binaries_source_roundtrip() {
    // One k-point, two bands, two plane waves, with an explicit G-vector
    // list in a scrambled native order.
    let energies_path = write_temp("energies", &le_bytes_f64(&[-1.0, 2.5]));
    let coefficients_path = write_temp(
        "coefficients",
        // (re, im) pairs: band 0 = (1, 0), band 1 = (0, i).
        &le_bytes_f64(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
    );
    let gvectors_bytes = [0_i32, 0, 1, 0, 0, 0]
        .iter()
        .flat_map(|x| x.to_le_bytes())
        .collect::<Vec<_>>();
    let gvectors_path = write_temp("gvectors", &gvectors_bytes);

    let mut source = BinariesWavefunctionSource {
        lattice: Matrix3::identity(),
        ecut: 150.0,
        spinor: false,
        nbands: 2,
        efermi: Some(0.5),
        byte_order: ByteOrderKind::LittleEndian,
        kpoints: vec![BinaryKpointSource {
            kpt: Vector3::new(0.0, 0.0, 0.25),
            num_plane_waves: 2,
            energies: energies_path.clone(),
            coefficients: coefficients_path.clone(),
            gvectors: Some(gvectors_path.clone()),
        }],
    };

    let header = source.read_header().unwrap();
    assert_eq!(header.nkpoints, 1);
    assert_eq!(header.nbands, 2);
    assert!(!header.spinor);

    let raw = source.read_kpoint(0).unwrap();
    assert_relative_eq!(raw.energies[0], -1.0, epsilon = 1e-12);
    assert_relative_eq!(raw.energies[1], 2.5, epsilon = 1e-12);
    assert_eq!(raw.coefficients[[0, 0]], C64::new(1.0, 0.0));
    assert_eq!(raw.coefficients[[1, 1]], C64::new(0.0, 1.0));
    match &raw.gvectors {
        GvectorRecord::Explicit(list) => {
            assert_eq!(list, &vec![Vector3::new(0, 0, 1), Vector3::new(0, 0, 0)]);
        }
        GvectorRecord::Count(_) => panic!("An explicit G-vector list was supplied."),
    }

    assert!(source.read_kpoint(1).is_err());

    for path in [energies_path, coefficients_path, gvectors_path] {
        fs::remove_file(path).unwrap();
    }
}

#[test]
fn test_interfaces_binaries_source_length_mismatch() {
    let energies_path = write_temp("short_energies", &le_bytes_f64(&[-1.0]));
    let coefficients_path = write_temp("short_coefficients", &le_bytes_f64(&[1.0, 0.0]));

    let mut source = BinariesWavefunctionSource {
        lattice: Matrix3::identity(),
        ecut: 150.0,
        spinor: false,
        nbands: 2,
        efermi: None,
        byte_order: ByteOrderKind::LittleEndian,
        kpoints: vec![BinaryKpointSource {
            kpt: Vector3::zeros(),
            num_plane_waves: 1,
            energies: energies_path.clone(),
            coefficients: coefficients_path.clone(),
            gvectors: None,
        }],
    };

    assert!(source.read_kpoint(0).is_err());

    for path in [energies_path, coefficients_path] {
        fs::remove_file(path).unwrap();
    }
}

#[test]
fn test_interfaces_binaries_yaml_roundtrip() {
    let source = BinariesWavefunctionSource {
        lattice: Matrix3::identity(),
        ecut: 150.0,
        spinor: true,
        nbands: 4,
        efermi: None,
        byte_order: ByteOrderKind::BigEndian,
        kpoints: vec![BinaryKpointSource {
            kpt: Vector3::new(0.5, 0.0, 0.0),
            num_plane_waves: 14,
            energies: PathBuf::from("k0_energies.bin"),
            coefficients: PathBuf::from("k0_coefficients.bin"),
            gvectors: None,
        }],
    };
    let yaml = serde_yaml::to_string(&source).unwrap();
    let back: BinariesWavefunctionSource = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back.byte_order, ByteOrderKind::BigEndian);
    assert_eq!(back.kpoints[0].num_plane_waves, 14);
    assert!(back.spinor);
}
