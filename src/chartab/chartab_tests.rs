use num_complex::Complex;

use crate::chartab::{IrrepMatch, IrrepTable};

type C64 = Complex<f64>;

fn c(re: f64) -> C64 {
    C64::new(re, 0.0)
}

/// Table of the little group {E, P} with the even and odd parity irreps.
fn inversion_table() -> IrrepTable {
    IrrepTable::builder()
        .operations(vec![0, 1])
        .irreps(&[
            ("GM1+", vec![c(1.0), c(1.0)]),
            ("GM1-", vec![c(1.0), c(-1.0)]),
        ])
        .build()
        .unwrap()
}

#[test]
fn test_chartab_builder_validates_character_counts() {
    assert!(IrrepTable::builder()
        .operations(vec![0, 1])
        .irreps(&[("GM1+", vec![c(1.0)])])
        .build()
        .is_err());
}

#[test]
fn test_chartab_match_single_irrep() {
    let table = inversion_table();
    let matched = table.match_traces(&[c(1.0), c(-1.0)], 1e-2);
    assert_eq!(
        matched,
        IrrepMatch::Identified(vec![("GM1-".to_string(), 1)])
    );
}

#[test]
fn test_chartab_match_direct_sum() {
    let table = inversion_table();
    // A two-dimensional subspace containing one even and one odd state.
    let matched = table.match_traces(&[c(2.0), c(0.0)], 1e-2);
    assert_eq!(
        matched,
        IrrepMatch::Identified(vec![("GM1+".to_string(), 1), ("GM1-".to_string(), 1)])
    );

    let doubled = table.match_traces(&[c(4.0), c(4.0)], 1e-2);
    assert_eq!(
        doubled,
        IrrepMatch::Identified(vec![("GM1+".to_string(), 4)])
    );
}

#[test]
fn test_chartab_match_reports_ambiguity() {
    let table = inversion_table();
    let matched = table.match_traces(&[c(1.5), c(0.3)], 1e-2);
    match matched {
        IrrepMatch::Unidentified { residual } => assert!(residual > 1e-2),
        IrrepMatch::Identified(_) => panic!("Non-integral traces must not be identified."),
    }
}

#[test]
fn test_chartab_match_display() {
    let matched = IrrepMatch::Identified(vec![("GM1+".to_string(), 2), ("GM1-".to_string(), 1)]);
    assert_eq!(matched.to_string(), "2GM1+ ⊕ GM1-");
}

#[test]
fn test_chartab_yaml_roundtrip() {
    let table = inversion_table();
    let yaml = serde_yaml::to_string(&table).unwrap();
    let back: IrrepTable = serde_yaml::from_str(&yaml).unwrap();
    back.check().unwrap();
    assert_eq!(back.operations(), table.operations());
    assert_eq!(back.characters("GM1+"), table.characters("GM1+"));
}
