use std::fs;
use std::io::Write;
use std::path::PathBuf;

use byteorder::{BigEndian, LittleEndian};
use num_complex::Complex;

use crate::io::numeric::{read_complexes, read_reals, read_triples, NumericReader};

type C128 = Complex<f64>;

fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("bandsym_numeric_test_{name}"));
    let mut f = fs::File::create(&path).unwrap();
    f.write_all(bytes).unwrap();
    path
}

#[test]
fn test_io_numeric_reader_f64_le() {
    let values = [0.0f64, 1.5, -2.25, 3.0e10];
    let bytes = values
        .iter()
        .flat_map(|x| x.to_le_bytes())
        .collect::<Vec<_>>();
    let path = write_temp("f64_le", &bytes);
    let v = NumericReader::<_, LittleEndian, f64>::from_file(&path)
        .unwrap()
        .collect::<Vec<_>>();
    assert_eq!(v, values);
    fs::remove_file(path).unwrap();
}

#[test]
fn test_io_numeric_reader_f64_be() {
    let values = [1.0f64, -1.0, 0.125];
    let bytes = values
        .iter()
        .flat_map(|x| x.to_be_bytes())
        .collect::<Vec<_>>();
    let path = write_temp("f64_be", &bytes);
    let v = NumericReader::<_, BigEndian, f64>::from_file(&path)
        .unwrap()
        .collect::<Vec<_>>();
    assert_eq!(v, values);
    fs::remove_file(path).unwrap();
}

#[test]
fn test_io_numeric_reader_complex_interleaved() {
    let values = [C128::new(1.0, -2.0), C128::new(0.5, 0.25)];
    let bytes = values
        .iter()
        .flat_map(|z| {
            z.re.to_le_bytes()
                .into_iter()
                .chain(z.im.to_le_bytes())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let path = write_temp("c128_le", &bytes);
    let v = read_complexes::<LittleEndian, _>(&path, 2).unwrap();
    assert_eq!(v, values);
    fs::remove_file(path).unwrap();
}

#[test]
fn test_io_numeric_read_reals_count_check() {
    let bytes = [1.0f64, 2.0]
        .iter()
        .flat_map(|x| x.to_le_bytes())
        .collect::<Vec<_>>();
    let path = write_temp("f64_count", &bytes);
    assert!(read_reals::<LittleEndian, _>(&path, 2).is_ok());
    assert!(read_reals::<LittleEndian, _>(&path, 3).is_err());
    fs::remove_file(path).unwrap();
}

#[test]
fn test_io_numeric_read_triples() {
    let ints: [i32; 6] = [0, 0, 1, -1, 2, 0];
    let bytes = ints
        .iter()
        .flat_map(|x| x.to_le_bytes())
        .collect::<Vec<_>>();
    let path = write_temp("i32_triples", &bytes);
    let triples = read_triples::<LittleEndian, _>(&path).unwrap();
    assert_eq!(triples, vec![[0, 0, 1], [-1, 2, 0]]);
    fs::remove_file(path).unwrap();

    let bytes = ints[..5]
        .iter()
        .flat_map(|x| x.to_le_bytes())
        .collect::<Vec<_>>();
    let path = write_temp("i32_triples_bad", &bytes);
    assert!(read_triples::<LittleEndian, _>(&path).is_err());
    fs::remove_file(path).unwrap();
}
