//! Numeric reader from binary wavefunction dumps.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;

use anyhow::{self, format_err};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use ndarray::Array1;
use num_complex::Complex;

#[cfg(test)]
#[path = "numeric_tests.rs"]
mod numeric_tests;

/// Iterable structure for reading numeric binary files.
pub(crate) struct NumericReader<R: BufRead, B: ByteOrder, T> {
    /// The inner file reader.
    inner: R,

    /// The byte order of the numeric values to be read.
    byte_order: PhantomData<B>,

    /// The type of the numeric values to be read.
    numeric_type: PhantomData<T>,
}

impl<R: BufRead, B: ByteOrder, T> NumericReader<R, B, T> {
    /// Constructs a new numeric binary reader wrapping around a standard file
    /// reader.
    fn new(inner: R) -> Self {
        Self {
            inner,
            byte_order: PhantomData,
            numeric_type: PhantomData,
        }
    }
}

impl<B: ByteOrder, T> NumericReader<BufReader<File>, B, T> {
    /// Constructs a new numeric binary reader over a buffered file reader from
    /// a filename.
    pub(crate) fn from_file<P: AsRef<Path>>(filename: P) -> Result<Self, anyhow::Error> {
        let f = File::open(&filename)?;
        Ok(Self::new(BufReader::new(f)))
    }
}

macro_rules! impl_iterator_numeric_reader {
    ($($t:ty),+) => {$(
        impl<R: BufRead> Iterator for NumericReader<R, LittleEndian, $t> {
            type Item = $t;

            fn next(&mut self) -> Option<Self::Item> {
                let mut buff = [0_u8; std::mem::size_of::<$t>()];
                self.inner.read_exact(&mut buff).ok()?;
                Some(<$t>::from_le_bytes(buff))
            }
        }

        impl<R: BufRead> Iterator for NumericReader<R, BigEndian, $t> {
            type Item = $t;

            fn next(&mut self) -> Option<Self::Item> {
                let mut buff = [0_u8; std::mem::size_of::<$t>()];
                self.inner.read_exact(&mut buff).ok()?;
                Some(<$t>::from_be_bytes(buff))
            }
        }

        impl<R: BufRead, B: ByteOrder> Iterator for NumericReader<R, B, Complex<$t>>
        where
            NumericReader<R, B, $t>: Iterator<Item = $t>,
        {
            type Item = Complex<$t>;

            fn next(&mut self) -> Option<Self::Item> {
                // Interleaved (re, im) pairs.
                let mut buff = [0_u8; std::mem::size_of::<$t>()];
                self.inner.read_exact(&mut buff).ok()?;
                let re = read_scalar::<B, $t>(&buff);
                self.inner.read_exact(&mut buff).ok()?;
                let im = read_scalar::<B, $t>(&buff);
                Some(Complex::<$t> { re, im })
            }
        }
    )+}
}

impl_iterator_numeric_reader!(f32, f64);

macro_rules! impl_iterator_numeric_reader_int {
    ($($t:ty),+) => {$(
        impl<R: BufRead> Iterator for NumericReader<R, LittleEndian, $t> {
            type Item = $t;

            fn next(&mut self) -> Option<Self::Item> {
                let mut buff = [0_u8; std::mem::size_of::<$t>()];
                self.inner.read_exact(&mut buff).ok()?;
                Some(<$t>::from_le_bytes(buff))
            }
        }

        impl<R: BufRead> Iterator for NumericReader<R, BigEndian, $t> {
            type Item = $t;

            fn next(&mut self) -> Option<Self::Item> {
                let mut buff = [0_u8; std::mem::size_of::<$t>()];
                self.inner.read_exact(&mut buff).ok()?;
                Some(<$t>::from_be_bytes(buff))
            }
        }
    )+}
}

impl_iterator_numeric_reader_int!(i32, i64);

/// Decodes one scalar of type `$t`-compatible width from a filled buffer with
/// the byte order `B`.
fn read_scalar<B: ByteOrder, T: ScalarFromBytes>(buff: &[u8]) -> T {
    T::from_bytes::<B>(buff)
}

/// Helper trait tying a scalar type to its `byteorder` decoding function.
trait ScalarFromBytes {
    fn from_bytes<B: ByteOrder>(buff: &[u8]) -> Self;
}

impl ScalarFromBytes for f32 {
    fn from_bytes<B: ByteOrder>(buff: &[u8]) -> Self {
        B::read_f32(buff)
    }
}

impl ScalarFromBytes for f64 {
    fn from_bytes<B: ByteOrder>(buff: &[u8]) -> Self {
        B::read_f64(buff)
    }
}

/// Reads exactly `n` little- or big-endian `f64` values from a binary file
/// into a one-dimensional array.
pub(crate) fn read_reals<B: ByteOrder, P: AsRef<Path>>(
    filename: P,
    n: usize,
) -> Result<Array1<f64>, anyhow::Error>
where
    NumericReader<BufReader<File>, B, f64>: Iterator<Item = f64>,
{
    let values = NumericReader::<_, B, f64>::from_file(&filename)?.collect::<Vec<_>>();
    if values.len() != n {
        return Err(format_err!(
            "File `{}` contains {} real values but {} were expected.",
            filename.as_ref().display(),
            values.len(),
            n
        ));
    }
    Ok(Array1::from_vec(values))
}

/// Reads exactly `n` complex values (interleaved real and imaginary parts)
/// from a binary file.
pub(crate) fn read_complexes<B: ByteOrder, P: AsRef<Path>>(
    filename: P,
    n: usize,
) -> Result<Vec<Complex<f64>>, anyhow::Error>
where
    NumericReader<BufReader<File>, B, Complex<f64>>: Iterator<Item = Complex<f64>>,
{
    let values = NumericReader::<_, B, Complex<f64>>::from_file(&filename)?.collect::<Vec<_>>();
    if values.len() != n {
        return Err(format_err!(
            "File `{}` contains {} complex values but {} were expected.",
            filename.as_ref().display(),
            values.len(),
            n
        ));
    }
    Ok(values)
}

/// Reads all `i32` triples from a binary file, as integer G-vector
/// components in the DFT code's native storage order.
pub(crate) fn read_triples<B: ByteOrder, P: AsRef<Path>>(
    filename: P,
) -> Result<Vec<[i32; 3]>, anyhow::Error>
where
    NumericReader<BufReader<File>, B, i32>: Iterator<Item = i32>,
{
    let values = NumericReader::<_, B, i32>::from_file(&filename)?.collect::<Vec<_>>();
    if values.len() % 3 != 0 {
        return Err(format_err!(
            "File `{}` contains {} integers, which is not a whole number of triples.",
            filename.as_ref().display(),
            values.len()
        ));
    }
    Ok(values.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
}
