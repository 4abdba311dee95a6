//! Candidate constant-bit patterns to search, independent of the cipher and the strategy.

use crate::cipher::CipherStructure;
use crate::error::{Error, Result};

/// Iterates over all windows `{i, ..., i+n-1}` of `n` consecutive bit positions in a block.
#[derive(Clone, Debug)]
pub struct Windows {
    length: usize,
    starts: Vec<usize>,
    next: usize,
}

impl Windows {
    /// Windows of `length` bits in a block of `size` bits. Starts ascend if `descending` is
    /// false.
    pub fn new(size: usize, length: usize, descending: bool) -> Result<Windows> {
        if length < 1 || length > size {
            return Err(Error::InvalidParameter(
                format!("window of {} bits in a block of {} bits", length, size)));
        }

        let mut starts: Vec<usize> = (0..=size - length).collect();

        if descending {
            starts.reverse();
        }

        Ok(Windows {
            length,
            starts,
            next: 0,
        })
    }

    /// The order in which windows are visited depends on the cipher structure: SPNs start
    /// from the lowest bit, the other structures from the highest.
    pub fn for_structure(structure: CipherStructure, size: usize, length: usize) -> Result<Windows> {
        Windows::new(size, length, structure != CipherStructure::Spn)
    }
}

impl Iterator for Windows {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let start = *self.starts.get(self.next)?;
        self.next += 1;

        Some((start..start + self.length).collect())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.starts.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Windows {}

/// A set of constant-bit patterns.
#[derive(Clone, Debug)]
pub enum Sweep {
    /// A single pattern.
    Single(Vec<usize>),
    /// An explicit list of patterns, searched in order.
    List(Vec<Vec<usize>>),
    /// All contiguous windows of a given length.
    Windows(Windows),
}

impl Sweep {
    pub fn single(constant_bits: Vec<usize>) -> Sweep {
        Sweep::Single(constant_bits)
    }

    pub fn list(patterns: Vec<Vec<usize>>) -> Sweep {
        Sweep::List(patterns)
    }

    pub fn windows(structure: CipherStructure, size: usize, length: usize) -> Result<Sweep> {
        Ok(Sweep::Windows(Windows::for_structure(structure, size, length)?))
    }

    /// Number of patterns in the sweep.
    pub fn len(&self) -> usize {
        match self {
            Sweep::Single(_) => 1,
            Sweep::List(patterns) => patterns.len(),
            Sweep::Windows(windows) => windows.len(),
        }
    }
}

impl IntoIterator for Sweep {
    type Item = Vec<usize>;
    type IntoIter = Box<dyn Iterator<Item = Vec<usize>>>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Sweep::Single(pattern) => Box::new(std::iter::once(pattern)),
            Sweep::List(patterns) => Box::new(patterns.into_iter()),
            Sweep::Windows(windows) => Box::new(windows),
        }
    }
}
