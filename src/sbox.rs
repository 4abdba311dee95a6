//! Type representing an S-box, together with the enumeration of its division trails.

use itertools::Itertools;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::utility::{is_submask, mask_to_bits, moebius_transform};

/// A structure that represents an S-box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sbox {
    size: usize,
    table: Vec<usize>,
}

impl Sbox {
    /// Creates a new S-box from its table description. The bit size of the S-box is derived
    /// from the length of the table.
    ///
    /// Fails with `InvalidSbox` if the table is not 2<sup>n</sup> entries long for some
    /// n >= 1, or if an entry does not fit in n bits.
    pub fn new(table: Vec<usize>) -> Result<Sbox> {
        let len = table.len();

        if len < 2 || !len.is_power_of_two() || table.iter().any(|&y| y >= len) {
            return Err(Error::InvalidSbox { len });
        }

        Ok(Sbox {
            size: len.trailing_zeros() as usize,
            table,
        })
    }

    /// Parses an S-box written as a list of hexadecimal values, e.g. `[0xc, 0x5, 0x6, ...]`.
    /// Brackets are optional and values may be separated by commas or whitespace.
    pub fn from_hex_list(s: &str) -> Result<Sbox> {
        let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
        let mut table = vec![];

        for token in inner.split(|c: char| c == ',' || c.is_whitespace()) {
            let token = token.trim();

            if token.is_empty() {
                continue;
            }

            let digits = token.trim_start_matches("0x").trim_start_matches("0X");
            let value = usize::from_str_radix(digits, 16).map_err(|_| Error::Parse {
                line: 1,
                reason: format!("'{}' is not a hexadecimal S-box entry", token),
            })?;

            table.push(value);
        }

        Sbox::new(table)
    }

    /// Returns the size of the S-box in bits.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the table describing the S-box.
    pub fn table(&self) -> &[usize] {
        &self.table
    }

    /// Returns a bitmask that corresponds to the S-box size.
    pub fn mask(&self) -> usize {
        (1 << self.size) - 1
    }

    /// Truth table of the boolean function `x -> Pi_u(S(x))`.
    fn bit_product_table(&self, u: usize) -> Vec<u8> {
        self.table.iter()
                  .map(|&y| is_submask(u, y) as u8)
                  .collect()
    }

    /// Computes the algebraic normal form of every product of output coordinates.
    ///
    /// Entry `u` of the result lists the input monomials (as masks) that occur with a
    /// non-zero coefficient in the ANF of `Pi_u(S(x))`. Entry 0 is left empty.
    pub fn anf(&self) -> Vec<Vec<usize>> {
        let mut anf = vec![vec![]; self.table.len()];

        for (u, monomials) in anf.iter_mut().enumerate().skip(1) {
            let mut table = self.bit_product_table(u);
            moebius_transform(&mut table);

            *monomials = table.iter()
                              .enumerate()
                              .filter(|(_, &coefficient)| coefficient != 0)
                              .map(|(monomial, _)| monomial)
                              .collect();
        }

        anf
    }

    /// Returns all division trails of the S-box.
    ///
    /// The all-zero trail comes first. Then, for each non-zero input mask in ascending order,
    /// the minimal output masks that the input can propagate to are listed.
    pub fn division_trails(&self) -> Vec<DivisionTrail> {
        let anf = self.anf();
        let mut trails = vec![DivisionTrail::new(0, 0, self.size)];

        for input in 1..self.table.len() {
            // An output mask is reachable if the product of its coordinates contains a
            // monomial that covers the input mask
            let reachable = (1..self.table.len())
                .filter(|&output| anf[output].iter().any(|&monomial| is_submask(input, monomial)));

            trails.extend(minimal_masks(reachable).into_iter()
                                                  .map(|output| DivisionTrail::new(input, output, self.size)));
        }

        trails
    }
}

/// Keeps the minimal masks of a sequence under the submask order. A new mask is dropped if a
/// kept mask is already below it; otherwise every kept mask above it is evicted. The
/// resulting set does not depend on the order of the input.
pub fn minimal_masks<I>(masks: I) -> Vec<usize>
    where I: IntoIterator<Item = usize>
{
    let mut kept: Vec<usize> = vec![];

    for mask in masks {
        if kept.iter().any(|&k| is_submask(k, mask)) {
            continue;
        }

        kept.retain(|&k| !is_submask(mask, k));
        kept.push(mask);
    }

    kept
}

/// A division trail `(input, output)` over an S-box of `size` bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DivisionTrail {
    pub input: usize,
    pub output: usize,
    size: usize,
}

impl DivisionTrail {
    pub fn new(input: usize, output: usize, size: usize) -> DivisionTrail {
        DivisionTrail { input, output, size }
    }

    /// The trail as a point of `{0,1}^{2n}`: the input mask followed by the output mask, both
    /// most significant bit first.
    pub fn to_bits(&self) -> Vec<u8> {
        let mut bits = mask_to_bits(self.input, self.size);
        bits.extend(mask_to_bits(self.output, self.size));
        bits
    }
}

impl fmt::Display for DivisionTrail {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.to_bits().iter().join(", "))
    }
}

/// Writes a list of trails to `path`, one point per line.
pub fn write_trails<P: AsRef<Path>>(trails: &[DivisionTrail], path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    for trail in trails {
        writeln!(file, "{}", trail)?;
    }

    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{mibs, spn};
    use fnv::FnvHashSet;
    use quickcheck_macros::quickcheck;

    fn permutation_from_keys(keys: &[u32], n: usize) -> Vec<usize> {
        let mut table: Vec<usize> = (0..(1 << n)).collect();

        if !keys.is_empty() {
            table.sort_by_key(|&x| (keys[x % keys.len()], x));
        }

        table
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(matches!(Sbox::new(vec![0, 1, 2]), Err(Error::InvalidSbox { len: 3 })));
        assert!(matches!(Sbox::new(vec![]), Err(Error::InvalidSbox { len: 0 })));
        assert!(matches!(Sbox::new(vec![0, 1, 2, 4]), Err(Error::InvalidSbox { len: 4 })));
        assert_eq!(Sbox::new(spn::GIFT_SBOX.to_vec()).unwrap().size(), 4);
    }

    #[test]
    fn parses_hex_lists() {
        let sbox = Sbox::from_hex_list("[0xc, 0x5, 0x6, 0xb, 0x9, 0x0, 0xa, 0xd, \
                                         0x3, 0xe, 0xf, 0x8, 0x4, 0x7, 0x1, 0x2]").unwrap();
        assert_eq!(sbox.table(), &spn::PRESENT_SBOX[..]);

        let sbox = Sbox::from_hex_list("0 1 3 2").unwrap();
        assert_eq!(sbox.size(), 2);

        assert!(matches!(Sbox::from_hex_list("[0x1, zz]"), Err(Error::Parse { .. })));
    }

    #[test]
    fn identity_anf_is_a_single_monomial() {
        let sbox = Sbox::new((0..16).collect()).unwrap();
        let anf = sbox.anf();

        assert!(anf[0].is_empty());
        for u in 1..16 {
            assert_eq!(anf[u], vec![u]);
        }
    }

    #[test]
    fn identity_trails_are_diagonal() {
        for n in 1..=4 {
            let sbox = Sbox::new((0..(1 << n)).collect()).unwrap();
            let trails = sbox.division_trails();

            assert_eq!(trails.len(), 1 << n);
            assert!(trails.iter().all(|t| t.input == t.output));
        }
    }

    #[test]
    fn known_trail_counts() {
        let gift = Sbox::new(spn::GIFT_SBOX.to_vec()).unwrap();
        let present = Sbox::new(spn::PRESENT_SBOX.to_vec()).unwrap();
        let mibs = Sbox::new(mibs::MIBS_SBOX.to_vec()).unwrap();

        assert_eq!(gift.division_trails().len(), 49);
        assert_eq!(present.division_trails().len(), 47);
        assert_eq!(mibs.division_trails().len(), 53);
    }

    #[test]
    fn trail_rendering() {
        let trail = DivisionTrail::new(0b0001, 0b0100, 4);
        assert_eq!(trail.to_string(), "[0, 0, 0, 1, 0, 1, 0, 0]");
    }

    #[quickcheck]
    fn permutation_trails_are_well_formed(keys: Vec<u32>) -> bool {
        let sbox = Sbox::new(permutation_from_keys(&keys, 4)).unwrap();
        let trails = sbox.division_trails();
        let unique: FnvHashSet<_> = trails.iter().map(|t| (t.input, t.output)).collect();

        let zero_once = trails.iter().filter(|t| t.input == 0 && t.output == 0).count() == 1;
        let full = trails.iter()
                         .filter(|t| t.input == sbox.mask())
                         .all(|t| t.output == sbox.mask());
        let has_full = unique.contains(&(sbox.mask(), sbox.mask()));

        zero_once && full && has_full && unique.len() == trails.len()
    }

    #[quickcheck]
    fn minimal_masks_ignore_order(masks: Vec<u8>) -> bool {
        let masks: Vec<usize> = masks.into_iter().map(usize::from).filter(|&m| m != 0).collect();

        let mut forward = minimal_masks(masks.iter().cloned());
        let mut backward = minimal_masks(masks.iter().rev().cloned());
        let mut sorted_masks = masks.clone();
        sorted_masks.sort_unstable_by(|a, b| b.cmp(a));
        let mut descending = minimal_masks(sorted_masks);

        forward.sort_unstable();
        backward.sort_unstable();
        descending.sort_unstable();

        forward == backward && backward == descending
    }

    #[test]
    fn writes_trail_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trails.txt");
        let sbox = Sbox::new(vec![0, 1, 3, 2]).unwrap();

        write_trails(&sbox.division_trails(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("[0, 0, 0, 0]"));
        assert_eq!(text.lines().count(), sbox.division_trails().len());
    }
}
