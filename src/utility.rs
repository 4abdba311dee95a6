//! A collection of utility functions used throughout the crate.

use itertools::Itertools;
use std::io::{self, Write};

/// Returns true if every bit set in `u` is also set in `x`, i.e. the bit-product
/// `Pi_u(x) = prod x_i^{u_i}` evaluates to 1.
#[inline(always)]
pub fn is_submask(u: usize, x: usize) -> bool {
    (u & x) == u
}

/// Expands the `n` least significant bits of `x` into a vector, most significant bit first.
pub fn mask_to_bits(x: usize, n: usize) -> Vec<u8> {
    (0..n).rev().map(|i| ((x >> i) & 0x1) as u8).collect()
}

/// Inverse of `mask_to_bits`: the first element is the most significant bit.
pub fn bits_to_mask(bits: &[u8]) -> usize {
    bits.iter().fold(0, |acc, &b| (acc << 1) | (b & 0x1) as usize)
}

/// Applies the binary Moebius transform in place, turning the truth table of a boolean
/// function into the coefficients of its algebraic normal form (and back, it is an
/// involution).
///
/// # Panics
/// Panics if the length of `table` is not a power of two.
pub fn moebius_transform(table: &mut [u8]) {
    assert!(table.len().is_power_of_two());

    let mut stride = table.len() >> 1;

    while stride > 0 {
        for x in 0..table.len() {
            if x & stride != 0 {
                table[x] ^= table[x ^ stride];
            }
        }

        stride >>= 1;
    }
}

/// Iterates over all points of `{0,1}^d` in ascending numeric order, each point given as a
/// bit vector with the most significant bit first. The iterator is lazy, but there are
/// 2<sup>`d`</sup> points, so `d` should stay small.
pub fn hypercube(d: usize) -> impl Iterator<Item = Vec<u8>> {
    assert!(d < usize::BITS as usize, "dimension {} is too large", d);
    (0..(1usize << d)).map(move |x| mask_to_bits(x, d))
}

/// Joins a bit pattern into groups of four characters separated by spaces.
pub fn group_nibbles(symbols: &[char]) -> String {
    symbols.chunks(4)
           .map(|chunk| chunk.iter().collect::<String>())
           .join(" ")
}

/// A struct representing a progress bar for progress printing on the command line.
pub struct ProgressBar {
    current_items: f64,
    item_size: f64,
    used: bool,
}

impl ProgressBar {
    /// Creates a new progress for tracking progress of `num_items` steps.
    pub fn new(num_items: usize) -> ProgressBar {
        let item_size = 100.0 / (num_items.max(1) as f64);

        ProgressBar {
            current_items: 0.0,
            item_size,
            used: false,
        }
    }

    /// Increment the current progress of the bar. The progress bar prints if
    /// a new step was reached.
    #[inline(always)]
    pub fn increment(&mut self) {
        self.current_items += self.item_size;

        while self.current_items >= 1.0 {
            print!("=");
            // A failed flush only delays the bar
            io::stdout().flush().ok();
            self.current_items -= 1.0;
        }

        self.used = true;
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        if self.used {
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn bits_round_trip_msb_first() {
        assert_eq!(mask_to_bits(0b1011, 4), vec![1, 0, 1, 1]);
        assert_eq!(mask_to_bits(0b1011, 6), vec![0, 0, 1, 0, 1, 1]);
        assert_eq!(bits_to_mask(&[0, 0, 1, 0, 1, 1]), 0b1011);
    }

    #[test]
    fn moebius_of_single_monomial() {
        // Truth table of x0 * x1 over two variables is 1 only at x = 3
        let mut table = vec![0, 0, 0, 1];
        moebius_transform(&mut table);
        assert_eq!(table, vec![0, 0, 0, 1]);

        // x0 + x1 + 1 (xor) has truth table 1,0,0,1
        let mut table = vec![1, 0, 0, 1];
        moebius_transform(&mut table);
        assert_eq!(table, vec![1, 1, 1, 0]);
    }

    #[quickcheck]
    fn moebius_is_an_involution(seed: Vec<bool>) -> bool {
        let mut table: Vec<u8> = seed.iter().take(16).map(|&b| b as u8).collect();
        table.resize(16, 0);
        let original = table.clone();

        moebius_transform(&mut table);
        moebius_transform(&mut table);

        table == original
    }

    #[test]
    fn hypercube_enumerates_everything_once() {
        let points: Vec<_> = hypercube(3).collect();
        assert_eq!(points.len(), 8);
        assert_eq!(points[0], vec![0, 0, 0]);
        assert_eq!(points[6], vec![1, 1, 0]);
    }

    #[test]
    fn nibble_grouping() {
        let symbols: Vec<char> = "aacaccccab".chars().collect();
        assert_eq!(group_nibbles(&symbols), "aaca cccc ab");
    }
}
