//! A trait for representing ciphers as division property models, as well as the supported
//! cipher families.

use crate::error::{Error, Result};
use crate::inequality::Inequality;
use crate::model::{Model, Var};
use crate::sbox::Sbox;

pub mod mibs;
pub mod speck;
pub mod spn;

/// Different type of ciphers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CipherStructure {
    /// A substitution-permutation network with a bit permutation as linear layer.
    Spn,
    /// A Feistel cipher with a nibble mixing layer.
    Feistel,
    /// An add-rotate-xor cipher.
    Arx,
}

/// A trait defining a cipher whose division property propagation can be modelled.
pub trait Cipher: Sync {
    /// Returns the type of the cipher.
    fn structure(&self) -> CipherStructure;

    /// Returns the block size of the cipher in bits.
    fn size(&self) -> usize;

    /// Returns the name of the cipher.
    fn name(&self) -> String;

    /// Compiles `rounds` rounds of the cipher into a model whose input has the bits in
    /// `constant_bits` constant and all other bits active. Bit positions count from the least
    /// significant bit of the state, starting at 0.
    ///
    /// The objective of the returned model is indexed by the same bit positions.
    fn model(&self, rounds: usize, constant_bits: &[usize]) -> Result<Model>;
}

/// An S-box together with the inequalities describing its division trails.
#[derive(Clone, Debug)]
pub struct SboxModel {
    sbox: Sbox,
    inequalities: Vec<Inequality>,
}

impl SboxModel {
    /// Creates a model from an S-box table and rows `c_1 ... c_2n b`.
    pub fn new<R: AsRef<[i64]>>(table: &[usize], rows: &[R]) -> Result<SboxModel> {
        let sbox = Sbox::new(table.to_vec())?;
        let width = 2 * sbox.size() + 1;
        let mut inequalities = Vec::with_capacity(rows.len());

        for row in rows {
            let row = row.as_ref();

            if row.len() != width {
                return Err(Error::InvalidParameter(
                    format!("inequality row of length {} for an S-box of {} bits", row.len(), sbox.size())));
            }

            inequalities.push(Inequality::from_row(row));
        }

        Ok(SboxModel { sbox, inequalities })
    }

    /// Returns the size of the S-box in bits.
    pub fn size(&self) -> usize {
        self.sbox.size()
    }

    pub fn inequalities(&self) -> &[Inequality] {
        &self.inequalities
    }
}

/// Rejects round counts below one and constant bits outside the block.
pub fn check_arguments(size: usize, rounds: usize, constant_bits: &[usize]) -> Result<()> {
    if rounds < 1 {
        return Err(Error::InvalidRoundCount(rounds));
    }

    if let Some(&bit) = constant_bits.iter().find(|&&bit| bit >= size) {
        return Err(Error::InvalidParameter(
            format!("constant bit {} outside a block of {} bits", bit + 1, size)));
    }

    Ok(())
}

/// The round-0 assignment for the input variables `inputs` (indexed by bit position), listed
/// in variable order.
pub fn initial_assignment(inputs: &[Var], constant_bits: &[usize]) -> Vec<(Var, bool)> {
    let mut initial: Vec<(Var, bool)> = inputs.iter()
                                              .enumerate()
                                              .map(|(p, &var)| (var, !constant_bits.contains(&p)))
                                              .collect();
    initial.sort_by_key(|&(var, _)| var);
    initial
}

/// Converts the name of a cipher to an instance of that cipher.
pub fn name_to_cipher(name: &str) -> Option<Box<dyn Cipher>> {
    match name {
        "gift64"  => Some(Box::new(spn::Spn::gift64())),
        "present" => Some(Box::new(spn::Spn::present())),
        "mibs"    => Some(Box::new(mibs::Mibs::new())),
        "speck32" => Some(Box::new(speck::Speck::speck32())),
        "speck48" => Some(Box::new(speck::Speck::speck48())),
        "speck64" => Some(Box::new(speck::Speck::speck64())),
        _ => None
    }
}

/// Names accepted by `name_to_cipher`.
pub const CIPHER_NAMES: [&str; 6] = ["gift64", "present", "mibs", "speck32", "speck48", "speck64"];
