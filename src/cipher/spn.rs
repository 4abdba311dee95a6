//! Substitution-permutation networks with a bit permutation as linear layer, with presets for
//! GIFT-64 and PRESENT.

use crate::cipher::{check_arguments, initial_assignment, Cipher, CipherStructure, SboxModel};
use crate::error::{Error, Result};
use crate::model::{check_permutation, permute, Model, ModelBuilder, Var};

/*****************************************************************
                            GIFT-64
******************************************************************/

pub const GIFT_SBOX: [usize; 16] = [0x1, 0xa, 0x4, 0xc, 0x6, 0xf, 0x3, 0x9,
                                    0x2, 0xd, 0xb, 0x7, 0x5, 0x0, 0x8, 0xe];

pub const GIFT_PERMUTATION: [usize; 64] = [
     0, 17, 34, 51, 48,  1, 18, 35, 32, 49,  2, 19, 16, 33, 50,  3,
     4, 21, 38, 55, 52,  5, 22, 39, 36, 53,  6, 23, 20, 37, 54,  7,
     8, 25, 42, 59, 56,  9, 26, 43, 40, 57, 10, 27, 24, 41, 58, 11,
    12, 29, 46, 63, 60, 13, 30, 47, 44, 61, 14, 31, 28, 45, 62, 15,
];

/// Reduced description of the GIFT S-box trails, rows `c_1 ... c_8 b`.
pub const GIFT_INEQUALITIES: [[i64; 9]; 15] = [
    [ 1,  1,  1,  1, -1, -1, -1, -1, 0],
    [-3, -3, -5, -4,  2,  3,  1,  1, 8],
    [-3, -2,  3, -1, -1, -2, -4,  3, 7],
    [-1, -1, -1,  0,  2,  3,  1,  1, 0],
    [ 0,  0,  0,  3, -1, -2, -1, -1, 2],
    [ 0, -1,  0, -2, -1,  1,  2, -2, 4],
    [ 1,  0,  0, -1,  1, -1, -2, -1, 3],
    [-3, -1, -5, -6,  2,  1,  5,  3, 8],
    [ 0,  1,  3,  1, -2, -2, -1, -2, 2],
    [ 0,  1,  0,  3, -2, -2, -1, -1, 2],
    [-1, -1,  0, -1,  3,  2,  2,  1, 0],
    [ 0, -1,  0, -1,  0, -1,  1,  1, 2],
    [ 2,  1,  0,  1, -1, -2, -1, -2, 2],
    [ 0, -2, -2, -1,  1,  2,  1,  1, 2],
    [-1,  0,  0, -2, -1,  1, -2,  2, 4],
];

/*****************************************************************
                            PRESENT
******************************************************************/

pub const PRESENT_SBOX: [usize; 16] = [0xc, 0x5, 0x6, 0xb, 0x9, 0x0, 0xa, 0xd,
                                       0x3, 0xe, 0xf, 0x8, 0x4, 0x7, 0x1, 0x2];

pub const PRESENT_INEQUALITIES: [[i64; 9]; 11] = [
    [ 1,  1,  1,  1, -1, -1, -1, -1, 0],
    [ 0, -1, -1, -2,  1,  0,  1, -1, 3],
    [ 0, -1, -1, -2,  4,  3,  4,  2, 0],
    [-2, -1, -1,  0,  2,  2,  2,  1, 1],
    [-2, -1, -1,  0,  3,  3,  3,  2, 0],
    [ 0,  0,  0,  0, -1,  1, -1,  1, 1],
    [-2, -2, -2, -4,  1,  4,  1, -3, 7],
    [ 1,  1,  1,  1, -2, -2,  1, -2, 1],
    [ 0, -4, -4, -2,  1, -3,  1,  2, 9],
    [ 0,  0,  0, -2, -1, -1, -1,  2, 3],
    [ 0,  0,  0,  1,  1, -1, -2, -1, 2],
];

/// The PRESENT bit permutation: bit `i` moves to `16 i mod 63`, bit 63 stays.
pub fn present_permutation() -> Vec<usize> {
    (0..64).map(|i| if i == 63 { 63 } else { (16 * i) % 63 })
           .collect()
}

/**
A structure representing an SPN cipher for division property modelling.

name            Name of the cipher.
size            Size of the block in bits.
sbox            The S-box applied to every nibble, with its inequalities.
permutation     Bit permutation, bit i moves to permutation[i].
*/
#[derive(Clone, Debug)]
pub struct Spn {
    name: String,
    size: usize,
    sbox: SboxModel,
    permutation: Vec<usize>,
}

impl Spn {
    /// Creates a new SPN. Fails if the S-box does not tile the block or if `permutation` is
    /// not a permutation of the block bits.
    pub fn new(name: &str, size: usize, sbox: SboxModel, permutation: Vec<usize>) -> Result<Spn> {
        if size == 0 || size % sbox.size() != 0 {
            return Err(Error::InvalidParameter(
                format!("a block of {} bits is not a whole number of {}-bit S-boxes", size, sbox.size())));
        }

        if permutation.len() != size {
            return Err(Error::InvalidParameter(
                format!("permutation of length {} for a block of {} bits", permutation.len(), size)));
        }

        check_permutation(&permutation)?;

        Ok(Spn {
            name: name.to_string(),
            size,
            sbox,
            permutation,
        })
    }

    pub fn gift64() -> Spn {
        let sbox = SboxModel::new(&GIFT_SBOX, &GIFT_INEQUALITIES).expect("GIFT S-box tables are valid");
        Spn::new("gift64", 64, sbox, GIFT_PERMUTATION.to_vec()).expect("GIFT permutation is valid")
    }

    pub fn present() -> Spn {
        let sbox = SboxModel::new(&PRESENT_SBOX, &PRESENT_INEQUALITIES).expect("PRESENT S-box tables are valid");
        Spn::new("present", 64, sbox, present_permutation()).expect("PRESENT permutation is valid")
    }

    pub fn num_sboxes(&self) -> usize {
        self.size / self.sbox.size()
    }

    /// Applies the S-box layer to `input`, writing into `output`. S-box `k` covers bits
    /// `nk .. nk + n - 1`, handed to the inequalities most significant bit first.
    fn substitution_layer(&self, builder: &mut ModelBuilder, input: &[Var], output: &[Var]) {
        let n = self.sbox.size();

        for k in 0..self.num_sboxes() {
            let x: Vec<Var> = (0..n).rev().map(|b| input[n * k + b]).collect();
            let y: Vec<Var> = (0..n).rev().map(|b| output[n * k + b]).collect();

            builder.substitution(self.sbox.inequalities(), &x, &y);
        }
    }
}

impl Cipher for Spn {
    fn structure(&self) -> CipherStructure {
        CipherStructure::Spn
    }

    fn size(&self) -> usize {
        self.size
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    /// Every round is an S-box layer followed by the bit permutation. The permutation of the
    /// last round does not change which bits are balanced and is left out.
    fn model(&self, rounds: usize, constant_bits: &[usize]) -> Result<Model> {
        check_arguments(self.size, rounds, constant_bits)?;

        let mut builder = ModelBuilder::new();
        let input = builder.word("x", 0, self.size);
        let mut state = input.clone();

        for round in 1..=rounds {
            let layer_in = if round == 1 {
                state
            } else {
                permute(&state, &self.permutation)?
            };

            let layer_out = builder.word("x", round, self.size);
            self.substitution_layer(&mut builder, &layer_in, &layer_out);
            state = layer_out;
        }

        let initial = initial_assignment(&input, constant_bits);
        Ok(builder.finish(state, initial))
    }
}

/// An 8-bit SPN with two GIFT S-boxes, small enough for exhaustive solving.
#[cfg(test)]
pub fn toy() -> Spn {
    let sbox = SboxModel::new(&GIFT_SBOX, &GIFT_INEQUALITIES).unwrap();
    Spn::new("toy", 8, sbox, vec![0, 4, 1, 5, 2, 6, 3, 7]).unwrap()
}
