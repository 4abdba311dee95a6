//! The SPECK family of ARX ciphers. The modular addition is modelled through the
//! division property of the and operation.

use crate::cipher::{check_arguments, initial_assignment, Cipher, CipherStructure};
use crate::error::{Error, Result};
use crate::model::{rotate_left, rotate_right, Model, ModelBuilder, Var};

/*****************************************************************
                            SPECK
******************************************************************/

/**
A structure representing a SPECK instance.

name            Name of the instance.
word            Size of one state word in bits, half the block size.
alpha           Right rotation applied to the left word.
beta            Left rotation applied to the right word.
*/
#[derive(Clone, Debug)]
pub struct Speck {
    name: String,
    word: usize,
    alpha: usize,
    beta: usize,
}

impl Speck {
    /// Creates an instance with words of `word` bits and the rotation amounts `alpha` and
    /// `beta`, which must be smaller than the word.
    pub fn new(name: &str, word: usize, alpha: usize, beta: usize) -> Result<Speck> {
        if word < 2 {
            return Err(Error::InvalidParameter(format!("word length {} is too small", word)));
        }

        for &rotation in [alpha, beta].iter() {
            if rotation >= word {
                return Err(Error::InvalidParameter(
                    format!("rotation by {} does not fit a word of {} bits", rotation, word)));
            }
        }

        Ok(Speck {
            name: name.to_string(),
            word,
            alpha,
            beta,
        })
    }

    /// The standard instance for a block size of 32, 48 or 64 bits.
    pub fn with_block_size(block_size: usize) -> Result<Speck> {
        let (alpha, beta) = match block_size {
            32 => (7, 2),
            48 | 64 => (8, 3),
            _ => return Err(Error::InvalidParameter(
                format!("no SPECK instance with a block of {} bits", block_size))),
        };

        Speck::new(&format!("speck{}", block_size), block_size / 2, alpha, beta)
    }

    pub fn speck32() -> Speck {
        Speck::with_block_size(32).expect("SPECK32 parameters are valid")
    }

    pub fn speck48() -> Speck {
        Speck::with_block_size(48).expect("SPECK48 parameters are valid")
    }

    pub fn speck64() -> Speck {
        Speck::with_block_size(64).expect("SPECK64 parameters are valid")
    }

    /// Words are stored most significant bit first, the left word holding the high half.
    fn position_var(&self, left: &[Var], right: &[Var], p: usize) -> Var {
        if p < self.word {
            right[self.word - 1 - p]
        } else {
            left[2 * self.word - 1 - p]
        }
    }
}

impl Cipher for Speck {
    fn structure(&self) -> CipherStructure {
        CipherStructure::Arx
    }

    fn size(&self) -> usize {
        2 * self.word
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn model(&self, rounds: usize, constant_bits: &[usize]) -> Result<Model> {
        check_arguments(self.size(), rounds, constant_bits)?;

        let mut builder = ModelBuilder::new();
        let mut left = builder.word("x", 0, self.word);
        let mut right = builder.word("y", 0, self.word);
        let input: Vec<Var> = (0..self.size()).map(|p| self.position_var(&left, &right, p))
                                              .collect();

        for round in 0..rounds {
            let u = builder.word("u", round, self.word);
            let v = builder.word("v", round, self.word);
            let w = builder.word("w", round, self.word);
            let t = builder.word("t", round, self.word);
            let next_left = builder.word("x", round + 1, self.word);
            let next_right = builder.word("y", round + 1, self.word);

            let rotated = rotate_right(&left, self.alpha)?;
            builder.copy(&right, &u, &v);
            let v = rotate_left(&v, self.beta)?;
            builder.and(&u, &rotated, &w);
            builder.copy(&w, &t, &next_left);
            builder.xor(&t, &v, &next_right);

            left = next_left;
            right = next_right;
        }

        let objective = (0..self.size()).map(|p| self.position_var(&left, &right, p))
                                        .collect();
        let initial = initial_assignment(&input, constant_bits);

        Ok(builder.finish(objective, initial))
    }
}

/// SPECK with 4-bit words, small enough for exhaustive solving.
#[cfg(test)]
pub fn toy() -> Speck {
    Speck::new("toy", 4, 2, 1).unwrap()
}
