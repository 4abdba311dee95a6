//! Error type shared by the whole crate.

use std::io;
use thiserror::Error;

/// Everything that can go wrong while building or solving a division property model.
#[derive(Debug, Error)]
pub enum Error {
    /// The S-box table is empty, not a power of two long, or maps outside its range.
    #[error("invalid S-box: table of length {len} does not describe an n-bit S-box")]
    InvalidSbox { len: usize },

    #[error("invalid round count {0}: at least one round is required")]
    InvalidRoundCount(usize),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The candidate inequalities ran out before every forbidden point was cut off.
    /// This means the H-representation handed to the reducer was not exact.
    #[error("inequalities do not separate the trails: {remaining} forbidden points remain")]
    Unseparable { remaining: usize },

    #[error("solver error: {0}")]
    Solver(String),

    /// A solver failure annotated with the model it happened in.
    #[error("search over {rounds} rounds with constant bits {constant_bits:?} failed: {source}")]
    Search {
        rounds: usize,
        constant_bits: Vec<usize>,
        #[source]
        source: Box<Error>,
    },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attaches the round count and the (0-based) constant-bit pattern to a solver error.
    /// Validation errors are returned untouched since they do not depend on a solver run.
    pub fn in_search(self, rounds: usize, constant_bits: &[usize]) -> Error {
        match self {
            Error::Solver(_) | Error::Io(_) => Error::Search {
                rounds,
                constant_bits: constant_bits.iter().map(|x| x + 1).collect(),
                source: Box::new(self),
            },
            other => other,
        }
    }
}
