//! The result of searching one constant-bit pattern, and its text form.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::search::strategy::Classification;
use crate::utility::group_nibbles;

/**
A structure representing the outcome of one search.

cipher          Name of the analysed cipher.
rounds          Number of rounds modelled.
constant_bits   Constant input bit positions, counted from 0.
classification  Verdict for each output bit position.
elapsed         Wall-clock time spent compiling and solving.
*/
#[derive(Clone, Debug)]
pub struct Report {
    pub cipher: String,
    pub rounds: usize,
    pub constant_bits: Vec<usize>,
    pub classification: Classification,
    pub elapsed: Duration,
}

impl Report {
    pub fn size(&self) -> usize {
        self.classification.len()
    }

    /// The input pattern, most significant bit first, `c` for constant and `a` for active bits.
    pub fn input_pattern(&self) -> String {
        let symbols: Vec<char> = (0..self.size()).rev()
                                                 .map(|p| if self.constant_bits.contains(&p) { 'c' } else { 'a' })
                                                 .collect();
        group_nibbles(&symbols)
    }

    /// The output pattern, most significant bit first, `b` for balanced bits and `?` otherwise.
    pub fn output_pattern(&self) -> String {
        let symbols: Vec<char> = self.classification.verdicts()
                                                    .iter()
                                                    .rev()
                                                    .map(|v| v.symbol())
                                                    .collect();
        group_nibbles(&symbols)
    }

    /// Appends the report to `path`, creating the file if needed.
    pub fn append_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", self)?;
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut constant_bits: Vec<usize> = self.constant_bits.iter().map(|p| p + 1).collect();
        constant_bits.sort_unstable();

        writeln!(f, "Rounds: {}", self.rounds)?;
        writeln!(f, "Constant bits: {}",
                 constant_bits.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(","))?;

        if self.classification.has_distinguisher() {
            writeln!(f, "Integral distinguisher exists")?;
        } else {
            writeln!(f, "Integral distinguisher does not exist")?;
        }

        writeln!(f, "Input: {}", self.input_pattern())?;
        writeln!(f, "Output: {}", self.output_pattern())?;
        writeln!(f, "Balanced bits: {}", self.classification.balanced_count())?;

        if self.classification.cancelled_count() > 0 {
            writeln!(f, "Cancelled bits: {}", self.classification.cancelled_count())?;
        }

        write!(f, "Time: {:.3} s", self.elapsed.as_secs_f64())
    }
}

/// `<dir>/<CIPHER>_<rounds>.lp`
pub fn model_path<P: AsRef<Path>>(dir: P, cipher: &str, rounds: usize) -> PathBuf {
    dir.as_ref().join(format!("{}_{}.lp", cipher.to_uppercase(), rounds))
}

/// `<dir>/<cipher>_round<rounds>_result.txt`
pub fn result_path<P: AsRef<Path>>(dir: P, cipher: &str, rounds: usize) -> PathBuf {
    dir.as_ref().join(format!("{}_round{}_result.txt", cipher, rounds))
}
