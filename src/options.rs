use std::path::PathBuf;
use structopt::StructOpt;

use crate::search::strategy::Strategy;

#[derive(Clone, StructOpt)]
#[structopt(name = "divprop", about = "Search for integral distinguishers of block ciphers with the bit-based division property.")]
pub struct DivpropOptions {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    /**
    Print solver events. Repeat for more detail. Without this flag the RUST_LOG environment variable is honoured.
    */
    pub verbose: u8,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Clone, StructOpt)]
pub enum Command {
    #[structopt(name = "trails")]
    /// Enumerate the division trails of an S-box.
    Trails {
        #[structopt(short = "s", long = "sbox")]
        /**
        The S-box table as a list of hexadecimal values, e.g. "[0x1, 0xa, 0x4, ...]".
        */
        sbox: String,

        #[structopt(short = "o", long = "output")]
        /**
        File to write the trails to, one trail per line.
        */
        output: Option<PathBuf>,
    },

    #[structopt(name = "reduce")]
    /// Select a small set of inequalities that describes exactly the division trails of an S-box.
    Reduce {
        #[structopt(short = "t", long = "trails")]
        /**
        File with the division trails, one point per line.
        */
        trails: PathBuf,

        #[structopt(short = "i", long = "inequalities")]
        /**
        File with the H-representation of the convex hull of the trails, one inequality "c_1 ... c_2n b" per line.
        */
        inequalities: PathBuf,

        #[structopt(short = "o", long = "output")]
        /**
        File to write the reduced inequalities to.
        */
        output: Option<PathBuf>,

        #[structopt(long = "check")]
        /**
        Verify that the reduced set separates the trails from all other points.
        */
        check: bool,
    },

    #[structopt(name = "model")]
    /// Write the LP model of a cipher without solving it.
    Model {
        #[structopt(short = "c", long = "cipher")]
        /**
        Name of the cipher to model. Currently available ciphers are:
        gift64, present, mibs, speck32, speck48, speck64
        */
        cipher: String,

        #[structopt(short = "r", long = "rounds")]
        /**
        The number of rounds to model.
        */
        rounds: usize,

        #[structopt(short = "k", long = "constant", use_delimiter = true)]
        /**
        Constant input bits, counted from 1 at the least significant bit, e.g. "1,2,3". All other bits are active.
        */
        constant_bits: Vec<usize>,

        #[structopt(short = "d", long = "model-dir", default_value = ".")]
        /**
        Directory to write the model to. The file is named <CIPHER>_<rounds>.lp.
        */
        model_dir: PathBuf,
    },

    #[structopt(name = "search")]
    /// Search for integral distinguishers.
    Search {
        #[structopt(short = "c", long = "cipher")]
        /**
        Name of the cipher to analyse. Currently available ciphers are:
        gift64, present, mibs, speck32, speck48, speck64
        */
        cipher: String,

        #[structopt(short = "r", long = "rounds")]
        /**
        The number of rounds to analyse.
        */
        rounds: usize,

        #[structopt(short = "k", long = "constant", use_delimiter = true)]
        /**
        Constant input bits, counted from 1 at the least significant bit, e.g. "1,2,3".
        */
        constant_bits: Vec<usize>,

        #[structopt(short = "w", long = "window", conflicts_with = "constant-bits")]
        /**
        If provided, searches every window of <w> consecutive constant bits instead of a single pattern.
        */
        window: Option<usize>,

        #[structopt(short = "s", long = "strategy", default_value = "probe")]
        /**
        How output bits are classified: "probe" solves once per bit, "eliminate" repeatedly minimises the number of active output bits.
        */
        strategy: Strategy,

        #[structopt(short = "p", long = "parallel")]
        /**
        Probe the output bits on all cores.
        */
        parallel: bool,

        #[structopt(long = "timeout")]
        /**
        Time limit in seconds for a single solver call. Bits whose solve hits the limit are reported as cancelled.
        */
        timeout: Option<u64>,

        #[structopt(long = "solver")]
        /**
        Path to the cbc binary. By default cbc is looked up on the PATH.
        */
        solver: Option<PathBuf>,

        #[structopt(long = "solver-threads")]
        /**
        Number of threads cbc may use for one solve.
        */
        solver_threads: Option<usize>,

        #[structopt(long = "keep-files")]
        /**
        Keep the LP and solution files of every solver call.
        */
        keep_files: bool,

        #[structopt(long = "model-dir")]
        /**
        Directory to write the model of each search to.
        */
        model_dir: Option<PathBuf>,

        #[structopt(long = "result-dir")]
        /**
        Directory to append the reports to. The file is named <cipher>_round<rounds>_result.txt.
        */
        result_dir: Option<PathBuf>,
    },
}
