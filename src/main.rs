#[macro_use] extern crate lazy_static;

mod cipher;
mod error;
mod inequality;
mod model;
mod optimizer;
mod options;
mod sbox;
mod search;
mod utility;

use rand::thread_rng;
use std::fs;
use std::iter;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cipher::{name_to_cipher, Cipher};
use error::{Error, Result};
use optimizer::cbc::{CbcBackend, CbcConfig};
use options::{Command, DivpropOptions};
use search::report::model_path;
use search::strategy::Strategy;
use search::sweep::Sweep;
use search::SearchConfig;

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt().with_env_filter(filter)
                             .with_writer(std::io::stderr)
                             .init();
}

fn lookup_cipher(name: &str) -> Result<Box<dyn Cipher>> {
    name_to_cipher(name).ok_or_else(|| Error::InvalidParameter(
        format!("cipher '{}' is not supported, check --help for supported ciphers", name)))
}

/// Converts bit positions counted from 1 to positions counted from 0.
fn zero_based(bits: &[usize]) -> Result<Vec<usize>> {
    bits.iter()
        .map(|&b| b.checked_sub(1)
                   .ok_or_else(|| Error::InvalidParameter(String::from("bit positions are counted from 1"))))
        .collect()
}

fn print_trails(sbox: &str, output: Option<PathBuf>) -> Result<()> {
    let sbox = sbox::Sbox::from_hex_list(sbox)?;
    let trails = sbox.division_trails();

    for trail in &trails {
        println!("{}", trail);
    }

    info!("{} division trails for a {}-bit S-box", trails.len(), sbox.size());

    if let Some(path) = output {
        sbox::write_trails(&trails, &path)?;
        info!("Trails written to {}", path.display());
    }

    Ok(())
}

fn reduce_inequalities(trails: PathBuf, inequalities: PathBuf, output: Option<PathBuf>, check: bool) -> Result<()> {
    let points = inequality::read_points(&trails)?;
    let candidates = inequality::read_inequalities(&inequalities)?;
    let reduced = inequality::reduce(&points, &candidates)?;

    for inequality in &reduced {
        println!("{}", inequality);
    }

    info!("Reduced {} inequalities to {}", candidates.len(), reduced.len());

    if check {
        if !inequality::check_separation(&points, &reduced, &mut thread_rng()) {
            return Err(Error::InvalidParameter(
                String::from("the reduced inequalities do not separate the trails, check the H-representation")));
        }

        info!("The reduced inequalities separate the trails");
    }

    if let Some(path) = output {
        inequality::write_inequalities(&reduced, &path)?;
        info!("Inequalities written to {}", path.display());
    }

    Ok(())
}

fn write_model(cipher: &str, rounds: usize, constant_bits: &[usize], model_dir: PathBuf) -> Result<()> {
    let cipher = lookup_cipher(cipher)?;
    let model = cipher.model(rounds, &zero_based(constant_bits)?)?;
    let path = model_path(&model_dir, &cipher.name(), rounds);

    fs::create_dir_all(&model_dir)?;

    model::lp::write_lp_file(&model, iter::empty(), &path)?;
    info!("{} variables and {} constraints written to {}",
          model.num_vars(), model.constraints().len(), path.display());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_search(cipher: &str,
              rounds: usize,
              constant_bits: &[usize],
              window: Option<usize>,
              strategy: Strategy,
              parallel: bool,
              solver: CbcConfig,
              model_dir: Option<PathBuf>,
              result_dir: Option<PathBuf>)
              -> Result<()> {
    let cipher = lookup_cipher(cipher)?;
    let sweep = match window {
        Some(length) => Sweep::windows(cipher.structure(), cipher.size(), length)?,
        None => Sweep::single(zero_based(constant_bits)?),
    };

    let config = SearchConfig {
        strategy,
        parallel,
        model_dir,
        result_dir,
    };

    let mut backend = CbcBackend::with_config(solver);
    let reports = search::run_sweep(cipher.as_ref(), &mut backend, rounds, sweep, &config)?;

    for report in reports.iter().filter(|r| window.is_none() || r.classification.has_distinguisher()) {
        println!("{}\n", report);
    }

    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Trails { sbox, output } => print_trails(&sbox, output),
        Command::Reduce { trails, inequalities, output, check } => {
            reduce_inequalities(trails, inequalities, output, check)
        }
        Command::Model { cipher, rounds, constant_bits, model_dir } => {
            write_model(&cipher, rounds, &constant_bits, model_dir)
        }
        Command::Search { cipher,
                          rounds,
                          constant_bits,
                          window,
                          strategy,
                          parallel,
                          timeout,
                          solver,
                          solver_threads,
                          keep_files,
                          model_dir,
                          result_dir } => {
            let solver = CbcConfig {
                cbc_path: solver,
                timeout: timeout.map(Duration::from_secs),
                threads: solver_threads,
                keep_files,
            };

            run_search(&cipher, rounds, &constant_bits, window, strategy, parallel, solver, model_dir, result_dir)
        }
    }
}

fn main() {
    let options = DivpropOptions::from_args();
    init_logging(options.verbose);

    if let Err(e) = run(options.command) {
        error!("{}", e);
        process::exit(1);
    }
}
