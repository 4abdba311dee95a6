//! Searching for integral distinguishers: compile a cipher model for a constant-bit pattern,
//! classify its output bits and report the result.

pub mod report;
pub mod strategy;
pub mod sweep;

use std::fs;
use std::iter;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cipher::Cipher;
use crate::error::{Error, Result};
use crate::model::lp::write_lp_file;
use crate::optimizer::Optimizer;
use crate::search::report::{model_path, result_path, Report};
use crate::search::strategy::{classify, Strategy};
use crate::search::sweep::Sweep;
use crate::utility::ProgressBar;

/// Settings shared by all searches of a sweep.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub strategy: Strategy,
    /// Probe the output bits on all cores. Has no effect on elimination.
    pub parallel: bool,
    /// Directory to write the LP model of each search to.
    pub model_dir: Option<PathBuf>,
    /// Directory to append the reports to.
    pub result_dir: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Probe,
            parallel: false,
            model_dir: None,
            result_dir: None,
        }
    }
}

/// Searches a single constant-bit pattern. Solver failures are returned with the round count
/// and the pattern attached.
pub fn search_pattern<O: Optimizer + Clone>(cipher: &dyn Cipher,
                                            optimizer: &mut O,
                                            rounds: usize,
                                            constant_bits: &[usize],
                                            config: &SearchConfig)
                                            -> Result<Report> {
    let start = Instant::now();
    let model = cipher.model(rounds, constant_bits)?;

    debug!("{} rounds of {}: {} variables, {} constraints",
           rounds, cipher.name(), model.num_vars(), model.constraints().len());

    if let Some(dir) = &config.model_dir {
        fs::create_dir_all(dir).map_err(|e| Error::from(e).in_search(rounds, constant_bits))?;
        write_lp_file(&model, iter::empty(), model_path(dir, &cipher.name(), rounds))
            .map_err(|e| e.in_search(rounds, constant_bits))?;
    }

    let classification = classify(optimizer, &model, config.strategy, config.parallel)
        .map_err(|e| e.in_search(rounds, constant_bits))?;

    let report = Report {
        cipher: cipher.name(),
        rounds,
        constant_bits: constant_bits.to_vec(),
        classification,
        elapsed: start.elapsed(),
    };

    if let Some(dir) = &config.result_dir {
        fs::create_dir_all(dir).map_err(|e| Error::from(e).in_search(rounds, constant_bits))?;
        report.append_to(result_path(dir, &cipher.name(), rounds))
              .map_err(|e| e.in_search(rounds, constant_bits))?;
    }

    Ok(report)
}

/// Searches every pattern of `sweep`. A search that fails in the solver is logged and
/// skipped; invalid arguments abort the sweep.
pub fn run_sweep<O: Optimizer + Clone>(cipher: &dyn Cipher,
                                       optimizer: &mut O,
                                       rounds: usize,
                                       sweep: Sweep,
                                       config: &SearchConfig)
                                       -> Result<Vec<Report>> {
    info!("Searching {} pattern(s) over {} rounds of {} ({} strategy)",
          sweep.len(), rounds, cipher.name(), config.strategy);

    let mut progress_bar = if sweep.len() > 1 { Some(ProgressBar::new(sweep.len())) } else { None };
    let mut reports = vec![];
    let mut failed = 0;

    for constant_bits in sweep {
        match search_pattern(cipher, optimizer, rounds, &constant_bits, config) {
            Ok(report) => reports.push(report),
            Err(e @ Error::Search { .. }) => {
                warn!("{}", e);
                failed += 1;
            }
            Err(e) => return Err(e),
        }

        if let Some(progress_bar) = progress_bar.as_mut() {
            progress_bar.increment();
        }
    }

    drop(progress_bar);

    let found = reports.iter().filter(|r| r.classification.has_distinguisher()).count();
    info!("{} of {} pattern(s) give a distinguisher, {} failed", found, reports.len() + failed, failed);

    Ok(reports)
}
