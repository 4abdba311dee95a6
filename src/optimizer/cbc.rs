//! COIN-OR CBC as an external MILP solver, driven through LP files.
//!
//! See: <https://github.com/coin-or/Cbc>

use fnv::FnvHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::lp::write_lp_file;
use crate::model::SymbolTable;
use crate::optimizer::{LiveModel, Optimizer, Outcome, Solution};

/// Configuration for the CBC backend.
#[derive(Debug, Clone)]
pub struct CbcConfig {
    /// Path to the cbc binary, looked up on `PATH` if not set.
    pub cbc_path: Option<PathBuf>,
    /// Time limit for a single solve.
    pub timeout: Option<Duration>,
    /// Number of threads cbc may use for one solve.
    pub threads: Option<usize>,
    /// Keep the LP and solution files of every solve instead of deleting them.
    pub keep_files: bool,
}

impl Default for CbcConfig {
    fn default() -> Self {
        Self {
            cbc_path: None,
            timeout: None,
            threads: None,
            keep_files: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CbcBackend {
    config: CbcConfig,
}

impl CbcBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CbcConfig) -> Self {
        Self { config }
    }

    fn binary(&self) -> PathBuf {
        self.config.cbc_path.clone().unwrap_or_else(|| PathBuf::from("cbc"))
    }

    /// Command line arguments to solve `model` and write the solution to `solution`.
    fn arguments(&self, model: &Path, solution: &Path) -> Vec<String> {
        let mut args = vec![model.display().to_string()];

        if let Some(timeout) = self.config.timeout {
            args.push(String::from("sec"));
            args.push(timeout.as_secs().max(1).to_string());
        }

        if let Some(threads) = self.config.threads {
            args.push(String::from("threads"));
            args.push(threads.to_string());
        }

        args.push(String::from("solve"));
        args.push(String::from("solu"));
        args.push(solution.display().to_string());
        args
    }

    /// Interprets a solution file written by cbc's `solu` command.
    ///
    /// The first line holds the status and the objective value; every further line lists
    /// one variable as `index name value reduced-cost`, optionally prefixed by `**`. Only
    /// non-zero variables are listed.
    pub fn parse_solution(text: &str, symbols: &SymbolTable) -> Result<Outcome> {
        let mut lines = text.lines();
        let status = lines.next().map(str::trim).unwrap_or("");
        let lowercase = status.to_lowercase();

        if lowercase.contains("infeasible") {
            return Ok(Outcome::Infeasible);
        }

        if status.starts_with("Stopped on time") || status.starts_with("Stopped on ctrl-c") {
            return Ok(Outcome::Cancelled);
        }

        if lowercase.contains("unbounded") {
            return Err(Error::Solver(String::from("the model is unbounded")));
        }

        if !status.starts_with("Optimal") {
            return Err(Error::Solver(format!("unexpected cbc status '{}'", status)));
        }

        let objective = status.rsplit(' ')
                              .next()
                              .and_then(|v| v.parse::<f64>().ok())
                              .ok_or_else(|| Error::Solver(format!("no objective value in '{}'", status)))?;

        let vars: FnvHashMap<String, usize> = symbols.vars()
                                                     .map(|v| (symbols.name(v), v.index()))
                                                     .collect();
        let mut values = vec![false; symbols.len()];

        for line in lines {
            let tokens: Vec<&str> = line.split_whitespace()
                                        .filter(|&t| t != "**")
                                        .collect();

            if tokens.is_empty() {
                continue;
            }

            if tokens.len() < 3 {
                return Err(Error::Solver(format!("malformed solution line '{}'", line.trim())));
            }

            let index = vars.get(tokens[1])
                            .ok_or_else(|| Error::Solver(format!("unknown variable {}", tokens[1])))?;
            let value = tokens[2].parse::<f64>()
                                 .map_err(|_| Error::Solver(format!("malformed value in '{}'", line.trim())))?;

            values[*index] = value > 0.5;
        }

        Ok(Outcome::Optimal(Solution::new(objective, values)))
    }
}

impl Optimizer for CbcBackend {
    fn solve(&mut self, live: &LiveModel) -> Result<Outcome> {
        let start = Instant::now();
        let temp_dir = TempDir::new()?;
        let model_path = temp_dir.path().join("model.lp");
        let solution_path = temp_dir.path().join("solution.txt");

        write_lp_file(live.model(), live.extra_constraints(), &model_path)?;

        let output = Command::new(self.binary())
            .args(self.arguments(&model_path, &solution_path))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| Error::Solver(format!("failed to run {}: {}", self.binary().display(), e)))?;

        debug!("cbc finished in {:?} with {}", start.elapsed(), output.status);

        let text = match fs::read_to_string(&solution_path) {
            Ok(text) => text,
            Err(_) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                debug!("cbc stdout: {}", stdout);
                debug!("cbc stderr: {}", stderr);

                return Err(Error::Solver(format!(
                    "cbc wrote no solution: {}",
                    stderr.lines().chain(stdout.lines()).take(3).collect::<Vec<_>>().join("; ")
                )));
            }
        };

        if self.config.keep_files {
            debug!("Keeping solver files in {}", temp_dir.keep().display());
        }

        CbcBackend::parse_solution(&text, live.model().symbols())
    }
}
