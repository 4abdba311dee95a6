//! The two ways of classifying the output bits of a model as balanced or not.

use std::fmt;
use std::str::FromStr;
use std::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Constraint, Model, Var};
use crate::optimizer::{LiveModel, Optimizer, Outcome};

// The number of threads used for parallel calls is fixed
lazy_static! {
    static ref THREADS: usize = num_cpus::get();
}

/// What is known about a single output bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BitVerdict {
    /// No division trail ends in the unit vector of the bit: the bit sums to zero.
    Balanced,
    /// A trail to the unit vector of the bit was found.
    Unbalanced,
    /// The probe for the bit was feasible, so balancedness could not be shown.
    Unknown,
    /// The solver gave up before deciding the bit.
    Cancelled,
}

impl BitVerdict {
    pub fn is_balanced(self) -> bool {
        self == BitVerdict::Balanced
    }

    /// The character used for the bit in reports.
    pub fn symbol(self) -> char {
        match self {
            BitVerdict::Balanced => 'b',
            _ => '?',
        }
    }
}

/// Verdicts for all output bits, indexed by bit position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    verdicts: Vec<BitVerdict>,
}

impl Classification {
    pub fn new(verdicts: Vec<BitVerdict>) -> Classification {
        Classification { verdicts }
    }

    pub fn verdicts(&self) -> &[BitVerdict] {
        &self.verdicts
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn balanced_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_balanced()).count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.verdicts.iter().filter(|&&v| v == BitVerdict::Cancelled).count()
    }

    /// An integral distinguisher exists if at least one bit is balanced.
    pub fn has_distinguisher(&self) -> bool {
        self.balanced_count() > 0
    }

    pub fn balanced_bits(&self) -> Vec<usize> {
        self.verdicts.iter()
                     .enumerate()
                     .filter(|(_, v)| v.is_balanced())
                     .map(|(p, _)| p)
                     .collect()
    }
}

/// The search strategy to classify output bits with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One solve per bit with the objective forced to the bit's unit vector.
    Probe,
    /// Repeated minimisation, pinning every bit found unbalanced to zero.
    Eliminate,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "probe" => Ok(Strategy::Probe),
            "eliminate" => Ok(Strategy::Eliminate),
            _ => Err(format!("unknown strategy '{}', expected probe or eliminate", s)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Strategy::Probe => write!(f, "probe"),
            Strategy::Eliminate => write!(f, "eliminate"),
        }
    }
}

/// Constraints forcing the objective to the unit vector of `bit`.
fn unit_vector(objective: &[Var], bit: usize) -> Vec<Constraint> {
    objective.iter()
             .enumerate()
             .map(|(p, &var)| Constraint::fix(var, p == bit))
             .collect()
}

/// Decides a single bit. The unit vector constraints are retracted before returning, also
/// when the solver fails.
pub fn probe_bit<O: Optimizer>(optimizer: &mut O, live: &mut LiveModel, bit: usize) -> Result<BitVerdict> {
    let objective = live.model().objective().to_vec();
    let scope = live.scoped(unit_vector(&objective, bit));

    let verdict = match optimizer.solve(&scope)? {
        Outcome::Infeasible => BitVerdict::Balanced,
        Outcome::Optimal(_) => BitVerdict::Unknown,
        Outcome::Cancelled => BitVerdict::Cancelled,
    };

    debug!("Bit {}: {:?}", bit + 1, verdict);
    Ok(verdict)
}

/// Probes every output bit in turn.
pub fn probe<O: Optimizer>(optimizer: &mut O, model: &Model) -> Result<Classification> {
    let mut live = LiveModel::new(model.clone());

    let verdicts = (0..model.objective().len()).map(|bit| probe_bit(optimizer, &mut live, bit))
                                               .collect::<Result<Vec<_>>>()?;

    Ok(Classification::new(verdicts))
}

/// Probes the output bits on all cores. Every thread works on its own copy of the model and
/// of the optimizer, so probes never see each other's constraints.
pub fn probe_parallel<O: Optimizer + Clone>(optimizer: &O, model: &Model) -> Result<Classification> {
    let size = model.objective().len();
    let threads = (*THREADS).min(size).max(1);
    let (result_tx, result_rx) = mpsc::channel();

    // Start scoped worker threads
    let joined = crossbeam_utils::thread::scope(|scope| {
        for t in 0..threads {
            let mut optimizer = optimizer.clone();
            let mut live = LiveModel::new(model.clone());
            let result_tx = result_tx.clone();

            scope.spawn(move |_| {
                // Split the bits equally across threads
                for bit in (t..size).step_by(threads) {
                    let verdict = probe_bit(&mut optimizer, &mut live, bit);
                    let failed = verdict.is_err();

                    if result_tx.send((bit, verdict)).is_err() || failed {
                        break;
                    }
                }
            });
        }
    });

    drop(result_tx);

    if joined.is_err() {
        return Err(Error::Solver(String::from("a probe thread panicked")));
    }

    let mut verdicts = vec![BitVerdict::Unknown; size];

    for (bit, verdict) in result_rx.iter() {
        verdicts[bit] = verdict?;
    }

    Ok(Classification::new(verdicts))
}

/// Gives every bit without a verdict the verdict `verdict`.
fn settle(verdicts: &mut [Option<BitVerdict>], verdict: BitVerdict) {
    for v in verdicts.iter_mut().filter(|v| v.is_none()) {
        *v = Some(verdict);
    }
}

/// Repeatedly minimises the weight of the output division vector.
///
/// An optimum above one means no unit vector is reachable any more and every bit not yet
/// classified is balanced, as is an infeasible model. An optimum of one names an unbalanced
/// bit, which is then pinned to zero for the following solves. The zero vector is excluded
/// once if it shows up, which only happens when every input bit is constant.
pub fn eliminate<O: Optimizer>(optimizer: &mut O, model: &Model) -> Result<Classification> {
    let objective = model.objective().to_vec();
    let size = objective.len();
    let mut live = LiveModel::new(model.clone());
    let mut verdicts: Vec<Option<BitVerdict>> = vec![None; size];
    let mut zero_excluded = false;
    let mut iterations = 0;

    while iterations < size {
        let solution = match optimizer.solve(&live)? {
            Outcome::Optimal(solution) => solution,
            Outcome::Infeasible => {
                debug!("Infeasible after {} unbalanced bits", iterations);
                settle(&mut verdicts, BitVerdict::Balanced);
                break;
            }
            Outcome::Cancelled => {
                settle(&mut verdicts, BitVerdict::Cancelled);
                break;
            }
        };

        let weight = solution.weight();
        debug!("Iteration {}: minimum weight {}", iterations, weight);

        if weight > 1 {
            settle(&mut verdicts, BitVerdict::Balanced);
            break;
        }

        if weight <= 0 {
            if zero_excluded {
                return Err(Error::Solver(String::from("zero objective after excluding the zero vector")));
            }

            live.add_group(vec![Constraint::at_least_one(&objective)]);
            zero_excluded = true;
            continue;
        }

        let bit = objective.iter()
                           .position(|&var| solution.value(var))
                           .ok_or_else(|| Error::Solver(String::from("objective of one without an active bit")))?;

        if verdicts[bit].is_some() {
            return Err(Error::Solver(format!("bit {} is active although it was pinned to zero", bit + 1)));
        }

        verdicts[bit] = Some(BitVerdict::Unbalanced);
        live.add_group(vec![Constraint::fix(objective[bit], false)]);
        iterations += 1;
    }

    Ok(Classification::new(verdicts.into_iter()
                                   .map(|v| v.unwrap_or(BitVerdict::Unbalanced))
                                   .collect()))
}

/// Runs `strategy` on `model`. The parallel variant only applies to probing.
pub fn classify<O: Optimizer + Clone>(optimizer: &mut O,
                                      model: &Model,
                                      strategy: Strategy,
                                      parallel: bool)
                                      -> Result<Classification> {
    match (strategy, parallel) {
        (Strategy::Probe, true) => probe_parallel(optimizer, model),
        (Strategy::Probe, false) => probe(optimizer, model),
        (Strategy::Eliminate, _) => eliminate(optimizer, model),
    }
}
