//! A branch and bound solver over binary variables for small test models.

use crate::error::Result;
use crate::model::{Constraint, Relation};
use crate::optimizer::{LiveModel, Optimizer, Outcome, Solution};

/// `sum(c_i x_i) >= rhs`
#[derive(Clone, Debug)]
struct Row {
    terms: Vec<(i64, usize)>,
    rhs: i64,
}

fn to_rows(constraint: &Constraint) -> Vec<Row> {
    let terms: Vec<(i64, usize)> = constraint.terms.iter().map(|&(c, v)| (c, v.index())).collect();
    let negated = || Row {
        terms: terms.iter().map(|&(c, v)| (-c, v)).collect(),
        rhs: -constraint.rhs,
    };

    match constraint.relation {
        Relation::Ge => vec![Row { terms: terms.clone(), rhs: constraint.rhs }],
        Relation::Le => vec![negated()],
        Relation::Eq => vec![Row { terms: terms.clone(), rhs: constraint.rhs }, negated()],
    }
}

struct Search<'a> {
    rows: &'a [Row],
    objective: &'a [usize],
    values: Vec<Option<bool>>,
    trail: Vec<usize>,
    best: Option<(usize, Vec<bool>)>,
}

impl<'a> Search<'a> {
    fn assign(&mut self, var: usize, value: bool) {
        self.values[var] = Some(value);
        self.trail.push(var);
    }

    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some(var) = self.trail.pop() {
                self.values[var] = None;
            }
        }
    }

    /// Fixes variables forced by some row until nothing changes. Returns false on conflict.
    fn propagate(&mut self) -> bool {
        let mut changed = true;

        while changed {
            changed = false;

            for row in self.rows {
                // Largest value the left-hand side can still reach
                let max: i64 = row.terms.iter()
                                        .map(|&(c, v)| match self.values[v] {
                                            Some(true) => c,
                                            Some(false) => 0,
                                            None => c.max(0),
                                        })
                                        .sum();

                if max < row.rhs {
                    return false;
                }

                for &(c, v) in &row.terms {
                    if self.values[v].is_none() && max - c.abs() < row.rhs {
                        self.assign(v, c > 0);
                        changed = true;
                    }
                }
            }
        }

        true
    }

    fn weight(&self) -> usize {
        self.objective.iter().filter(|&&v| self.values[v] == Some(true)).count()
    }

    fn run(&mut self) {
        let mark = self.trail.len();

        if !self.propagate() {
            self.undo(mark);
            return;
        }

        let weight = self.weight();

        if self.best.as_ref().map_or(false, |(best, _)| weight >= *best) {
            self.undo(mark);
            return;
        }

        match self.values.iter().position(Option::is_none) {
            None => {
                let values = self.values.iter().map(|v| *v == Some(true)).collect();
                self.best = Some((weight, values));
            }
            Some(var) => {
                for &value in [false, true].iter() {
                    let branch = self.trail.len();
                    self.assign(var, value);
                    self.run();
                    self.undo(branch);
                }
            }
        }

        self.undo(mark);
    }
}

/// Solves by depth first search with bound propagation. Exponential, only for models with
/// a few dozen free variables after propagation.
#[derive(Clone, Debug, Default)]
pub struct ExhaustiveSolver {
    pub solves: usize,
}

impl Optimizer for ExhaustiveSolver {
    fn solve(&mut self, live: &LiveModel) -> Result<Outcome> {
        self.solves += 1;

        let model = live.model();
        let initial: Vec<Constraint> = model.initial_constraints().collect();
        let rows: Vec<Row> = model.constraints()
                                  .iter()
                                  .chain(live.extra_constraints())
                                  .chain(initial.iter())
                                  .flat_map(to_rows)
                                  .collect();
        let objective: Vec<usize> = model.objective().iter().map(|v| v.index()).collect();

        let mut search = Search {
            rows: &rows,
            objective: &objective,
            values: vec![None; model.num_vars()],
            trail: vec![],
            best: None,
        };
        search.run();

        Ok(match search.best {
            Some((weight, values)) => Outcome::Optimal(Solution::new(weight as f64, values)),
            None => Outcome::Infeasible,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelBuilder;

    #[test]
    fn minimises_copy_chain() {
        // x -> (y, z): the active input bit must reach at least one output
        let mut builder = ModelBuilder::new();
        let x = builder.word("x", 0, 1);
        let y = builder.word("y", 1, 1);
        let z = builder.word("z", 1, 1);
        builder.copy(&x, &y, &z);

        let objective = vec![y[0], z[0]];
        let live = LiveModel::new(builder.finish(objective, vec![(x[0], true)]));

        match ExhaustiveSolver::default().solve(&live).unwrap() {
            Outcome::Optimal(solution) => {
                assert_eq!(solution.weight(), 1);
                assert!(solution.value(x[0]));
                assert!(solution.value(y[0]) != solution.value(z[0]));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn detects_infeasibility() {
        let mut builder = ModelBuilder::new();
        let a = builder.word("a", 0, 1);
        let b = builder.word("b", 0, 1);
        let c = builder.word("c", 0, 1);
        builder.xor(&a, &b, &c);
        let model = builder.finish(c.clone(), vec![(a[0], true), (b[0], false)]);

        let mut live = LiveModel::new(model);
        assert!(matches!(ExhaustiveSolver::default().solve(&live).unwrap(), Outcome::Optimal(_)));

        live.add_group(vec![Constraint::fix(c[0], false)]);
        assert_eq!(ExhaustiveSolver::default().solve(&live).unwrap(), Outcome::Infeasible);

        // Two active bits cannot be merged into one by xor
        let mut builder = ModelBuilder::new();
        let a = builder.word("a", 0, 1);
        let b = builder.word("b", 0, 1);
        let c = builder.word("c", 0, 1);
        builder.xor(&a, &b, &c);
        let live = LiveModel::new(builder.finish(c, vec![(a[0], true), (b[0], true)]));
        assert_eq!(ExhaustiveSolver::default().solve(&live).unwrap(), Outcome::Infeasible);
    }
}
