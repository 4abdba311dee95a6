//! The interface to 0/1 linear program solvers, and models that can be extended with
//! temporary constraint groups between solves.

pub mod cbc;
#[cfg(test)]
pub mod exhaustive;

use std::ops::Deref;

use crate::error::Result;
use crate::model::{Constraint, Model, Var};

/// An optimal assignment found by a solver.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    objective: f64,
    values: Vec<bool>,
}

impl Solution {
    /// `values` is indexed by variable.
    pub fn new(objective: f64, values: Vec<bool>) -> Solution {
        Solution { objective, values }
    }

    /// The objective rounded to the nearest integer. All variables are binary, so this is
    /// the number of objective variables set to 1.
    pub fn weight(&self) -> i64 {
        self.objective.round() as i64
    }

    pub fn value(&self, var: Var) -> bool {
        self.values.get(var.index()).cloned().unwrap_or(false)
    }
}

/// The result of a solve.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Optimal(Solution),
    Infeasible,
    /// The solver gave up, e.g. on a time limit.
    Cancelled,
}

/// A solver that minimises the objective of a `LiveModel` over binary variables.
pub trait Optimizer: Send {
    fn solve(&mut self, model: &LiveModel) -> Result<Outcome>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

/// A model together with constraint groups added on top of it. Groups can be retracted
/// again, which leaves the model as it was before they were added.
#[derive(Clone, Debug)]
pub struct LiveModel {
    model: Model,
    groups: Vec<(GroupId, Vec<Constraint>)>,
    next_id: usize,
}

impl LiveModel {
    pub fn new(model: Model) -> LiveModel {
        LiveModel {
            model,
            groups: vec![],
            next_id: 0,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Adds a group that stays until it is removed with `remove_group`.
    pub fn add_group(&mut self, constraints: Vec<Constraint>) -> GroupId {
        let id = GroupId(self.next_id);
        self.next_id += 1;
        self.groups.push((id, constraints));
        id
    }

    /// Removes a group. Returns false if there was no such group.
    pub fn remove_group(&mut self, id: GroupId) -> bool {
        let before = self.groups.len();
        self.groups.retain(|(g, _)| *g != id);
        before != self.groups.len()
    }

    /// Adds a group that is removed when the returned guard goes out of scope.
    pub fn scoped(&mut self, constraints: Vec<Constraint>) -> ScopedGroup<'_> {
        let id = self.add_group(constraints);
        ScopedGroup { live: self, id }
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Constraints of all groups, in the order the groups were added.
    pub fn extra_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.groups.iter().flat_map(|(_, constraints)| constraints.iter())
    }
}

/// A constraint group that is retracted on drop, whichever way the scope is left.
pub struct ScopedGroup<'a> {
    live: &'a mut LiveModel,
    id: GroupId,
}

impl<'a> Deref for ScopedGroup<'a> {
    type Target = LiveModel;

    fn deref(&self) -> &LiveModel {
        &*self.live
    }
}

impl<'a> Drop for ScopedGroup<'a> {
    fn drop(&mut self) {
        self.live.remove_group(self.id);
    }
}
