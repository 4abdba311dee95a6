//! Symbolic constraint systems over binary division-property variables, and the primitive
//! operations the cipher compilers are assembled from.

pub mod lp;

use indexmap::IndexSet;
use itertools::Itertools;
use smallvec::SmallVec;
use std::fmt;

use crate::error::{Error, Result};
use crate::inequality::Inequality;

/// Opaque handle to a binary variable of a `SymbolTable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(usize);

impl Var {
    /// Position of the variable in the table it was minted from.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The human readable identity of a variable, e.g. `x_3_12` or `t_2_5_1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Symbol {
    role: &'static str,
    round: usize,
    indices: SmallVec<[usize; 2]>,
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}", self.role, self.round)?;

        for i in &self.indices {
            write!(f, "_{}", i)?;
        }

        Ok(())
    }
}

/// Mints variables and remembers their symbols in creation order.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: IndexSet<Symbol>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Returns the variable for a symbol, minting it on first use.
    pub fn var(&mut self, role: &'static str, round: usize, indices: &[usize]) -> Var {
        let symbol = Symbol {
            role,
            round,
            indices: indices.iter().cloned().collect(),
        };

        Var(self.symbols.insert_full(symbol).0)
    }

    pub fn symbol(&self, var: Var) -> &Symbol {
        &self.symbols[var.0]
    }

    pub fn name(&self, var: Var) -> String {
        self.symbol(var).to_string()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// All variables in creation order.
    pub fn vars(&self) -> impl Iterator<Item = Var> {
        (0..self.symbols.len()).map(Var)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ge,
    Le,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Relation::Eq => write!(f, "="),
            Relation::Ge => write!(f, ">="),
            Relation::Le => write!(f, "<="),
        }
    }
}

/// A linear constraint `sum(c_i * v_i) <relation> rhs`.
///
/// `weighted` constraints come from S-box inequality tables and are written with every
/// coefficient spelled out. The others have unit coefficients and are written as `a - b - c`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    pub terms: SmallVec<[(i64, Var); 8]>,
    pub relation: Relation,
    pub rhs: i64,
    pub weighted: bool,
}

impl Constraint {
    pub fn new<I>(terms: I, relation: Relation, rhs: i64) -> Constraint
        where I: IntoIterator<Item = (i64, Var)>
    {
        Constraint {
            terms: terms.into_iter().collect(),
            relation,
            rhs,
            weighted: false,
        }
    }

    /// `var = value`
    pub fn fix(var: Var, value: bool) -> Constraint {
        Constraint::new(vec![(1, var)], Relation::Eq, value as i64)
    }

    /// `sum(vars) >= 1`
    pub fn at_least_one(vars: &[Var]) -> Constraint {
        Constraint::new(vars.iter().map(|&v| (1, v)), Relation::Ge, 1)
    }

    /// Checks the constraint against a full 0/1 assignment indexed by variable.
    pub fn holds(&self, values: &[bool]) -> bool {
        let lhs: i64 = self.terms.iter()
                                 .filter(|(_, v)| values[v.index()])
                                 .map(|(c, _)| c)
                                 .sum();

        match self.relation {
            Relation::Eq => lhs == self.rhs,
            Relation::Ge => lhs >= self.rhs,
            Relation::Le => lhs <= self.rhs,
        }
    }
}

/// A compiled constraint system: minimise the sum of `objective` subject to `constraints` and
/// the initial assignment of the round-0 state, over binary variables.
#[derive(Clone, Debug)]
pub struct Model {
    symbols: SymbolTable,
    objective: Vec<Var>,
    constraints: Vec<Constraint>,
    initial: Vec<(Var, bool)>,
}

impl Model {
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Objective variables, indexed by the state bit they describe (0 = least significant).
    pub fn objective(&self) -> &[Var] {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The round-0 assignment. `true` marks an active bit, `false` a constant bit.
    pub fn initial(&self) -> &[(Var, bool)] {
        &self.initial
    }

    /// The initial assignment as equality constraints.
    pub fn initial_constraints(&self) -> impl Iterator<Item = Constraint> + '_ {
        self.initial.iter().map(|&(var, active)| Constraint::fix(var, active))
    }

    pub fn num_vars(&self) -> usize {
        self.symbols.len()
    }
}

/// Accumulates variables and constraints while a cipher is being compiled.
#[derive(Clone, Debug, Default)]
pub struct ModelBuilder {
    symbols: SymbolTable,
    constraints: Vec<Constraint>,
}

impl ModelBuilder {
    pub fn new() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Mints a new variable.
    ///
    /// # Panics
    /// Panics if the symbol was minted before, which would alias two quantities.
    pub fn var(&mut self, role: &'static str, round: usize, indices: &[usize]) -> Var {
        let before = self.symbols.len();
        let var = self.symbols.var(role, round, indices);

        assert!(self.symbols.len() > before, "symbol {} minted twice", self.symbols.name(var));
        var
    }

    /// Mints the word `role_round_0, ..., role_round_{len-1}`.
    pub fn word(&mut self, role: &'static str, round: usize, len: usize) -> Vec<Var> {
        (0..len).map(|i| self.var(role, round, &[i])).collect()
    }

    /// Mints `count` nibbles `role_round_j_k` of `size` bits each.
    pub fn nibbles(&mut self,
                   role: &'static str,
                   round: usize,
                   count: usize,
                   size: usize)
                   -> Vec<Vec<Var>> {
        (0..count).map(|j| (0..size).map(|k| self.var(role, round, &[j, k])).collect())
                  .collect()
    }

    pub fn constrain(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Fan-out of each bit of `input` into `out1` and `out2`: `in - out1 - out2 = 0`.
    pub fn copy(&mut self, input: &[Var], out1: &[Var], out2: &[Var]) {
        debug_assert!(input.len() == out1.len() && input.len() == out2.len());

        for ((&i, &a), &b) in input.iter().zip(out1).zip(out2) {
            self.constrain(Constraint::new(vec![(1, i), (-1, a), (-1, b)], Relation::Eq, 0));
        }
    }

    /// Division property through xor: `out - a - b = 0`.
    pub fn xor(&mut self, a: &[Var], b: &[Var], out: &[Var]) {
        debug_assert!(a.len() == b.len() && a.len() == out.len());

        for ((&x, &y), &z) in a.iter().zip(b).zip(out) {
            self.constrain(Constraint::new(vec![(1, z), (-1, x), (-1, y)], Relation::Eq, 0));
        }
    }

    /// Division property through and: `out >= a`, `out >= b` and `out <= a + b`.
    pub fn and(&mut self, a: &[Var], b: &[Var], out: &[Var]) {
        debug_assert!(a.len() == b.len() && a.len() == out.len());

        for ((&x, &y), &z) in a.iter().zip(b).zip(out) {
            self.constrain(Constraint::new(vec![(1, z), (-1, x)], Relation::Ge, 0));
            self.constrain(Constraint::new(vec![(1, z), (-1, y)], Relation::Ge, 0));
            self.constrain(Constraint::new(vec![(1, z), (-1, x), (-1, y)], Relation::Le, 0));
        }
    }

    /// One S-box instance. `input` and `output` are given most significant bit first, the
    /// order in which the inequalities address the trail coordinates.
    pub fn substitution(&mut self, inequalities: &[Inequality], input: &[Var], output: &[Var]) {
        let vars: Vec<Var> = input.iter().chain(output).cloned().collect();

        for inequality in inequalities {
            debug_assert_eq!(inequality.dimension(), vars.len());

            let terms = inequality.coefficients().iter().cloned().zip(vars.iter().cloned());
            let mut constraint = Constraint::new(terms, Relation::Ge, -inequality.constant());
            constraint.weighted = true;

            self.constrain(constraint);
        }
    }

    pub fn finish(self, objective: Vec<Var>, initial: Vec<(Var, bool)>) -> Model {
        Model {
            symbols: self.symbols,
            objective,
            constraints: self.constraints,
            initial,
        }
    }
}

/// Relabels a bit vector: the element at position `i` moves to position `table[i]`.
pub fn permute<T: Copy>(input: &[T], table: &[usize]) -> Result<Vec<T>> {
    check_permutation(table)?;

    if table.len() != input.len() {
        return Err(Error::InvalidParameter(
            format!("permutation of length {} applied to {} bits", table.len(), input.len())));
    }

    let mut output = input.to_vec();

    for (i, &p) in table.iter().enumerate() {
        output[p] = input[i];
    }

    Ok(output)
}

/// Fails unless `table` is a permutation of `0..table.len()`.
pub fn check_permutation(table: &[usize]) -> Result<()> {
    let mut seen = vec![false; table.len()];

    for &p in table {
        if p >= table.len() || seen[p] {
            return Err(Error::InvalidParameter(
                format!("[{}] is not a permutation", table.iter().join(", "))));
        }

        seen[p] = true;
    }

    Ok(())
}

fn check_rotation(len: usize, n: usize) -> Result<()> {
    if n >= len {
        return Err(Error::InvalidParameter(
            format!("rotation by {} does not fit a word of {} bits", n, len)));
    }

    Ok(())
}

/// Cyclic left rotation of a word stored most significant bit first.
pub fn rotate_left<T: Copy>(word: &[T], n: usize) -> Result<Vec<T>> {
    check_rotation(word.len(), n)?;
    let w = word.len();

    Ok((0..w).map(|i| word[(i + n) % w]).collect())
}

/// Cyclic right rotation of a word stored most significant bit first.
pub fn rotate_right<T: Copy>(word: &[T], n: usize) -> Result<Vec<T>> {
    check_rotation(word.len(), n)?;
    let w = word.len();

    Ok((0..w).map(|i| word[(i + w - n) % w]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn symbols_render_and_deduplicate() {
        let mut symbols = SymbolTable::new();
        let a = symbols.var("x", 3, &[12]);
        let b = symbols.var("t", 2, &[5, 1]);
        let c = symbols.var("x", 3, &[12]);

        assert_eq!(a, c);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols.name(a), "x_3_12");
        assert_eq!(symbols.name(b), "t_2_5_1");
    }

    #[test]
    #[should_panic(expected = "symbol y_1_0 minted twice")]
    fn builders_reject_repeated_symbols() {
        let mut builder = ModelBuilder::new();
        builder.word("x", 1, 2);
        builder.word("y", 1, 2);
        builder.word("y", 1, 1);
    }

    #[test]
    fn primitive_constraint_counts() {
        let mut builder = ModelBuilder::new();
        let a = builder.word("a", 0, 4);
        let b = builder.word("b", 0, 4);
        let c = builder.word("c", 0, 4);

        builder.copy(&a, &b, &c);
        assert_eq!(builder.num_constraints(), 4);
        builder.xor(&a, &b, &c);
        assert_eq!(builder.num_constraints(), 8);
        builder.and(&a, &b, &c);
        assert_eq!(builder.num_constraints(), 20);
    }

    #[test]
    fn and_allows_exactly_the_division_trails() {
        let mut builder = ModelBuilder::new();
        let a = builder.word("a", 0, 1);
        let b = builder.word("b", 0, 1);
        let c = builder.word("c", 0, 1);
        builder.and(&a, &b, &c);
        let model = builder.finish(c.clone(), vec![]);

        for x in 0..8 {
            let values = [x & 4 != 0, x & 2 != 0, x & 1 != 0];
            let ok = model.constraints().iter().all(|l| l.holds(&values));
            let expected = values[2] == (values[0] || values[1]);
            assert_eq!(ok, expected, "assignment {:03b}", x);
        }
    }

    #[test]
    fn substitution_negates_constant() {
        let mut builder = ModelBuilder::new();
        let x = builder.word("x", 0, 1);
        let y = builder.word("x", 1, 1);
        builder.substitution(&[Inequality::new(vec![2, -1], 3)], &x, &y);

        let model = builder.finish(y, vec![]);
        let constraint = &model.constraints()[0];
        assert!(constraint.weighted);
        assert_eq!(constraint.relation, Relation::Ge);
        assert_eq!(constraint.rhs, -3);
        assert_eq!(constraint.terms.as_slice(), &[(2, x[0]), (-1, Var(1))]);
    }

    #[test]
    fn permutation_moves_elements() {
        let out = permute(&['a', 'b', 'c', 'd'], &[2, 0, 3, 1]).unwrap();
        assert_eq!(out, vec!['b', 'd', 'a', 'c']);

        assert!(permute(&[0, 1, 2], &[0, 0, 1]).is_err());
        assert!(permute(&[0, 1, 2], &[1, 0]).is_err());
    }

    #[test]
    fn rotations() {
        let word = [0, 1, 2, 3, 4];
        assert_eq!(rotate_left(&word, 2).unwrap(), vec![2, 3, 4, 0, 1]);
        assert_eq!(rotate_right(&word, 2).unwrap(), vec![3, 4, 0, 1, 2]);
        assert_eq!(rotate_left(&word, 0).unwrap(), word.to_vec());
        assert!(matches!(rotate_left(&word, 5), Err(Error::InvalidParameter(_))));
        assert!(matches!(rotate_right(&word, 7), Err(Error::InvalidParameter(_))));
    }

    #[quickcheck]
    fn rotations_invert_each_other(word: Vec<u8>, n: usize) -> bool {
        if word.is_empty() {
            return true;
        }

        let n = n % word.len();
        let left = rotate_left(&word, n).unwrap();
        rotate_right(&left, n).unwrap() == word
    }

    #[quickcheck]
    fn permutation_is_a_relabelling(keys: Vec<u16>) -> bool {
        let mut table: Vec<usize> = (0..keys.len()).collect();
        table.sort_by_key(|&i| (keys[i], i));

        let input: Vec<usize> = (0..keys.len()).collect();
        let output = permute(&input, &table).unwrap();

        table.iter().enumerate().all(|(i, &p)| output[p] == i)
    }
}
