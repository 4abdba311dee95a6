//! Linear inequalities over the bits of division trails, and the greedy reduction of an
//! H-representation to a small subset that still describes the trails exactly.

use fnv::FnvHashSet;
use itertools::Itertools;
use rand::Rng;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::utility::{bits_to_mask, hypercube};

/// Largest point dimension whose hypercube is checked point by point.
const EXHAUSTIVE_DIMENSION: usize = 20;

/// Points checked by the sampled separation test above `EXHAUSTIVE_DIMENSION`.
const SEPARATION_SAMPLES: usize = 1 << 20;

/// The linear inequality `c_1 z_1 + ... + c_d z_d + b >= 0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Inequality {
    coefficients: Vec<i64>,
    constant: i64,
}

impl Inequality {
    pub fn new(coefficients: Vec<i64>, constant: i64) -> Inequality {
        Inequality { coefficients, constant }
    }

    /// Builds an inequality from a row `c_1 ... c_d b`, the layout used by the inequality
    /// files and by the S-box tables of the cipher models.
    ///
    /// # Panics
    /// Panics if `row` is empty.
    pub fn from_row(row: &[i64]) -> Inequality {
        let (&constant, coefficients) = row.split_last().expect("Empty inequality row");
        Inequality::new(coefficients.to_vec(), constant)
    }

    /// Number of variables the inequality ranges over.
    pub fn dimension(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[i64] {
        &self.coefficients
    }

    pub fn constant(&self) -> i64 {
        self.constant
    }

    /// Value of `c . p + b` at the 0/1 point `p`, packed into an integer with the first
    /// coordinate as its most significant bit.
    fn evaluate_mask(&self, point: usize) -> i64 {
        let d = self.dimension();

        self.coefficients.iter()
                         .enumerate()
                         .filter(|(i, _)| (point >> (d - 1 - i)) & 0x1 == 1)
                         .map(|(_, &c)| c)
                         .sum::<i64>() + self.constant
    }
}

impl fmt::Display for Inequality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.coefficients.iter().join(" "), self.constant)
    }
}

/// Parses inequalities, one per line, as whitespace separated integers `c_1 ... c_d b`.
/// Blank lines are skipped. Rows written as `[c_1, ..., b]` are accepted as well.
pub fn parse_inequalities(text: &str) -> Result<Vec<Inequality>> {
    let mut inequalities = vec![];

    for (i, line) in text.lines().enumerate() {
        let row = parse_integers(line, i + 1)?;

        if row.is_empty() {
            continue;
        }

        if row.len() < 2 {
            return Err(Error::Parse {
                line: i + 1,
                reason: String::from("an inequality needs at least one coefficient and a constant"),
            });
        }

        inequalities.push(Inequality::from_row(&row));
    }

    check_dimensions(inequalities.iter().map(Inequality::dimension))?;
    Ok(inequalities)
}

/// Parses 0/1 points, one per line, written either as `[0, 1, ...]` or `0 1 ...`.
pub fn parse_points(text: &str) -> Result<Vec<Vec<u8>>> {
    let mut points = vec![];

    for (i, line) in text.lines().enumerate() {
        let row = parse_integers(line, i + 1)?;

        if row.is_empty() {
            continue;
        }

        if row.iter().any(|&x| x != 0 && x != 1) {
            return Err(Error::Parse {
                line: i + 1,
                reason: String::from("points must only contain 0 and 1"),
            });
        }

        points.push(row.into_iter().map(|x| x as u8).collect());
    }

    check_dimensions(points.iter().map(Vec::len))?;
    Ok(points)
}

fn parse_integers(line: &str, line_number: usize) -> Result<Vec<i64>> {
    line.split(|c: char| c == ',' || c == '[' || c == ']' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<i64>().map_err(|_| Error::Parse {
            line: line_number,
            reason: format!("'{}' is not an integer", token),
        }))
        .collect()
}

fn check_dimensions<I: Iterator<Item = usize>>(mut dimensions: I) -> Result<()> {
    if let Some(first) = dimensions.next() {
        if let Some(other) = dimensions.find(|&d| d != first) {
            return Err(Error::InvalidParameter(
                format!("mixed dimensions {} and {} in one input", first, other)));
        }
    }

    Ok(())
}

pub fn read_inequalities<P: AsRef<Path>>(path: P) -> Result<Vec<Inequality>> {
    parse_inequalities(&fs::read_to_string(path)?)
}

pub fn read_points<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<u8>>> {
    parse_points(&fs::read_to_string(path)?)
}

pub fn write_inequalities<P: AsRef<Path>>(inequalities: &[Inequality], path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    for inequality in inequalities {
        writeln!(file, "{}", inequality)?;
    }

    file.flush()?;
    Ok(())
}

/// All points of `{0,1}^d` that are not in `points`.
pub fn forbidden_points(points: &[Vec<u8>], d: usize) -> Vec<Vec<u8>> {
    let allowed: FnvHashSet<&[u8]> = points.iter().map(|p| p.as_slice()).collect();

    hypercube(d).filter(|p| !allowed.contains(p.as_slice()))
                .collect()
}

fn validate(points: &[Vec<u8>], inequalities: &[Inequality]) -> Result<usize> {
    let d = match points.first() {
        Some(p) => p.len(),
        None => return Err(Error::InvalidParameter(String::from("the point set is empty"))),
    };

    if points.iter().any(|p| p.len() != d) {
        return Err(Error::InvalidParameter(String::from("points of different dimensions")));
    }

    if let Some(bad) = inequalities.iter().find(|l| l.dimension() != d) {
        return Err(Error::InvalidParameter(
            format!("inequality of dimension {} used with points of dimension {}", bad.dimension(), d)));
    }

    if d >= usize::BITS as usize {
        return Err(Error::InvalidParameter(format!("dimension {} is too large", d)));
    }

    Ok(d)
}

/// Greedily selects a subset of `candidates` that cuts off every point of `{0,1}^d` outside
/// `points`.
///
/// In each step the candidate violated by the most forbidden points that are not yet cut off
/// is selected (the first one on ties), and those points are removed. The result is an exact
/// separator but not necessarily one of minimum size. The candidates are assumed to be valid
/// for `points`, as the facets of their convex hull are.
pub fn reduce(points: &[Vec<u8>], candidates: &[Inequality]) -> Result<Vec<Inequality>> {
    let d = validate(points, candidates)?;

    let allowed: FnvHashSet<usize> = points.iter().map(|p| bits_to_mask(p)).collect();
    let mut forbidden: Vec<usize> = (0..(1usize << d)).filter(|x| !allowed.contains(x))
                                                      .collect();
    let mut remaining: Vec<&Inequality> = candidates.iter().collect();
    let mut selected = vec![];

    debug!("Reducing {} inequalities against {} forbidden points", candidates.len(), forbidden.len());

    while !forbidden.is_empty() {
        let mut best: Option<(usize, usize)> = None;

        for (i, inequality) in remaining.iter().enumerate() {
            let count = forbidden.iter()
                                 .filter(|&&p| inequality.evaluate_mask(p) < 0)
                                 .count();

            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((i, count));
            }
        }

        let (index, count) = match best {
            Some(b) => b,
            None => return Err(Error::Unseparable { remaining: forbidden.len() }),
        };

        let inequality = remaining.remove(index);
        forbidden.retain(|&p| inequality.evaluate_mask(p) >= 0);
        selected.push(inequality.clone());

        debug!("Selected {} (cuts {} points, {} left)", inequality, count, forbidden.len());
    }

    Ok(selected)
}

/// Checks exhaustively that every point of `points` satisfies all inequalities and that every
/// other point of `{0,1}^d` violates at least one of them.
pub fn separates(points: &[Vec<u8>], inequalities: &[Inequality]) -> bool {
    let d = match validate(points, inequalities) {
        Ok(d) => d,
        Err(_) => return false,
    };

    let allowed: FnvHashSet<usize> = points.iter().map(|p| bits_to_mask(p)).collect();

    (0..(1usize << d)).all(|p| {
        let inside = inequalities.iter().all(|l| l.evaluate_mask(p) >= 0);
        inside == allowed.contains(&p)
    })
}

/// Like `separates`, but only checks the trail points and `samples` random points of the
/// hypercube. Used for wide S-boxes where the full hypercube is out of reach.
pub fn separates_sampled<R: Rng>(points: &[Vec<u8>],
                                 inequalities: &[Inequality],
                                 samples: usize,
                                 rng: &mut R)
                                 -> bool {
    let d = match validate(points, inequalities) {
        Ok(d) => d,
        Err(_) => return false,
    };

    let allowed: FnvHashSet<usize> = points.iter().map(|p| bits_to_mask(p)).collect();

    if !allowed.iter().all(|&p| inequalities.iter().all(|l| l.evaluate_mask(p) >= 0)) {
        return false;
    }

    (0..samples).all(|_| {
        let p = rng.gen_range(0..(1usize << d));
        allowed.contains(&p) || inequalities.iter().any(|l| l.evaluate_mask(p) < 0)
    })
}

/// Checks separation exhaustively when `{0,1}^d` has at most `2^EXHAUSTIVE_DIMENSION` points
/// and with `SEPARATION_SAMPLES` random points otherwise.
pub fn check_separation<R: Rng>(points: &[Vec<u8>], inequalities: &[Inequality], rng: &mut R) -> bool {
    let d = points.first().map_or(0, |p| p.len());

    if d <= EXHAUSTIVE_DIMENSION {
        separates(points, inequalities)
    } else {
        separates_sampled(points, inequalities, SEPARATION_SAMPLES, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{mibs, spn};
    use crate::sbox::Sbox;
    use quickcheck_macros::quickcheck;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    fn trail_points(table: &[usize]) -> Vec<Vec<u8>> {
        Sbox::new(table.to_vec()).unwrap()
                                 .division_trails()
                                 .iter()
                                 .map(|t| t.to_bits())
                                 .collect()
    }

    fn table_inequalities(rows: &[[i64; 9]]) -> Vec<Inequality> {
        rows.iter().map(|row| Inequality::from_row(row)).collect()
    }

    /// The exact H-representation of the trails of the n-bit identity S-box: `u_i = v_i`
    /// written as two halves, plus the unit cube bounds.
    fn identity_hrep(n: usize) -> Vec<Inequality> {
        let d = 2 * n;
        let mut hrep = vec![];

        for i in 0..n {
            let mut c = vec![0; d];
            c[i] = 1;
            c[n + i] = -1;
            hrep.push(Inequality::new(c.clone(), 0));
            hrep.push(Inequality::new(c.iter().map(|x| -x).collect(), 0));
        }

        for i in 0..d {
            let mut c = vec![0; d];
            c[i] = 1;
            hrep.push(Inequality::new(c.clone(), 0));
            c[i] = -1;
            hrep.push(Inequality::new(c, 1));
        }

        hrep
    }

    /// The cut `sum_{p_i = 0} z_i - sum_{p_i = 1} z_i + |p| - 1 >= 0` removes exactly `p`.
    fn no_good_cut(p: &[u8]) -> Inequality {
        let weight = p.iter().filter(|&&x| x == 1).count() as i64;
        let c = p.iter().map(|&x| if x == 1 { -1 } else { 1 }).collect();
        Inequality::new(c, weight - 1)
    }

    #[test]
    fn evaluates_rows() {
        let l = Inequality::from_row(&[1, -2, 3]);
        assert_eq!(l.dimension(), 2);
        assert_eq!(l.evaluate_mask(0b11), 2);
        assert_eq!(l.evaluate_mask(0b01), 1);
        assert_eq!(l.evaluate_mask(0b10), 4);
        assert_eq!(l.to_string(), "1 -2 3");
    }

    #[test]
    fn segment_reduction() {
        let points = vec![vec![0, 0], vec![1, 1]];
        let reduced = reduce(&points, &identity_hrep(1)).unwrap();

        assert_eq!(reduced, vec![Inequality::new(vec![1, -1], 0),
                                 Inequality::new(vec![-1, 1], 0)]);
    }

    #[test]
    fn identity_needs_only_the_equalities() {
        for n in 1..=4 {
            let table: Vec<usize> = (0..(1 << n)).collect();
            let points = trail_points(&table);
            let reduced = reduce(&points, &identity_hrep(n)).unwrap();

            assert_eq!(reduced.len(), 2 * n);
            assert!(reduced.iter().all(|l| l.constant() == 0));
            assert!(reduced.iter().all(|l| l.coefficients().iter().filter(|&&c| c != 0).count() == 2));
            assert!(separates(&points, &reduced));
        }
    }

    #[test]
    fn cipher_tables_are_exact() {
        let cases: [(&[usize], &[[i64; 9]]); 3] = [
            (&spn::GIFT_SBOX, &spn::GIFT_INEQUALITIES),
            (&spn::PRESENT_SBOX, &spn::PRESENT_INEQUALITIES),
            (&mibs::MIBS_SBOX, &mibs::MIBS_INEQUALITIES),
        ];

        for (table, rows) in cases.iter() {
            assert!(separates(&trail_points(table), &table_inequalities(rows)));
        }
    }

    #[test]
    fn reduces_present_table() {
        let points = trail_points(&spn::PRESENT_SBOX);
        let candidates = table_inequalities(&spn::PRESENT_INEQUALITIES);
        let reduced = reduce(&points, &candidates).unwrap();

        // The fourth row is implied by the others on the hypercube
        assert_eq!(reduced.len(), 10);
        assert_eq!(reduced[0], candidates[0]);
        assert!(!reduced.contains(&candidates[3]));
        assert!(separates(&points, &reduced));

        let gift = reduce(&trail_points(&spn::GIFT_SBOX),
                          &table_inequalities(&spn::GIFT_INEQUALITIES)).unwrap();
        assert_eq!(gift.len(), 15);
    }

    #[test]
    fn detects_inexact_candidates() {
        let points = trail_points(&spn::GIFT_SBOX);
        let bounds: Vec<Inequality> = identity_hrep(4).into_iter().skip(8).collect();

        match reduce(&points, &bounds) {
            Err(Error::Unseparable { remaining }) => assert_eq!(remaining, 256 - 49),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn forbidden_complements_points() {
        let points = trail_points(&spn::GIFT_SBOX);
        assert_eq!(forbidden_points(&points, 8).len(), 256 - points.len());
    }

    #[test]
    fn sampled_check_agrees_on_tables() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let points = trail_points(&mibs::MIBS_SBOX);
        let rows = table_inequalities(&mibs::MIBS_INEQUALITIES);

        assert!(separates_sampled(&points, &rows, 1000, &mut rng));

        // Dropping every cut lets all forbidden points through
        let bounds: Vec<Inequality> = identity_hrep(4).into_iter().skip(8).collect();
        assert!(!separates_sampled(&points, &bounds, 1000, &mut rng));
    }

    #[test]
    fn five_bit_sbox_reduction() {
        let mut rng = StdRng::seed_from_u64(0x5b0c);
        let mut table: Vec<usize> = (0..32).collect();
        table.shuffle(&mut rng);

        let points = trail_points(&table);
        let all_ones = vec![1; 10];
        assert!(points.contains(&vec![0; 10]));
        assert!(points.contains(&all_ones));

        // A fully active input only reaches the fully active output
        assert_eq!(points.iter().filter(|p| p[..5] == all_ones[..5]).count(), 1);

        let forbidden = forbidden_points(&points, 10);
        assert_eq!(forbidden.len() + points.len(), 1024);

        let candidates: Vec<Inequality> = forbidden.iter().map(|p| no_good_cut(p)).collect();
        let reduced = reduce(&points, &candidates).unwrap();

        assert!(!reduced.is_empty() && reduced.len() <= candidates.len());
        assert!(separates(&points, &reduced));
        assert!(separates_sampled(&points, &reduced, 4096, &mut rng));
        assert!(check_separation(&points, &reduced, &mut rng));

        // Without the cut for one forbidden point the check has to find that point
        let missing = no_good_cut(&forbidden[forbidden.len() / 2]);
        let leaky: Vec<Inequality> = candidates.iter().filter(|&l| *l != missing).cloned().collect();
        assert!(!check_separation(&points, &leaky, &mut rng));
    }

    #[quickcheck]
    fn reduction_keeps_separation(seeds: Vec<i8>) -> bool {
        let points = trail_points(&spn::GIFT_SBOX);

        // Random cuts made tight on the trail set, followed by one cut per forbidden point
        let mut candidates: Vec<Inequality> = seeds.chunks(8)
            .filter(|chunk| chunk.len() == 8)
            .map(|chunk| {
                let c: Vec<i64> = chunk.iter().map(|&x| i64::from(x % 4)).collect();
                let min = points.iter()
                                .map(|p| c.iter().zip(p).map(|(a, &b)| a * i64::from(b)).sum::<i64>())
                                .min()
                                .unwrap();
                Inequality::new(c, -min)
            })
            .collect();
        candidates.extend(forbidden_points(&points, 8).iter().map(|p| no_good_cut(p)));

        let reduced = reduce(&points, &candidates).unwrap();
        separates(&points, &reduced) && reduced.len() <= candidates.len()
    }

    #[test]
    fn parses_files() {
        let inequalities = parse_inequalities("1 1 -1 0\n\n0 -1 2 1\n").unwrap();
        assert_eq!(inequalities.len(), 2);
        assert_eq!(inequalities[1].constant(), 1);

        let points = parse_points("[0, 0, 0]\n[1, 0, 1]\n").unwrap();
        assert_eq!(points, vec![vec![0, 0, 0], vec![1, 0, 1]]);

        assert!(matches!(parse_points("[0, 2]"), Err(Error::Parse { line: 1, .. })));
        assert!(matches!(parse_inequalities("1 2 3\n1 2"), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn inequality_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reduced.txt");
        let rows = table_inequalities(&mibs::MIBS_INEQUALITIES);

        write_inequalities(&rows, &path).unwrap();
        assert_eq!(read_inequalities(&path).unwrap(), rows);
    }
}
