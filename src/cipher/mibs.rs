//! The MIBS Feistel cipher. The round function is an S-box layer followed by a nibble mixing
//! layer and a nibble shuffle.

use crate::cipher::{check_arguments, initial_assignment, Cipher, CipherStructure, SboxModel};
use crate::error::Result;
use crate::model::{Model, ModelBuilder, Var};

/*****************************************************************
                            MIBS
******************************************************************/

pub const MIBS_SBOX: [usize; 16] = [4, 15, 3, 8, 13, 10, 12, 0, 11, 5, 7, 14, 2, 6, 1, 9];

pub const MIBS_INEQUALITIES: [[i64; 9]; 9] = [
    [ 1,  1,  4,  1, -2, -2, -2, -2, 1],
    [ 0,  3,  0,  0, -1, -1, -1, -1, 1],
    [-1, -2, -2, -1, -1, -2,  4, -1, 6],
    [-1, -2, -2, -1,  5,  4,  5,  5, 0],
    [-1, -1, -1,  0, -1,  3, -2, -1, 4],
    [-1,  0,  0, -1, -2, -1, -1,  3, 3],
    [ 1,  0,  0,  0,  1, -1, -1, -1, 1],
    [-1, -1,  0, -1,  1,  2,  2,  1, 1],
    [ 0,  0, -1,  0, -1, -1,  2, -1, 2],
];

/// Output nibble `i` of the shuffle is input nibble `SHUFFLE[i]`.
pub const SHUFFLE: [usize; 8] = [2, 0, 3, 6, 7, 4, 5, 1];

/// A nibble of the mixing layer: its input, the temporaries `a`, `b`, `c`, the sixteen
/// fan-out copies `t`, or its output.
#[derive(Clone, Copy, Debug)]
enum Nibble {
    In(usize),
    A(usize),
    B(usize),
    C(usize),
    T(usize),
    Out(usize),
}

use self::Nibble::*;

/// Copies `(input, out1, out2)` of the mixing layer.
const MIXING_COPIES: [(Nibble, Nibble, Nibble); 16] = [
    (In(3), T(0), A(3)), (In(2), T(1), A(2)), (In(1), T(2), A(1)), (In(0), T(3), A(0)),
    (A(7), B(7), T(4)),  (A(6), B(6), T(5)),  (A(5), B(5), T(6)),  (A(4), B(4), T(7)),
    (B(3), C(3), T(8)),  (B(2), C(2), T(9)),  (B(1), C(1), T(10)), (B(0), C(0), T(11)),
    (C(7), Out(7), T(12)), (C(6), Out(6), T(13)), (C(5), Out(5), T(14)), (C(4), Out(4), T(15)),
];

/// Xors `(a, b, out)` of the mixing layer.
const MIXING_XORS: [(Nibble, Nibble, Nibble); 16] = [
    (T(0), In(7), A(7)), (T(1), In(6), A(6)), (T(2), In(5), A(5)), (T(3), In(4), A(4)),
    (T(4), A(1), B(1)),  (T(5), A(0), B(0)),  (T(6), A(3), B(3)),  (T(7), A(2), B(2)),
    (T(8), B(4), C(4)),  (T(9), B(7), C(7)),  (T(10), B(6), C(6)), (T(11), B(5), C(5)),
    (T(12), C(3), Out(3)), (T(13), C(2), Out(2)), (T(14), C(1), Out(1)), (T(15), C(0), Out(0)),
];

/// Variables of one mixing layer, nibble by nibble, most significant bit first.
struct MixingVars<'a> {
    input: &'a [Vec<Var>],
    output: &'a [Vec<Var>],
    a: Vec<Vec<Var>>,
    b: Vec<Vec<Var>>,
    c: Vec<Vec<Var>>,
    t: Vec<Vec<Var>>,
}

impl<'a> MixingVars<'a> {
    fn get(&self, nibble: Nibble) -> &[Var] {
        match nibble {
            In(i) => &self.input[i],
            A(i) => &self.a[i],
            B(i) => &self.b[i],
            C(i) => &self.c[i],
            T(i) => &self.t[i],
            Out(i) => &self.output[i],
        }
    }
}

/**
A structure representing the MIBS cipher.

size            Size of the cipher in bits. This is fixed to 64.
sbox            The MIBS S-box with its inequalities.
*/
#[derive(Clone, Debug)]
pub struct Mibs {
    size: usize,
    sbox: SboxModel,
}

impl Mibs {
    pub fn new() -> Mibs {
        Mibs {
            size: 64,
            sbox: SboxModel::new(&MIBS_SBOX, &MIBS_INEQUALITIES).expect("MIBS S-box tables are valid"),
        }
    }

    /// The variable of state bit `p` for a state split into a left and a right half of
    /// eight nibbles each. The left half holds the most significant bits.
    fn position_var(left: &[Vec<Var>], right: &[Vec<Var>], p: usize) -> Var {
        if p < 32 {
            right[7 - p / 4][3 - p % 4]
        } else {
            left[15 - p / 4][3 - p % 4]
        }
    }

    fn mixing_layer(builder: &mut ModelBuilder,
                    input: &[Vec<Var>],
                    output: &[Vec<Var>],
                    round: usize) {
        let vars = MixingVars {
            input,
            output,
            a: builder.nibbles("a", round, 8, 4),
            b: builder.nibbles("b", round, 8, 4),
            c: builder.nibbles("c", round, 8, 4),
            t: builder.nibbles("t", round, 16, 4),
        };

        for &(source, out1, out2) in MIXING_COPIES.iter() {
            builder.copy(vars.get(source), vars.get(out1), vars.get(out2));
        }

        for &(a, b, out) in MIXING_XORS.iter() {
            builder.xor(vars.get(a), vars.get(b), vars.get(out));
        }
    }
}

impl Default for Mibs {
    fn default() -> Mibs {
        Mibs::new()
    }
}

impl Cipher for Mibs {
    fn structure(&self) -> CipherStructure {
        CipherStructure::Feistel
    }

    fn size(&self) -> usize {
        self.size
    }

    fn name(&self) -> String {
        String::from("mibs")
    }

    fn model(&self, rounds: usize, constant_bits: &[usize]) -> Result<Model> {
        check_arguments(self.size, rounds, constant_bits)?;

        let mut builder = ModelBuilder::new();
        let mut left = builder.nibbles("x", 0, 8, 4);
        let mut right = builder.nibbles("y", 0, 8, 4);
        let input: Vec<Var> = (0..self.size).map(|p| Mibs::position_var(&left, &right, p))
                                             .collect();

        for round in 0..rounds {
            let u = builder.nibbles("u", round, 8, 4);
            let v = builder.nibbles("v", round, 8, 4);
            let d = builder.nibbles("d", round, 8, 4);
            let next_left = builder.nibbles("x", round + 1, 8, 4);
            let next_right = builder.nibbles("y", round + 1, 8, 4);

            // The left half feeds the round function and becomes the next right half
            builder.copy(&left.concat(), &u.concat(), &next_right.concat());

            for (x, y) in u.iter().zip(&v) {
                builder.substitution(self.sbox.inequalities(), x, y);
            }

            Mibs::mixing_layer(&mut builder, &v, &d, round);

            let shuffled: Vec<Var> = SHUFFLE.iter().flat_map(|&i| d[i].iter().cloned()).collect();
            builder.xor(&shuffled, &right.concat(), &next_left.concat());

            left = next_left;
            right = next_right;
        }

        let objective = (0..self.size).map(|p| Mibs::position_var(&left, &right, p))
                                      .collect();
        let initial = initial_assignment(&input, constant_bits);

        Ok(builder.finish(objective, initial))
    }
}
