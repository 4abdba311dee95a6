//! Writes models in the LP text format read by MILP solvers.

use itertools::Itertools;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::model::{Constraint, Model, SymbolTable};

/// Renders a single constraint, e.g. `x_0_1 - u_1_1 - y_1_1 = 0`.
pub fn render_constraint(symbols: &SymbolTable, constraint: &Constraint) -> String {
    let lhs = if constraint.weighted {
        constraint.terms.iter()
                        .map(|&(c, v)| format!("{} {}", c, symbols.name(v)))
                        .join(" + ")
                        .replace("+ -", "- ")
    } else {
        let mut lhs = String::new();

        for (i, &(c, v)) in constraint.terms.iter().enumerate() {
            let name = symbols.name(v);

            match (i, c) {
                (0, 1) => lhs.push_str(&name),
                (0, -1) => lhs.push_str(&format!("- {}", name)),
                (0, c) => lhs.push_str(&format!("{} {}", c, name)),
                (_, 1) => lhs.push_str(&format!(" + {}", name)),
                (_, -1) => lhs.push_str(&format!(" - {}", name)),
                (_, c) if c < 0 => lhs.push_str(&format!(" - {} {}", -c, name)),
                (_, c) => lhs.push_str(&format!(" + {} {}", c, name)),
            }
        }

        lhs
    };

    format!("{} {} {}", lhs, constraint.relation, constraint.rhs)
}

/// Writes `model` with the additional constraints `extra` appended to its constraint block.
pub fn write_lp<'a, W, I>(model: &'a Model, extra: I, out: &mut W) -> io::Result<()>
    where W: Write,
          I: IntoIterator<Item = &'a Constraint>
{
    let symbols = model.symbols();

    writeln!(out, "Minimize")?;
    writeln!(out, "{}", model.objective().iter().map(|&v| symbols.name(v)).join(" + "))?;

    writeln!(out, "Subject To")?;
    for constraint in model.constraints().iter().chain(extra) {
        writeln!(out, "{}", render_constraint(symbols, constraint))?;
    }

    for &(var, active) in model.initial() {
        writeln!(out, "{} = {}", symbols.name(var), active as u8)?;
    }

    writeln!(out, "Binary")?;
    for var in symbols.vars() {
        writeln!(out, "{}", symbols.name(var))?;
    }

    write!(out, "END")?;
    Ok(())
}

pub fn to_lp_string(model: &Model) -> String {
    let mut buffer = vec![];
    // Writing into memory cannot fail
    write_lp(model, std::iter::empty(), &mut buffer).ok();
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Writes the LP file of `model` to `path`, creating or truncating it.
pub fn write_lp_file<'a, P, I>(model: &'a Model, extra: I, path: P) -> Result<()>
    where P: AsRef<Path>,
          I: IntoIterator<Item = &'a Constraint>
{
    let mut file = BufWriter::new(File::create(path)?);
    write_lp(model, extra, &mut file)?;
    file.flush()?;
    Ok(())
}
