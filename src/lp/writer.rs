// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Writer for the CPLEX LP file format.

use std::fmt::{self, Display, Formatter};

use super::{Domain, LinearProgram, VarId};

/// Name of the fixed variable that carries the constant of the objective.
const CONSTANT_VAR: &str = "ONE_VAR_CONSTANT";

/// Formats a [`LinearProgram`] in CPLEX LP format.
pub(crate) struct LpWriter<'a> {
    lp: &'a LinearProgram,
    symbolic_labels: bool,
}

impl<'a> LpWriter<'a> {
    pub(crate) fn new(lp: &'a LinearProgram, symbolic_labels: bool) -> Self {
        Self {
            lp,
            symbolic_labels,
        }
    }

    fn var_name(&self, id: VarId) -> String {
        if self.symbolic_labels {
            sanitize(&self.lp.variable(id).name)
        } else {
            format!("x{}", id.index())
        }
    }

    fn constraint_name(&self, index: usize) -> String {
        if self.symbolic_labels {
            sanitize(&self.lp.constraints()[index].name)
        } else {
            format!("c{index}")
        }
    }

    fn needs_constant_var(&self) -> bool {
        self.lp.objective().constant() != 0.0
            || self.lp.constraints().iter().any(|c| c.terms.is_empty())
    }

    fn write_terms(&self, f: &mut Formatter<'_>, terms: &[(VarId, f64)]) -> fmt::Result {
        if terms.is_empty() {
            return write!(f, " +0 {CONSTANT_VAR}");
        }
        for (var, coefficient) in terms {
            write!(f, " {} {}", signed(*coefficient), self.var_name(*var))?;
        }
        Ok(())
    }
}

/// Replaces the characters that the LP format doesn't allow in names.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "_()[],.".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn number(value: f64) -> String {
    format!("{value:?}")
}

fn signed(value: f64) -> String {
    if value < 0.0 {
        format!("-{}", number(-value))
    } else {
        format!("+{}", number(value))
    }
}

impl Display for LpWriter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let lp = self.lp;

        writeln!(f, "\\* solph *\\")?;
        writeln!(f)?;
        writeln!(f, "min")?;
        write!(f, "objective:")?;
        let objective = lp.objective().simplified();
        if objective.terms().is_empty() && objective.constant() == 0.0 {
            write!(f, " +0 {CONSTANT_VAR}")?;
        } else {
            for (var, coefficient) in objective.terms() {
                write!(f, " {} {}", signed(*coefficient), self.var_name(*var))?;
            }
            if objective.constant() != 0.0 {
                write!(f, " {} {CONSTANT_VAR}", signed(objective.constant()))?;
            }
        }
        writeln!(f)?;
        writeln!(f)?;

        writeln!(f, "s.t.")?;
        for (index, constraint) in lp.constraints().iter().enumerate() {
            write!(f, "{}:", self.constraint_name(index))?;
            self.write_terms(f, &constraint.terms)?;
            writeln!(f, " {} {}", constraint.sense, number(constraint.rhs))?;
        }
        writeln!(f)?;

        writeln!(f, "bounds")?;
        for (index, var) in lp.variables().iter().enumerate() {
            let name = self.var_name(VarId(index));
            match (var.lower, var.upper) {
                (lower, upper) if lower == upper => writeln!(f, " {name} = {}", number(lower))?,
                (lower, upper) if lower.is_infinite() && upper.is_infinite() => {
                    writeln!(f, " {name} free")?
                }
                (lower, upper) if upper.is_infinite() => {
                    writeln!(f, " {name} >= {}", number(lower))?
                }
                (lower, upper) if lower.is_infinite() => {
                    writeln!(f, " -inf <= {name} <= {}", number(upper))?
                }
                (lower, upper) => {
                    writeln!(f, " {} <= {name} <= {}", number(lower), number(upper))?
                }
            }
        }
        if self.needs_constant_var() || objective.is_empty() {
            writeln!(f, " {CONSTANT_VAR} = 1.0")?;
        }

        for (section, domain) in [("general", Domain::Integer), ("binary", Domain::Binary)] {
            let names = lp
                .variables()
                .iter()
                .enumerate()
                .filter(|(_, v)| v.domain == domain)
                .map(|(i, _)| self.var_name(VarId(i)))
                .collect::<Vec<_>>();
            if !names.is_empty() {
                writeln!(f, "{section}")?;
                for name in names {
                    writeln!(f, " {name}")?;
                }
            }
        }

        writeln!(f, "end")
    }
}

#[cfg(test)]
mod tests {
    use crate::lp::{Domain, LinearExpr, LinearProgram, Sense};
    use crate::Error;

    #[test]
    fn test_lp_format() -> Result<(), Error> {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable("flow(a b,c,0)", 0.0, 10.0, Domain::Continuous)?;
        let y = lp.add_variable("status(c,0)", 0.0, 1.0, Domain::Binary)?;
        let z = lp.add_variable("n", 2.0, f64::INFINITY, Domain::Integer)?;
        lp.add_objective(&(LinearExpr::term(x, 0.5) + LinearExpr::term(z, -1.0) + 3.0));
        lp.add_constraint(
            "limit",
            LinearExpr::from(x) - LinearExpr::term(y, 10.0),
            Sense::Le,
            0.0,
        )?;

        let symbolic = lp.to_lp_string(true);
        assert_eq!(
            symbolic,
            "\\* solph *\\\n\
             \n\
             min\n\
             objective: +0.5 flow(a_b,c,0) -1.0 n +3.0 ONE_VAR_CONSTANT\n\
             \n\
             s.t.\n\
             limit: +1.0 flow(a_b,c,0) -10.0 status(c,0) <= 0.0\n\
             \n\
             bounds\n \
             0.0 <= flow(a_b,c,0) <= 10.0\n \
             0.0 <= status(c,0) <= 1.0\n \
             n >= 2.0\n \
             ONE_VAR_CONSTANT = 1.0\n\
             general\n \
             n\n\
             binary\n \
             status(c,0)\n\
             end\n"
        );

        let numbered = lp.to_lp_string(false);
        assert!(numbered.contains("c0: +1.0 x0 -10.0 x1 <= 0.0\n"));
        assert!(numbered.contains("objective: +0.5 x0 -1.0 x2 +3.0 ONE_VAR_CONSTANT\n"));
        Ok(())
    }
}
