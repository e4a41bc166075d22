//! SMT-LIB2 scripts asking for the value of a circuit at a point.
use std::fmt::Write;

use log::debug;
use thiserror::Error;

use crate::trace::Trace;

/// Logic declaration and Łukasiewicz connectives over reals.
pub const PREAMBLE: &str = "\
(set-logic QF_LRA)
(define-fun min ((x Real) (y Real)) Real (ite (<= x y) x y))
(define-fun max ((x Real) (y Real)) Real (ite (>= x y) x y))
(define-fun sdis ((x Real) (y Real)) Real (min 1.0 (+ x y)))
(define-fun scon ((x Real) (y Real)) Real (max 0.0 (- (+ x y) 1.0)))
(define-fun wdis ((x Real) (y Real)) Real (max x y))
(define-fun wcon ((x Real) (y Real)) Real (min y x))
(define-fun neg ((x Real)) Real (- 1.0 x))
(define-fun impl ((x Real) (y Real)) Real (min 1.0 (- (+ 1.0 y) x)))
(define-fun equiv ((x Real) (y Real)) Real (- 1.0 (max (- x y) (- y x))))
";

/// Errors while building a script for a query point.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Point has {} coordinates but the circuit has {} inputs", found, dimension)]
    DimensionMismatch { found: usize, dimension: usize },
    #[error("Coordinate {} of the point is not finite: {}", index + 1, value)]
    NonFinite { index: usize, value: f64 },
}

/// The point independent part of a script, built once per trace.
///
/// Variables `X1` to `Xdimension` are the circuit inputs. They are pinned to the coordinates of
/// the query point, all other variables are bounded to `[0, 1]`.
#[derive(Clone, Debug)]
pub struct SmtProblem {
    dimension: usize,
    max_var: usize,
    assertions: Vec<String>,
}

impl SmtProblem {
    /// Renders the trace's assertions for a circuit with `dimension` inputs.
    ///
    /// Every assertion is a single inline term. A step referenced more than once is written out
    /// at each use, so the text grows with the number of paths through the circuit rather than
    /// with the number of steps. Deeply shared traces, like a chain of `Maximum n n` steps,
    /// double in size with every step.
    pub fn new(trace: &Trace, dimension: usize) -> SmtProblem {
        let arena = trace.arena();
        let mut assertions = vec![format!("(assert (= phi {}))", arena.to_smt(trace.phi()))];

        for condition in trace.side_conditions() {
            assertions.push(format!("(assert (= {} 1.0))", arena.to_smt(condition)));
        }

        SmtProblem {
            dimension,
            max_var: trace.max_var(),
            assertions,
        }
    }

    /// Number of circuit inputs.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of declared variables, at least the number of inputs.
    pub fn var_count(&self) -> usize {
        self.max_var.max(self.dimension)
    }

    /// Rendered assertions, `phi` first.
    pub fn assertions(&self) -> &[String] {
        &self.assertions
    }

    /// Builds the complete script for `point`, coordinates printed with `precision` decimals.
    pub fn script(&self, point: &[f64], precision: usize) -> Result<String, ScriptError> {
        if point.len() != self.dimension {
            return Err(ScriptError::DimensionMismatch {
                found: point.len(),
                dimension: self.dimension,
            });
        }
        if let Some((index, &value)) = point.iter().enumerate().find(|(_, x)| !x.is_finite()) {
            return Err(ScriptError::NonFinite { index, value });
        }

        let mut script = String::from(PREAMBLE);

        // Writing into a String cannot fail.
        let _ = self.write_body(&mut script, point, precision);

        debug!("Generated SMT script:\n{}", script);

        Ok(script)
    }

    fn write_body(&self, script: &mut String, point: &[f64], precision: usize) -> std::fmt::Result {
        writeln!(script, "(declare-fun phi () Real)")?;
        for var in 1..=self.var_count() {
            writeln!(script, "(declare-fun X{} () Real)", var)?;
        }

        for var in self.dimension + 1..=self.var_count() {
            writeln!(script, "(assert (and (<= 0.0 X{0}) (<= X{0} 1.0)))", var)?;
        }

        for assertion in self.assertions.iter() {
            writeln!(script, "{}", assertion)?;
        }

        for (index, &value) in point.iter().enumerate() {
            writeln!(
                script,
                "(assert (= X{} {}))",
                index + 1,
                decimal(value, precision)
            )?;
        }

        writeln!(script, "(check-sat)")?;
        writeln!(script, "(get-value (phi))")
    }
}

/// SMT-LIB2 decimal literal with a fixed number of digits.
fn decimal(value: f64, precision: usize) -> String {
    let mut digits = format!("{:.*}", precision, value.abs());
    if precision == 0 {
        digits.push_str(".0");
    }
    if value < 0.0 {
        format!("(- {})", digits)
    } else {
        digits
    }
}
