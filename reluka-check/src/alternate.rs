//! The encodings under test.
use std::fmt;

use log::debug;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use thiserror::Error;

use reluka_limodsat::{parse_answer, AnswerError, ScriptError, SmtProblem, Trace};
use reluka_pwl::{EvalError, PwlModel};

use crate::solver::{SmtSolver, SolverError};

/// Failure to evaluate an alternate encoding at a point.
#[derive(Debug, Error)]
pub enum AlternateError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
}

impl AlternateError {
    /// Whether the failure concerns only the current point.
    ///
    /// Solver failures and unusable answers are transient, malformed encodings and points are not.
    pub fn is_transient(&self) -> bool {
        match self {
            AlternateError::Solver(_) | AlternateError::Answer(_) => true,
            AlternateError::Eval(_) | AlternateError::Script(_) => false,
        }
    }
}

/// The value computed by an alternate encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Float(f64),
    /// An exact solver answer.
    Exact(BigRational),
}

impl Value {
    /// Nearest floating point number, NaN if the value is out of range.
    pub fn to_f64(&self) -> f64 {
        match self {
            Value::Float(value) => *value,
            Value::Exact(value) => value.to_f64().unwrap_or(std::f64::NAN),
        }
    }
}

/// Displays an exact value as a fraction.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Float(value) => fmt::Display::fmt(value, f),
            Value::Exact(value) => write!(f, "{}", value),
        }
    }
}

/// An encoding of the network that can be evaluated at points.
pub trait Alternate {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    fn dimension(&self) -> usize;

    fn evaluate(&self, point: &[f64]) -> Result<Value, AlternateError>;
}

/// Evaluates a region based PWL model directly.
pub struct PwlAlternate {
    model: PwlModel,
}

impl PwlAlternate {
    pub fn new(model: PwlModel) -> PwlAlternate {
        PwlAlternate { model }
    }

    pub fn model(&self) -> &PwlModel {
        &self.model
    }
}

impl Alternate for PwlAlternate {
    fn name(&self) -> &'static str {
        "pwl"
    }

    fn dimension(&self) -> usize {
        self.model.dimension()
    }

    fn evaluate(&self, point: &[f64]) -> Result<Value, AlternateError> {
        Ok(Value::Float(self.model.evaluate(point)?))
    }
}

/// Evaluates a LIMODSAT circuit by asking an SMT solver for the value of `phi`.
pub struct SmtAlternate<S> {
    problem: SmtProblem,
    solver: S,
    precision: usize,
}

impl<S: SmtSolver> SmtAlternate<S> {
    /// Query points are written with `precision` decimals.
    pub fn new(trace: &Trace, dimension: usize, solver: S, precision: usize) -> SmtAlternate<S> {
        SmtAlternate {
            problem: SmtProblem::new(trace, dimension),
            solver,
            precision,
        }
    }

    pub fn problem(&self) -> &SmtProblem {
        &self.problem
    }
}

impl<S: SmtSolver> Alternate for SmtAlternate<S> {
    fn name(&self) -> &'static str {
        "limodsat"
    }

    fn dimension(&self) -> usize {
        self.problem.dimension()
    }

    fn evaluate(&self, point: &[f64]) -> Result<Value, AlternateError> {
        let script = self.problem.script(point, self.precision)?;
        let output = self.solver.solve(&script)?;
        let value = parse_answer(&output)?;

        debug!("Solver answered phi = {}", value);

        Ok(Value::Exact(value))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::cell::RefCell;

    use anyhow::Error;
    use num_bigint::BigInt;

    /// Returns canned answers and remembers the scripts it was asked.
    pub struct CannedSolver {
        pub answers: RefCell<Vec<Result<String, SolverError>>>,
        pub scripts: RefCell<Vec<String>>,
    }

    impl CannedSolver {
        pub fn new(answers: Vec<Result<String, SolverError>>) -> CannedSolver {
            CannedSolver {
                answers: RefCell::new(answers),
                scripts: RefCell::new(vec![]),
            }
        }
    }

    impl SmtSolver for CannedSolver {
        fn solve(&self, script: &str) -> Result<String, SolverError> {
            self.scripts.borrow_mut().push(script.to_owned());
            let mut answers = self.answers.borrow_mut();
            if answers.is_empty() {
                Ok("unknown\n".to_owned())
            } else {
                answers.remove(0)
            }
        }
    }

    #[test]
    fn exact_values() {
        let value = Value::Exact(BigRational::new(BigInt::from(3), BigInt::from(4)));
        assert_eq!(value.to_f64(), 0.75);
        assert_eq!(value.to_string(), "3/4");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
    }

    #[test]
    fn smt_round_trip() -> Result<(), Error> {
        let trace = Trace::parse(&b"Clause 1 -2\n\nNegation 1\n"[..])?;
        let solver = CannedSolver::new(vec![Ok("sat\n((phi (/ 3 4)))\n".to_owned())]);
        let alternate = SmtAlternate::new(&trace, 1, solver, 5);

        assert_eq!(alternate.dimension(), 1);
        let value = alternate.evaluate(&[0.25])?;
        assert_eq!(value.to_f64(), 0.75);

        let scripts = alternate.solver.scripts.borrow();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("(assert (= X1 0.25000))\n"));
        Ok(())
    }

    #[test]
    fn error_classification() -> Result<(), Error> {
        let trace = Trace::parse(&b"Clause 1\n"[..])?;
        let solver = CannedSolver::new(vec![
            Err(SolverError::Timeout(std::time::Duration::from_millis(5))),
            Ok("unsat\n".to_owned()),
        ]);
        let alternate = SmtAlternate::new(&trace, 1, solver, 5);

        let timeout = alternate.evaluate(&[0.5]).unwrap_err();
        assert!(timeout.is_transient());
        let unsat = alternate.evaluate(&[0.5]).unwrap_err();
        assert!(unsat.is_transient());
        let bad_point = alternate.evaluate(&[0.5, 0.5]).unwrap_err();
        assert!(!bad_point.is_transient());
        Ok(())
    }

    #[test]
    fn pwl_values() -> Result<(), Error> {
        let model = reluka_pwl::PwlParser::parse(&b"b -0.5 1\np 0 1 0 1\nl 1\np -1 2 1 1\ng 1\n"[..])?;
        let alternate = PwlAlternate::new(model);

        assert_eq!(alternate.evaluate(&[0.25])?, Value::Float(0.0));
        assert_eq!(alternate.evaluate(&[0.75])?, Value::Float(0.25));
        match alternate.evaluate(&[0.5, 0.5]) {
            Err(err @ AlternateError::Eval(_)) => assert!(!err.is_transient()),
            other => panic!("Unexpected result {:?}", other),
        }
        Ok(())
    }
}
