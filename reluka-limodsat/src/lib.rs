//! Translation of LIMODSAT circuit traces into SMT-LIB2 queries.
//!
//! A [`Trace`] is parsed from the converter's output, turned into an [`SmtProblem`] once and then
//! rendered into one script per query point. The value a solver reports for `phi` is recovered
//! exactly by [`parse_answer`].
pub mod answer;
pub mod formula;
pub mod smt;
pub mod trace;

pub use answer::{parse_answer, AnswerError};
pub use formula::{Connective, Formula, FormulaArena, FormulaId, Lit, Var};
pub use smt::{ScriptError, SmtProblem, PREAMBLE};
pub use trace::{parse_trace_line, CircuitTraceStep, Trace, TraceError, TraceLine, TraceParser};
