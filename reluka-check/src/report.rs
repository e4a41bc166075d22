//! Text reports of a run.
//!
//! The first line names the checked file and the verdict, followed by an empty line and one line
//! per point:
//!
//! ```text
//! relu.pwl: PASSED: 1 | failed: 1
//!
//!   1 | MATCH    | x1: 0.25000 || alt: 0.00000 | oracle: 0.00000
//!   2 | MISMATCH | x1: 0.75000 || alt: 0.25000 | oracle: 0.30000
//! ```
use std::io;

use crate::checker::{Outcome, Report, Verdict};

/// One line summary of a verdict.
pub fn verdict_message(verdict: Verdict) -> String {
    match verdict {
        Verdict::AllPass => "PASSED ALL EVALUATIONS!!!".to_owned(),
        Verdict::AllFail => "FAILED all evaluations".to_owned(),
        Verdict::Mixed { passed, failed } => format!("PASSED: {} | failed: {}", passed, failed),
    }
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Match => "MATCH",
        Outcome::Mismatch => "MISMATCH",
        Outcome::Error(_) => "ERROR",
    }
}

/// Writes the report for the file `name`.
pub fn write_report(target: &mut impl io::Write, name: &str, report: &Report) -> io::Result<()> {
    let precision = report.tolerance.precision();

    writeln!(target, "{}: {}", name, verdict_message(report.verdict()))?;
    writeln!(target)?;

    for result in report.results.iter() {
        write!(
            target,
            "{:3} | {:<8} |",
            result.index,
            outcome_label(&result.outcome)
        )?;
        for (index, x) in result.point.iter().enumerate() {
            write!(target, " x{}: {:.*} |", index + 1, precision, x)?;
        }
        match &result.alternate {
            Some(value) => write!(target, "| alt: {:.*}", precision, value.to_f64())?,
            None => write!(target, "| alt: -")?,
        }
        write!(target, " | oracle: {:.*}", precision, result.oracle)?;
        if let Outcome::Error(message) = &result.outcome {
            write!(target, " | {}", message)?;
        }
        writeln!(target)?;
    }

    Ok(())
}
