//! LIMODSAT circuit traces.
//!
//! A trace lists the construction of a Łukasiewicz circuit, one gate per line:
//!
//! ```text
//! -= Formula phi =- MAXVAR 4
//!
//! Unit 1 :: Clause      :: 1 -2
//! Unit 2 :: Clause      :: 3
//! Unit 3 :: Maximum     :: 1 2
//!
//! Unit 4 :: Negation    :: 3
//! ```
//!
//! Gates refer to earlier gates by their 1-based position in the whole trace. Blank lines split
//! the trace into paragraphs. The last gate of the first paragraph is the circuit's output `phi`,
//! the last gate of every other paragraph is a side condition that must evaluate to `1`.
use std::io;
use std::ops::Range;

use anyhow::Error;
use log::info;
use thiserror::Error;

use crate::formula::{Connective, Formula, FormulaArena, FormulaId, Lit};

/// Possible errors while parsing a LIMODSAT trace.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {}: Unknown gate '{}'", line, tag)]
    UnknownTag { line: usize, tag: String },
    #[error("line {}: Invalid integer '{}'", line, token)]
    InvalidInteger { line: usize, token: String },
    #[error("line {}: Variable 0 is not a valid literal", line)]
    ZeroLiteral { line: usize },
    #[error("line {}: Empty clause", line)]
    EmptyClause { line: usize },
    #[error("line {}: {} expects {} operands, found {}", line, tag, expected, found)]
    OperandCount {
        line: usize,
        tag: &'static str,
        expected: usize,
        found: usize,
    },
    #[error(
        "line {}: Reference to formula {} but only {} formulas are defined",
        line,
        reference,
        defined
    )]
    InvalidReference {
        line: usize,
        reference: usize,
        defined: usize,
    },
    #[error("line {}: Malformed line '{}'", line, content)]
    Malformed { line: usize, content: String },
    #[error("Trace defines no formula")]
    EmptyTrace,
    #[error("Parser invoked after a previous error")]
    PreviousError,
}

/// A single gate of a trace, operands as written in the input.
///
/// Formula references are 1-based positions in the whole trace.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum CircuitTraceStep {
    Clause(Vec<Lit>),
    Negation(usize),
    Implication(usize, usize),
    Equivalence(usize, usize),
    Minimum(usize, usize),
    Maximum(usize, usize),
    Disjunction(usize, usize),
    Conjunction(usize, usize),
}

/// Classification of a single trace line.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TraceLine {
    /// Paragraph separator.
    Blank,
    /// Section heading, possibly announcing the largest variable used.
    Header { max_var: Option<usize> },
    Step(CircuitTraceStep),
}

const MARKER: &str = "::";

/// Parses a single line of a trace.
///
/// Steps come in two shapes, `Unit 3 :: Negation :: 2` as printed by the converter and the bare
/// `Negation 2`.
pub fn parse_trace_line(line_number: usize, line: &str) -> Result<TraceLine, TraceError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(TraceLine::Blank);
    }

    let (tag, operands) = if line.contains(MARKER) {
        let mut fields = line.splitn(3, MARKER).skip(1);
        match (fields.next(), fields.next()) {
            (Some(tag), Some(operands)) => (tag.trim(), operands),
            _ => {
                return Err(TraceError::Malformed {
                    line: line_number,
                    content: line.to_owned(),
                })
            }
        }
    } else if line.starts_with("-=") || line.ends_with(':') {
        return Ok(TraceLine::Header {
            max_var: header_max_var(line),
        });
    } else {
        let mut fields = line.splitn(2, char::is_whitespace);
        let tag = fields.next().unwrap_or("");
        (tag, fields.next().unwrap_or(""))
    };

    let integers = operands
        .split_whitespace()
        .map(|token| {
            token.parse::<i64>().map_err(|_| TraceError::InvalidInteger {
                line: line_number,
                token: token.to_owned(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let step = match tag {
        "Clause" => {
            if integers.is_empty() {
                return Err(TraceError::EmptyClause { line: line_number });
            }
            if integers.contains(&0) {
                return Err(TraceError::ZeroLiteral { line: line_number });
            }
            CircuitTraceStep::Clause(integers.into_iter().map(Lit::from_signed).collect())
        }
        "Negation" => {
            let [a] = references::<1>(line_number, "Negation", &integers)?;
            CircuitTraceStep::Negation(a)
        }
        "Implication" => binary(line_number, "Implication", &integers, CircuitTraceStep::Implication)?,
        "Equivalence" => binary(line_number, "Equivalence", &integers, CircuitTraceStep::Equivalence)?,
        "Minimum" => binary(line_number, "Minimum", &integers, CircuitTraceStep::Minimum)?,
        "Maximum" => binary(line_number, "Maximum", &integers, CircuitTraceStep::Maximum)?,
        "Disjunction" => binary(line_number, "Disjunction", &integers, CircuitTraceStep::Disjunction)?,
        "Conjunction" => binary(line_number, "Conjunction", &integers, CircuitTraceStep::Conjunction)?,
        _ => {
            return Err(TraceError::UnknownTag {
                line: line_number,
                tag: tag.to_owned(),
            })
        }
    };

    Ok(TraceLine::Step(step))
}

fn header_max_var(line: &str) -> Option<usize> {
    let mut words = line.split_whitespace();
    while let Some(word) = words.next() {
        if word == "MAXVAR" {
            return words.next().and_then(|value| value.parse().ok());
        }
    }
    None
}

fn references<const N: usize>(
    line: usize,
    tag: &'static str,
    integers: &[i64],
) -> Result<[usize; N], TraceError> {
    if integers.len() != N {
        return Err(TraceError::OperandCount {
            line,
            tag,
            expected: N,
            found: integers.len(),
        });
    }
    let mut result = [0; N];
    for (slot, &value) in result.iter_mut().zip(integers) {
        // Non-positive references are reported when resolved.
        *slot = if value > 0 { value as usize } else { 0 };
    }
    Ok(result)
}

fn binary(
    line: usize,
    tag: &'static str,
    integers: &[i64],
    step: fn(usize, usize) -> CircuitTraceStep,
) -> Result<CircuitTraceStep, TraceError> {
    let [a, b] = references::<2>(line, tag, integers)?;
    Ok(step(a, b))
}

/// A parsed trace: the formula arena, the output formula and the side conditions.
#[derive(Clone, Debug)]
pub struct Trace {
    arena: FormulaArena,
    paragraphs: Vec<Range<usize>>,
    max_var: usize,
}

impl Trace {
    /// Parse the given input into a trace.
    pub fn parse(input: impl io::Read) -> Result<Trace, Error> {
        use io::BufRead;

        let mut parser = TraceParser::new();

        for line in io::BufReader::new(input).lines() {
            parser.parse_line(&line?)?;
        }

        let trace = parser.finish()?;

        info!(
            "Parsed trace with {} formulas, {} paragraphs and {} variables",
            trace.arena().len(),
            trace.paragraphs().len(),
            trace.max_var()
        );

        Ok(trace)
    }

    pub fn arena(&self) -> &FormulaArena {
        &self.arena
    }

    /// Formula positions (0-based) grouped by paragraph.
    ///
    /// Only paragraphs containing at least one step are listed.
    pub fn paragraphs(&self) -> &[Range<usize>] {
        &self.paragraphs
    }

    /// Largest variable number used by a clause or announced in a header.
    pub fn max_var(&self) -> usize {
        self.max_var
    }

    /// The circuit output, built last in the first paragraph.
    pub fn phi(&self) -> FormulaId {
        self.paragraph_output(&self.paragraphs[0])
    }

    /// Outputs of the remaining paragraphs, each required to equal `1`.
    pub fn side_conditions(&self) -> impl Iterator<Item = FormulaId> + '_ {
        self.paragraphs[1..]
            .iter()
            .map(move |range| self.paragraph_output(range))
    }

    fn paragraph_output(&self, range: &Range<usize>) -> FormulaId {
        FormulaId::from_index(range.end - 1)
    }
}

/// Line by line trace parser.
#[derive(Default)]
pub struct TraceParser {
    arena: FormulaArena,
    paragraphs: Vec<Range<usize>>,
    paragraph_start: usize,
    max_var: usize,

    line_number: usize,
    error: bool,
}

impl TraceParser {
    pub fn new() -> TraceParser {
        TraceParser::default()
    }

    /// Parse a single line of input.
    ///
    /// If this method returns an error, the parser is in an invalid state and cannot parse further
    /// lines.
    pub fn parse_line(&mut self, line: &str) -> Result<(), TraceError> {
        if self.error {
            return Err(TraceError::PreviousError);
        }
        self.line_number += 1;

        let result = parse_trace_line(self.line_number, line).and_then(|line| self.apply(line));
        if result.is_err() {
            self.error = true;
        }
        result
    }

    /// Adds a parsed line to the trace.
    pub fn apply(&mut self, line: TraceLine) -> Result<(), TraceError> {
        match line {
            TraceLine::Blank => self.close_paragraph(),
            TraceLine::Header { max_var } => {
                if let Some(max_var) = max_var {
                    self.max_var = self.max_var.max(max_var);
                }
            }
            TraceLine::Step(step) => {
                let formula = self.build(step)?;
                if let Formula::Clause(lits) = &formula {
                    for lit in lits.iter() {
                        self.max_var = self.max_var.max(lit.var().number());
                    }
                }
                self.arena.push(formula);
            }
        }
        Ok(())
    }

    /// Finish parsing and return the trace.
    pub fn finish(mut self) -> Result<Trace, TraceError> {
        if self.error {
            return Err(TraceError::PreviousError);
        }
        self.close_paragraph();

        if self.paragraphs.is_empty() {
            return Err(TraceError::EmptyTrace);
        }

        Ok(Trace {
            arena: self.arena,
            paragraphs: self.paragraphs,
            max_var: self.max_var,
        })
    }

    fn close_paragraph(&mut self) {
        let end = self.arena.len();
        if end > self.paragraph_start {
            self.paragraphs.push(self.paragraph_start..end);
        }
        self.paragraph_start = end;
    }

    fn build(&self, step: CircuitTraceStep) -> Result<Formula, TraceError> {
        let combine = |connective, a, b| -> Result<Formula, TraceError> {
            Ok(Formula::Binary(connective, self.resolve(a)?, self.resolve(b)?))
        };

        match step {
            CircuitTraceStep::Clause(lits) => Ok(Formula::Clause(lits)),
            CircuitTraceStep::Negation(a) => Ok(Formula::Negation(self.resolve(a)?)),
            CircuitTraceStep::Implication(a, b) => combine(Connective::Implication, a, b),
            CircuitTraceStep::Equivalence(a, b) => combine(Connective::Equivalence, a, b),
            CircuitTraceStep::Minimum(a, b) => combine(Connective::Minimum, a, b),
            CircuitTraceStep::Maximum(a, b) => combine(Connective::Maximum, a, b),
            CircuitTraceStep::Disjunction(a, b) => combine(Connective::Disjunction, a, b),
            CircuitTraceStep::Conjunction(a, b) => combine(Connective::Conjunction, a, b),
        }
    }

    fn resolve(&self, reference: usize) -> Result<FormulaId, TraceError> {
        self.arena
            .resolve(reference)
            .ok_or(TraceError::InvalidReference {
                line: self.line_number,
                reference,
                defined: self.arena.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::Error;

    fn smt(trace: &Trace, id: FormulaId) -> String {
        trace.arena().to_smt(id)
    }

    #[test]
    fn two_paragraphs() -> Result<(), Error> {
        let trace = Trace::parse(&b"Clause 1 -2\n\nNegation 1\n"[..])?;

        assert_eq!(trace.max_var(), 2);
        assert_eq!(trace.paragraphs(), &[0..1, 1..2]);
        assert_eq!(smt(&trace, trace.phi()), "(sdis X1 (neg X2))");

        let side: Vec<_> = trace.side_conditions().map(|id| smt(&trace, id)).collect();
        assert_eq!(side, vec!["(neg (sdis X1 (neg X2)))".to_owned()]);
        Ok(())
    }

    #[test]
    fn converter_layout() -> Result<(), Error> {
        let input = b"-= Formula phi =- MAXVAR 6\n\
            \n\
            Unit 1 :: Clause      :: 1 -2 \n\
            Unit 2 :: Clause      :: 3 \n\
            Unit 3 :: Maximum     :: 1 2\n\
            \n\
            -= MODSAT Set Phi =-\n\
            \n\
            -= Linear Piece 1 =-\n\
            Formula 1:\n\
            Unit 1 :: Clause      :: 4 5 \n\
            Unit 2 :: Equivalence :: 4 3\n\
            \n\
            Unit 1 :: Implication :: 2 5\n\
            Unit 2 :: Conjunction :: 6 1\n\
            Unit 3 :: Disjunction :: 2 2\n\
            Unit 4 :: Minimum     :: 7 8\n";

        let trace = Trace::parse(&input[..])?;

        assert_eq!(trace.max_var(), 6);
        assert_eq!(trace.paragraphs(), &[0..3, 3..5, 5..9]);
        assert_eq!(smt(&trace, trace.phi()), "(max (sdis X1 (neg X2)) X3)");

        let side: Vec<_> = trace.side_conditions().map(|id| smt(&trace, id)).collect();
        assert_eq!(side[0], "(equiv (sdis X4 X5) (max (sdis X1 (neg X2)) X3))");
        assert_eq!(
            side[1],
            "(min (scon (impl X3 (equiv (sdis X4 X5) (max (sdis X1 (neg X2)) X3))) \
             (sdis X1 (neg X2))) (sdis X3 X3))"
        );
        Ok(())
    }

    macro_rules! expect_error {
        ( $input:expr, $( $cases:tt )* ) => {
            match Trace::parse($input as &[_]) {
                Ok(parsed) => panic!("Expected error but got {:?}", parsed),
                Err(err) => match err.downcast_ref() {
                    Some(casted_err) => match casted_err {
                        $( $cases )*,
                        _ => panic!("Unexpected error {:?}", casted_err),
                    },
                    None => panic!("Unexpected error type {:?}", err),
                }
            }
        };
    }

    #[test]
    fn malformed_steps() {
        expect_error!(
            b"Clause 1\nDisjunktion 1 1\n",
            TraceError::UnknownTag { line: 2, .. } => ()
        );
        expect_error!(
            b"Unit 1 :: Clause :: 1 x\n",
            TraceError::InvalidInteger { line: 1, .. } => ()
        );
        expect_error!(b"Clause 1 0 2\n", TraceError::ZeroLiteral { line: 1 } => ());
        expect_error!(b"Clause\n", TraceError::EmptyClause { line: 1 } => ());
        expect_error!(
            b"Clause 1\nNegation 1 1\n",
            TraceError::OperandCount { line: 2, expected: 1, found: 2, .. } => ()
        );
        expect_error!(
            b"Clause 1\nMinimum 1\n",
            TraceError::OperandCount { line: 2, expected: 2, found: 1, .. } => ()
        );
        expect_error!(
            b"Unit 1 :: Clause\n",
            TraceError::Malformed { line: 1, .. } => ()
        );
    }

    #[test]
    fn references_must_point_backwards() {
        expect_error!(
            b"Clause 1\nMaximum 1 2\n",
            TraceError::InvalidReference { line: 2, reference: 2, defined: 1 } => ()
        );
        expect_error!(
            b"Clause 1\n\nNegation 0\n",
            TraceError::InvalidReference { line: 3, reference: 0, .. } => ()
        );
        expect_error!(
            b"Clause 1\nNegation -1\n",
            TraceError::InvalidReference { line: 2, reference: 0, .. } => ()
        );
    }

    #[test]
    fn empty_traces() {
        expect_error!(b"", TraceError::EmptyTrace => ());
        expect_error!(b"-= Formula phi =-\n\n\n", TraceError::EmptyTrace => ());
    }

    #[test]
    fn header_only_paragraphs_are_skipped() -> Result<(), Error> {
        let trace = Trace::parse(&b"\n\n-= Formula phi =-\n\nClause 2\n\n\n-= Set =-\n\nClause -1\n"[..])?;

        assert_eq!(trace.paragraphs(), &[0..1, 1..2]);
        assert_eq!(smt(&trace, trace.phi()), "X2");
        Ok(())
    }
}
