//! Parser, writer and evaluator for region based piecewise linear (PWL) files.
//!
//! A PWL file describes a piecewise linear function as an ordered list of convex regions, each
//! carrying an affine formula with rational coefficients:
//!
//! ```text
//! pwl
//!
//! b -0.5 1
//!
//! p 0 1 0 1
//! l 1
//! p -1 2 1 1
//! g 1
//! ```
//!
//! `b` lines define boundary prototypes (constant term followed by one coefficient per input),
//! `p` lines start a region and list its formula as numerator/denominator pairs and `g`/`l` lines
//! restrict the current region to the non-negative/non-positive side of a prototype, using a
//! 1-based prototype index.
use std::io;

use anyhow::Error;
use log::info;
use thiserror::Error;

pub mod model;

pub use model::{BoundaryConstraint, BoundaryPrototype, Direction, EvalError, Fraction, PwlModel, Region};

/// Possible errors while parsing a PWL file.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("line {}: Unexpected line in PWL input: '{}'", line, content)]
    UnexpectedLine { line: usize, content: String },
    #[error("line {}: Invalid number: '{}'", line, token)]
    InvalidNumber { line: usize, token: String },
    #[error("line {}: Denominator must be positive, found {}", line, denom)]
    InvalidDenominator { line: usize, denom: i64 },
    #[error("line {}: Boundary constraint outside of a region", line)]
    ConstraintBeforeRegion { line: usize },
    #[error(
        "line {}: Boundary constraint refers to prototype {} but only {} are defined",
        line,
        index,
        defined
    )]
    InvalidPrototypeIndex {
        line: usize,
        index: usize,
        defined: usize,
    },
    #[error(
        "line {}: Boundary prototype has {} values, expected {} for dimension {}",
        line,
        found,
        dimension + 1,
        dimension
    )]
    PrototypeLength {
        line: usize,
        found: usize,
        dimension: usize,
    },
    #[error(
        "line {}: Region formula has {} integers, expected {} for dimension {}",
        line,
        found,
        2 * (dimension + 1),
        dimension
    )]
    FormulaLength {
        line: usize,
        found: usize,
        dimension: usize,
    },
    #[error("line {}: Region formula needs an even, non-zero number of integers, found {}", line, found)]
    OddFormula { line: usize, found: usize },
    #[error("PWL input contains no region")]
    NoRegions,
    #[error("Parser invoked after a previous error")]
    PreviousError,
}

/// Parser for PWL files.
///
/// The input is consumed line by line using [`parse_line`](PwlParser::parse_line), after the last
/// line call [`finish`](PwlParser::finish).
#[derive(Default)]
pub struct PwlParser {
    dimension: Option<usize>,
    prototypes: Vec<BoundaryPrototype>,
    regions: Vec<Region>,
    open_region: Option<(Vec<Fraction>, Vec<BoundaryConstraint>)>,

    line_number: usize,
    seen_content: bool,
    single_piece: bool,
    error: bool,
}

impl PwlParser {
    /// Create a new PWL parser.
    pub fn new() -> PwlParser {
        PwlParser::default()
    }

    /// Parse the given input into a [`PwlModel`].
    pub fn parse(input: impl io::Read) -> Result<PwlModel, Error> {
        use io::BufRead;

        let mut parser = Self::new();

        for line in io::BufReader::new(input).lines() {
            parser.parse_line(&line?)?;
        }

        let model = parser.finish()?;

        info!(
            "Parsed PWL function of dimension {} with {} regions and {} boundary prototypes",
            model.dimension(),
            model.regions().len(),
            model.prototypes().len()
        );

        Ok(model)
    }

    /// Parse a single line of input.
    ///
    /// If this method returns an error, the parser is in an invalid state and cannot parse further
    /// lines.
    pub fn parse_line(&mut self, line: &str) -> Result<(), ParserError> {
        if self.error {
            return Err(ParserError::PreviousError);
        }
        self.line_number += 1;

        let result = self.parse_line_inner(line.trim_end());
        if result.is_err() {
            self.error = true;
        }
        result
    }

    fn parse_line_inner(&mut self, line: &str) -> Result<(), ParserError> {
        if line.is_empty() || line.starts_with('c') {
            return Ok(());
        }

        if line == "pwl" && !self.seen_content {
            self.seen_content = true;
            return Ok(());
        }

        if self.single_piece {
            return Err(self.unexpected(line));
        }

        if line.starts_with("tl ") && !self.seen_content {
            self.seen_content = true;
            self.single_piece = true;
            let formula = self.parse_formula(&line[3..])?;
            self.regions.push(Region::new(formula, vec![]));
            return Ok(());
        }

        self.seen_content = true;

        match line.get(..2) {
            Some("b ") => self.parse_prototype(&line[2..]),
            Some("p ") => {
                let formula = self.parse_formula(&line[2..])?;
                self.close_region();
                self.open_region = Some((formula, vec![]));
                Ok(())
            }
            Some("g ") => self.parse_constraint(&line[2..], Direction::GreaterEq),
            Some("l ") => self.parse_constraint(&line[2..], Direction::LessEq),
            _ => Err(self.unexpected(line)),
        }
    }

    /// Finish parsing and return the parsed model.
    pub fn finish(mut self) -> Result<PwlModel, ParserError> {
        if self.error {
            return Err(ParserError::PreviousError);
        }
        self.close_region();

        let dimension = match self.dimension {
            Some(dimension) if !self.regions.is_empty() => dimension,
            _ => return Err(ParserError::NoRegions),
        };

        let mut model = PwlModel::new(dimension);
        for prototype in self.prototypes {
            model.add_prototype(prototype);
        }
        for region in self.regions {
            model.add_region(region);
        }
        Ok(model)
    }

    /// Number of lines parsed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn close_region(&mut self) {
        if let Some((formula, constraints)) = self.open_region.take() {
            self.regions.push(Region::new(formula, constraints));
        }
    }

    fn parse_prototype(&mut self, values: &str) -> Result<(), ParserError> {
        let coefficients = values
            .split_whitespace()
            .map(|token| self.coefficient(token))
            .collect::<Result<Vec<_>, _>>()?;

        if coefficients.is_empty() {
            return Err(self.unexpected(values));
        }

        let dimension = *self.dimension.get_or_insert(coefficients.len() - 1);
        if coefficients.len() != dimension + 1 {
            return Err(ParserError::PrototypeLength {
                line: self.line_number,
                found: coefficients.len(),
                dimension,
            });
        }

        self.prototypes.push(BoundaryPrototype::new(coefficients));
        Ok(())
    }

    fn parse_formula(&mut self, values: &str) -> Result<Vec<Fraction>, ParserError> {
        let integers = values
            .split_whitespace()
            .map(|token| self.number::<i64>(token))
            .collect::<Result<Vec<_>, _>>()?;

        if integers.is_empty() || integers.len() % 2 != 0 {
            return Err(ParserError::OddFormula {
                line: self.line_number,
                found: integers.len(),
            });
        }

        let dimension = *self.dimension.get_or_insert(integers.len() / 2 - 1);
        if integers.len() != 2 * (dimension + 1) {
            return Err(ParserError::FormulaLength {
                line: self.line_number,
                found: integers.len(),
                dimension,
            });
        }

        integers
            .chunks_exact(2)
            .map(|pair| {
                if pair[1] < 1 {
                    Err(ParserError::InvalidDenominator {
                        line: self.line_number,
                        denom: pair[1],
                    })
                } else {
                    Ok(Fraction::new(pair[0], pair[1]))
                }
            })
            .collect()
    }

    fn parse_constraint(&mut self, value: &str, direction: Direction) -> Result<(), ParserError> {
        let line = self.line_number;
        let index = self.number::<usize>(value.trim())?;
        let defined = self.prototypes.len();

        let constraints = match &mut self.open_region {
            Some((_, constraints)) => constraints,
            None => return Err(ParserError::ConstraintBeforeRegion { line }),
        };

        if index == 0 || index > defined {
            return Err(ParserError::InvalidPrototypeIndex {
                line,
                index,
                defined,
            });
        }

        constraints.push(BoundaryConstraint {
            prototype: index - 1,
            direction,
        });
        Ok(())
    }

    fn number<T: std::str::FromStr>(&self, token: &str) -> Result<T, ParserError> {
        token.parse().map_err(|_| ParserError::InvalidNumber {
            line: self.line_number,
            token: token.to_owned(),
        })
    }

    /// Boundary coefficient, `NaN` and infinities are rejected.
    fn coefficient(&self, token: &str) -> Result<f64, ParserError> {
        let value = self.number::<f64>(token)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ParserError::InvalidNumber {
                line: self.line_number,
                token: token.to_owned(),
            })
        }
    }

    fn unexpected(&self, line: &str) -> ParserError {
        ParserError::UnexpectedLine {
            line: self.line_number,
            content: line.to_owned(),
        }
    }
}

/// Write a model in the PWL format.
pub fn write_pwl(target: &mut impl io::Write, model: &PwlModel) -> io::Result<()> {
    writeln!(target, "pwl")?;
    writeln!(target)?;

    for prototype in model.prototypes() {
        write!(target, "b")?;
        for coefficient in prototype.coefficients() {
            write!(target, " {}", coefficient)?;
        }
        writeln!(target)?;
    }

    for region in model.regions() {
        writeln!(target)?;
        write!(target, "p")?;
        for fraction in region.formula() {
            write!(target, " {} {}", fraction.numer, fraction.denom)?;
        }
        writeln!(target)?;
        for constraint in region.constraints() {
            writeln!(
                target,
                "{} {}",
                constraint.direction.tag(),
                constraint.prototype + 1
            )?;
        }
    }

    Ok(())
}
