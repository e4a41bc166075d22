//! Reference values the alternate encodings are compared against.
use std::io;

use anyhow::Error;
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;

/// Evaluates the reference function at arbitrary points.
pub trait Oracle {
    /// Number of inputs.
    fn dimension(&self) -> usize;

    fn evaluate(&self, point: &[f64]) -> Result<f64, Error>;
}

/// A query point together with the oracle's value at that point.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub point: Vec<f64>,
    pub oracle: f64,
}

/// Evaluates the oracle at each of the given points.
pub fn sample(oracle: &dyn Oracle, points: Vec<Vec<f64>>) -> Result<Vec<Sample>, Error> {
    points
        .into_iter()
        .map(|point| {
            let oracle = oracle.evaluate(&point)?;
            Ok(Sample { point, oracle })
        })
        .collect()
}

/// Uniformly distributed points in `[0, 1)^dimension`.
///
/// The same seed always produces the same points.
pub fn random_points(dimension: usize, count: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let mut point = Vec::with_capacity(dimension);
        for _ in 0..dimension {
            point.push(rng.gen::<f64>());
        }
        points.push(point);
    }
    points
}

/// Possible errors while parsing a sample table.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("line {}: Invalid number: '{}'", line, token)]
    InvalidNumber { line: usize, token: String },
    #[error("line {}: A sample needs at least one coordinate and a value", line)]
    TooShort { line: usize },
    #[error("line {}: Sample has {} coordinates, expected {}", line, found, dimension)]
    DimensionMismatch {
        line: usize,
        found: usize,
        dimension: usize,
    },
    #[error("Sample table contains no samples")]
    Empty,
}

/// Precomputed oracle values, one sample per line.
///
/// Each line lists the coordinates of a point followed by the expected value. Empty lines and
/// lines starting with `#` are ignored:
///
/// ```text
/// # x1 x2 y
/// 0.25 0.5 0.75
/// 0.0 1.0 0.5
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SampleTable {
    dimension: usize,
    samples: Vec<Sample>,
}

impl SampleTable {
    pub fn parse(input: impl io::Read) -> Result<SampleTable, Error> {
        use io::BufRead;

        let mut dimension = None;
        let mut samples = vec![];

        for (index, line) in io::BufReader::new(input).lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut values = line
                .split_whitespace()
                .map(|token| {
                    token
                        .parse::<f64>()
                        .ok()
                        .filter(|value| value.is_finite())
                        .ok_or_else(|| SampleError::InvalidNumber {
                            line: line_number,
                            token: token.to_owned(),
                        })
                })
                .collect::<Result<Vec<f64>, _>>()?;

            let oracle = match values.pop() {
                Some(oracle) if !values.is_empty() => oracle,
                _ => return Err(SampleError::TooShort { line: line_number }.into()),
            };

            let expected = *dimension.get_or_insert(values.len());
            if values.len() != expected {
                return Err(SampleError::DimensionMismatch {
                    line: line_number,
                    found: values.len(),
                    dimension: expected,
                }
                .into());
            }

            samples.push(Sample {
                point: values,
                oracle,
            });
        }

        let dimension = dimension.ok_or(SampleError::Empty)?;

        info!(
            "Parsed {} samples of dimension {}",
            samples.len(),
            dimension
        );

        Ok(SampleTable { dimension, samples })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}
