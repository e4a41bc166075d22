//! Comparing an alternate encoding against oracle values.
use anyhow::Error;
use log::{debug, info, warn};

use crate::alternate::{Alternate, Value};
use crate::config::CheckConfig;
use crate::oracle::Sample;

/// Points match when their values differ by less than `10^-precision`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tolerance {
    precision: usize,
}

impl Tolerance {
    pub fn new(precision: usize) -> Tolerance {
        Tolerance { precision }
    }

    pub fn precision(self) -> usize {
        self.precision
    }

    pub fn epsilon(self) -> f64 {
        10f64.powi(-(self.precision as i32))
    }

    /// Strict comparison, a difference of exactly `10^-precision` does not match.
    pub fn matches(self, oracle: f64, alternate: f64) -> bool {
        (oracle - alternate).abs() < self.epsilon()
    }
}

impl Default for Tolerance {
    fn default() -> Tolerance {
        Tolerance::new(5)
    }
}

/// Classification of a single point.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Match,
    Mismatch,
    /// The alternate could not be evaluated, counted as failed.
    Error(String),
}

impl Outcome {
    pub fn is_match(&self) -> bool {
        *self == Outcome::Match
    }
}

/// Everything known about a single checked point.
#[derive(Clone, Debug, PartialEq)]
pub struct PointResult {
    /// 1-based position in the sample sequence.
    pub index: usize,
    pub point: Vec<f64>,
    pub oracle: f64,
    pub alternate: Option<Value>,
    pub outcome: Outcome,
}

/// Aggregate result of a run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    AllPass,
    AllFail,
    Mixed { passed: usize, failed: usize },
}

impl Verdict {
    pub fn from_counts(passed: usize, failed: usize) -> Verdict {
        if failed == 0 {
            Verdict::AllPass
        } else if passed == 0 {
            Verdict::AllFail
        } else {
            Verdict::Mixed { passed, failed }
        }
    }
}

/// Per point results of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub tolerance: Tolerance,
    pub results: Vec<PointResult>,
}

impl Report {
    pub fn passed(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome.is_match())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_counts(self.passed(), self.failed())
    }
}

/// Compares an alternate encoding with oracle values point by point.
#[derive(Clone, Debug, Default)]
pub struct EquivalenceChecker {
    tolerance: Tolerance,
    keep_going: bool,
}

impl EquivalenceChecker {
    pub fn new(tolerance: Tolerance) -> EquivalenceChecker {
        EquivalenceChecker {
            tolerance,
            keep_going: false,
        }
    }

    pub fn from_config(config: &CheckConfig) -> EquivalenceChecker {
        EquivalenceChecker {
            tolerance: Tolerance::new(config.precision),
            keep_going: config.keep_going,
        }
    }

    /// Record transient alternate failures instead of aborting.
    pub fn keep_going(mut self, keep_going: bool) -> EquivalenceChecker {
        self.keep_going = keep_going;
        self
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Checks a single sample.
    ///
    /// Errors are returned for failures that are not recorded as an [`Outcome::Error`].
    pub fn check_sample<A: Alternate + ?Sized>(
        &self,
        alternate: &A,
        index: usize,
        sample: Sample,
    ) -> Result<PointResult, Error> {
        let (alternate, outcome) = match alternate.evaluate(&sample.point) {
            Ok(value) => {
                let outcome = if self.tolerance.matches(sample.oracle, value.to_f64()) {
                    Outcome::Match
                } else {
                    Outcome::Mismatch
                };
                (Some(value), outcome)
            }
            Err(err) if self.keep_going && err.is_transient() => {
                warn!("point {}: {}", index, err);
                (None, Outcome::Error(err.to_string()))
            }
            Err(err) => return Err(err.into()),
        };

        debug!(
            "point {}: {:?} alternate {:?} oracle {} -> {:?}",
            index, sample.point, alternate, sample.oracle, outcome
        );

        Ok(PointResult {
            index,
            point: sample.point,
            oracle: sample.oracle,
            alternate,
            outcome,
        })
    }

    /// Checks all samples in order.
    pub fn check<A: Alternate + ?Sized>(
        &self,
        alternate: &A,
        samples: impl IntoIterator<Item = Sample>,
    ) -> Result<Report, Error> {
        let mut results = vec![];

        for (index, sample) in samples.into_iter().enumerate() {
            results.push(self.check_sample(alternate, index + 1, sample)?);
        }

        let report = Report {
            tolerance: self.tolerance,
            results,
        };

        info!(
            "Checked {} points of the {} encoding: {} passed, {} failed",
            report.results.len(),
            alternate.name(),
            report.passed(),
            report.failed()
        );

        Ok(report)
    }
}
