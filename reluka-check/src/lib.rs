//! Equivalence checking of alternate encodings of a ReLU network.
//!
//! An [`Oracle`] provides reference values, usually by evaluating the network itself. An
//! [`Alternate`] is one of the encodings produced from that network, either a region based PWL
//! model or a LIMODSAT circuit evaluated through an SMT solver. The [`EquivalenceChecker`]
//! compares both at a sequence of points and collects the results in a [`Report`].
pub mod alternate;
pub mod checker;
pub mod config;
pub mod network;
pub mod oracle;
pub mod report;
pub mod solver;

pub use alternate::{Alternate, AlternateError, PwlAlternate, SmtAlternate, Value};
pub use checker::{EquivalenceChecker, Outcome, PointResult, Report, Tolerance, Verdict};
pub use config::{CheckConfig, CheckConfigUpdate, ConfigError};
pub use network::{DenseNetwork, Layer, NetworkError};
pub use oracle::{random_points, sample, Oracle, Sample, SampleError, SampleTable};
pub use report::{verdict_message, write_report};
pub use solver::{ProcessSolver, SmtSolver, SolverError};
