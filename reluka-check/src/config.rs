//! Checker configuration.
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Largest number of compared digits that still fits into an `f64`.
pub const MAX_PRECISION: usize = 15;

/// Largest number of decimals used for query points in SMT scripts.
pub const MAX_SCRIPT_DIGITS: usize = 20;

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("precision must be at most {}, found {}", MAX_PRECISION, precision)]
    PrecisionOutOfRange { precision: usize },
    #[error("script_digits must be at most {}, found {}", MAX_SCRIPT_DIGITS, digits)]
    ScriptDigitsOutOfRange { digits: usize },
    #[error("solver_timeout_ms must be positive")]
    ZeroTimeout,
    #[error("solver_command must not be empty")]
    EmptySolverCommand,
}

/// Configurable parameters of an equivalence check.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckConfig {
    /// Number of decimal digits that must agree, points match when they differ by less than
    /// `10^-precision`. (Default: 5)
    pub precision: usize,

    /// Number of random query points evaluated per file. (Default: 500)
    pub samples: usize,

    /// Number of decimals of the query point coordinates written into SMT scripts. (Default: 10)
    pub script_digits: usize,

    /// Seed used to generate the query points. (Default: 0)
    pub seed: u64,

    /// Record solver failures as errors and continue with the next point. (Default: false)
    pub keep_going: bool,

    /// Executable of the SMT solver. (Default: "z3")
    pub solver_command: String,

    /// Arguments passed to the solver, which reads the script from stdin. (Default: ["-in"])
    pub solver_args: Vec<String>,

    /// Time limit for a single solver call in milliseconds. (Default: 10000)
    pub solver_timeout_ms: u64,
}

impl Default for CheckConfig {
    fn default() -> CheckConfig {
        CheckConfig {
            precision: 5,
            samples: 500,
            script_digits: 10,
            seed: 0,
            keep_going: false,
            solver_command: "z3".to_owned(),
            solver_args: vec!["-in".to_owned()],
            solver_timeout_ms: 10000,
        }
    }
}

const OPTIONS: &[(&str, &str)] = &[
    (
        "precision",
        "Number of decimal digits that must agree, points match when they differ by less than \
         10^-precision. (Default: 5)",
    ),
    (
        "samples",
        "Number of random query points evaluated per file. (Default: 500)",
    ),
    (
        "script_digits",
        "Number of decimals of the query point coordinates written into SMT scripts. \
         (Default: 10)",
    ),
    ("seed", "Seed used to generate the query points. (Default: 0)"),
    (
        "keep_going",
        "Record solver failures as errors and continue with the next point. (Default: false)",
    ),
    ("solver_command", "Executable of the SMT solver. (Default: \"z3\")"),
    (
        "solver_args",
        "Arguments passed to the solver, which reads the script from stdin. (Default: [\"-in\"])",
    ),
    (
        "solver_timeout_ms",
        "Time limit for a single solver call in milliseconds. (Default: 10000)",
    ),
];

impl CheckConfig {
    /// Description of all options, as printed for `-C help`.
    pub fn help() -> String {
        let mut help = String::new();
        for (name, description) in OPTIONS.iter() {
            help.push_str(&format!("{}:\n    {}\n", name, description));
        }
        help
    }

    /// Time limit for a single solver call.
    pub fn solver_timeout(&self) -> Duration {
        Duration::from_millis(self.solver_timeout_ms)
    }
}

/// A partial configuration, as read from a config file or a `-C` option.
#[derive(Clone, Default, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CheckConfigUpdate {
    pub precision: Option<usize>,
    pub samples: Option<usize>,
    pub script_digits: Option<usize>,
    pub seed: Option<u64>,
    pub keep_going: Option<bool>,
    pub solver_command: Option<String>,
    pub solver_args: Option<Vec<String>>,
    pub solver_timeout_ms: Option<u64>,
}

impl CheckConfigUpdate {
    pub fn new() -> CheckConfigUpdate {
        CheckConfigUpdate::default()
    }

    /// Overwrites every value that is set in `other`.
    pub fn merge(&mut self, other: CheckConfigUpdate) {
        if other.precision.is_some() {
            self.precision = other.precision;
        }
        if other.samples.is_some() {
            self.samples = other.samples;
        }
        if other.script_digits.is_some() {
            self.script_digits = other.script_digits;
        }
        if other.seed.is_some() {
            self.seed = other.seed;
        }
        if other.keep_going.is_some() {
            self.keep_going = other.keep_going;
        }
        if other.solver_command.is_some() {
            self.solver_command = other.solver_command;
        }
        if other.solver_args.is_some() {
            self.solver_args = other.solver_args;
        }
        if other.solver_timeout_ms.is_some() {
            self.solver_timeout_ms = other.solver_timeout_ms;
        }
    }

    /// Applies the update, leaving `config` unchanged if a value is invalid.
    pub fn apply(&self, config: &mut CheckConfig) -> Result<(), ConfigError> {
        let mut updated = config.clone();

        if let Some(precision) = self.precision {
            updated.precision = precision;
        }
        if let Some(samples) = self.samples {
            updated.samples = samples;
        }
        if let Some(script_digits) = self.script_digits {
            updated.script_digits = script_digits;
        }
        if let Some(seed) = self.seed {
            updated.seed = seed;
        }
        if let Some(keep_going) = self.keep_going {
            updated.keep_going = keep_going;
        }
        if let Some(solver_command) = &self.solver_command {
            updated.solver_command = solver_command.clone();
        }
        if let Some(solver_args) = &self.solver_args {
            updated.solver_args = solver_args.clone();
        }
        if let Some(solver_timeout_ms) = self.solver_timeout_ms {
            updated.solver_timeout_ms = solver_timeout_ms;
        }

        if updated.precision > MAX_PRECISION {
            return Err(ConfigError::PrecisionOutOfRange {
                precision: updated.precision,
            });
        }
        if updated.script_digits > MAX_SCRIPT_DIGITS {
            return Err(ConfigError::ScriptDigitsOutOfRange {
                digits: updated.script_digits,
            });
        }
        if updated.solver_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if updated.solver_command.is_empty() {
            return Err(ConfigError::EmptySolverCommand);
        }

        *config = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::Error;

    #[test]
    fn later_updates_win() -> Result<(), Error> {
        let mut update = CheckConfigUpdate::new();
        update.merge(toml::from_str("precision = 3\nseed = 7\n")?);
        update.merge(toml::from_str("precision=4")?);
        update.merge(toml::from_str("solver_args = [\"-smt2\", \"-in\"]")?);

        let mut config = CheckConfig::default();
        update.apply(&mut config)?;

        assert_eq!(config.precision, 4);
        assert_eq!(config.seed, 7);
        assert_eq!(config.samples, 500);
        assert_eq!(config.solver_args, vec!["-smt2", "-in"]);
        Ok(())
    }

    #[test]
    fn unknown_options_are_rejected() {
        assert!(toml::from_str::<CheckConfigUpdate>("precison = 3").is_err());
        assert!(toml::from_str::<CheckConfigUpdate>("precision = \"3\"").is_err());
    }

    #[test]
    fn invalid_values_leave_config_unchanged() {
        let mut config = CheckConfig::default();

        let update = CheckConfigUpdate {
            precision: Some(2),
            solver_timeout_ms: Some(0),
            ..CheckConfigUpdate::default()
        };
        match update.apply(&mut config) {
            Err(ConfigError::ZeroTimeout) => (),
            other => panic!("Unexpected result {:?}", other),
        }
        assert_eq!(config, CheckConfig::default());

        let update = CheckConfigUpdate {
            precision: Some(16),
            ..CheckConfigUpdate::default()
        };
        match update.apply(&mut config) {
            Err(ConfigError::PrecisionOutOfRange { precision: 16 }) => (),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn help_lists_every_option() {
        let help = CheckConfig::help();
        for name in [
            "precision",
            "samples",
            "script_digits",
            "seed",
            "keep_going",
            "solver_command",
            "solver_args",
            "solver_timeout_ms",
        ]
        .iter()
        {
            assert!(help.contains(&format!("{}:\n", name)), "missing {}", name);
        }
    }
}
