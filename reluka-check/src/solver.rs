//! Running an external SMT solver.
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::string::FromUtf8Error;
use std::thread;
use std::time::Duration;

use log::debug;
use thiserror::Error;
use wait_timeout::ChildExt;

use crate::config::CheckConfig;

/// Failures of a single solver call.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Could not start solver '{}': {}", command, source)]
    Spawn { command: String, source: io::Error },
    #[error("Communication with the solver failed: {0}")]
    Io(#[from] io::Error),
    #[error("Solver did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Solver output is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),
}

/// Something that answers SMT-LIB2 scripts.
pub trait SmtSolver {
    /// Runs a complete script and returns everything the solver printed.
    fn solve(&self, script: &str) -> Result<String, SolverError>;
}

/// A solver executable reading the script from stdin.
///
/// Every call starts a fresh process, which is killed when it exceeds the timeout.
#[derive(Clone, Debug)]
pub struct ProcessSolver {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessSolver {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> ProcessSolver {
        ProcessSolver {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &CheckConfig) -> ProcessSolver {
        ProcessSolver::new(
            config.solver_command.clone(),
            config.solver_args.clone(),
            config.solver_timeout(),
        )
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl SmtSolver for ProcessSolver {
    fn solve(&self, script: &str) -> Result<String, SolverError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SolverError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // Both pipes are serviced on their own threads while waiting, a full pipe must not stall
        // the timeout.
        let stdin = child.stdin.take();
        let script = script.to_owned();
        let writer = thread::spawn(move || -> io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(script.as_bytes())?;
            }
            // Dropping stdin signals the end of the script.
            Ok(())
        });

        let stdout = child.stdout.take();
        let reader = thread::spawn(move || -> io::Result<Vec<u8>> {
            let mut output = vec![];
            if let Some(mut stdout) = stdout {
                stdout.read_to_end(&mut output)?;
            }
            Ok(output)
        });

        let waited = child.wait_timeout(self.timeout);

        let status = match waited {
            Ok(Some(status)) => status,
            Ok(None) => {
                // The pipe threads are left behind, they finish once the pipes close.
                let _ = child.kill();
                let _ = child.wait();
                return Err(SolverError::Timeout(self.timeout));
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err.into());
            }
        };

        match join(writer)? {
            // The solver may exit without consuming the whole script.
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => (),
            written => written?,
        }
        let output = join(reader)??;

        debug!("Solver exited with {}", status);

        Ok(String::from_utf8(output)?)
    }
}

fn join<T>(handle: thread::JoinHandle<T>) -> io::Result<T> {
    handle
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "solver pipe thread panicked"))
}
