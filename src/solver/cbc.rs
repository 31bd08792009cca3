// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! The external CBC backend.
//!
//! The program is written to a temporary directory in LP format, with
//! variables named `x0`, `x1`, ...  CBC runs as a subprocess that is polled
//! until it exits, and killed when the time limit passes or the solve is
//! cancelled.  The temporary directory is removed when the solve returns,
//! unless `keep_files` is set.

use std::fs;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::lp::{LinearProgram, LpWriter};
use crate::{Error, SolverConfig};

use super::{BackendOutcome, SolverDriver, SolverStatus, TerminationCondition};

/// Environment variable that overrides the path of the CBC executable.
const CBC_PATH_VAR: &str = "SOLPH_CBC_PATH";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub(crate) struct CbcDriver {
    executable: PathBuf,
}

impl CbcDriver {
    pub(crate) fn from_env() -> Self {
        let executable = std::env::var_os(CBC_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("cbc"));
        Self { executable }
    }
}

impl SolverDriver for CbcDriver {
    fn name(&self) -> &'static str {
        "cbc"
    }

    fn solve(&self, lp: &LinearProgram, config: &SolverConfig) -> Result<BackendOutcome, Error> {
        let dir = solver_dir(config.keep_files)?;
        let problem_file = dir.path().join("problem.lp");
        let solution_file = dir.path().join("solution.txt");
        let log_file = dir.path().join("cbc.log");

        fs::write(&problem_file, LpWriter::new(lp, false).to_string())?;

        let mut command = Command::new(&self.executable);
        command.arg(&problem_file);
        if let Some(limit) = config.time_limit {
            command.arg("-sec").arg(limit.as_secs().max(1).to_string());
        }
        if let Some(gap) = config.mip_gap {
            command.arg("-ratioGap").arg(gap.to_string());
        }
        command
            .arg("-solve")
            .arg("-solu")
            .arg(&solution_file)
            .stdin(Stdio::null())
            .stdout(fs::File::create(&log_file)?)
            .stderr(Stdio::null());

        tracing::debug!("Running {command:?}");
        let child = command.spawn().map_err(|e| {
            Error::solver(format!(
                "Can't start {}: {e}. Set {CBC_PATH_VAR} to the CBC executable.",
                self.executable.display()
            ))
        })?;

        if let Some(interrupted) = wait(child, config)? {
            return Ok(BackendOutcome::aborted(interrupted));
        }

        let solution = fs::read_to_string(&solution_file).map_err(|e| {
            Error::solver(format!(
                "CBC didn't write a solution, see {}: {e}",
                log_file.display()
            ))
        })?;
        parse_solution(&solution, lp.variables().len())
    }
}

/// Waits for `child` to exit.  Kills it and returns the reason when the time
/// limit passes or the solve is cancelled.
fn wait(mut child: Child, config: &SolverConfig) -> Result<Option<TerminationCondition>, Error> {
    let start = Instant::now();
    // CBC stops by itself at the time limit; the margin covers its shutdown.
    let deadline = config.time_limit.map(|limit| limit + Duration::from_secs(5));

    loop {
        if let Some(status) = child.try_wait()? {
            tracing::debug!("CBC exited with {status}.");
            return Ok(None);
        }

        let interrupted = if config.is_cancelled() {
            Some(TerminationCondition::Other("cancelled".to_string()))
        } else if deadline.is_some_and(|deadline| start.elapsed() > deadline) {
            Some(TerminationCondition::TimeLimit)
        } else {
            None
        };
        if let Some(reason) = interrupted {
            tracing::warn!("Killing CBC: {reason}.");
            child.kill()?;
            child.wait()?;
            return Ok(Some(reason));
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Parses a CBC solution file.
///
/// The first line holds the status, e.g. `Optimal - objective value 12.5`.
/// Every other line is `index name value reduced_cost`, optionally prefixed
/// with `**` for values that violate a bound.  Variables that aren't listed
/// are zero.
fn parse_solution(solution: &str, variables: usize) -> Result<BackendOutcome, Error> {
    let mut lines = solution.lines();
    let header = lines
        .next()
        .ok_or_else(|| Error::solver("The CBC solution file is empty."))?;

    let (status, termination) = parse_status(header);
    let mut values = vec![0.0; variables];
    for line in lines {
        let mut fields = line.split_whitespace().skip_while(|f| *f == "**");
        let (Some(_), Some(name), Some(value)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let Some(index) = name.strip_prefix('x').and_then(|i| i.parse::<usize>().ok()) else {
            continue;
        };
        let value = value.parse::<f64>().map_err(|_| {
            Error::solver(format!("Can't parse the value of {name} in line: {line}"))
        })?;
        if let Some(slot) = values.get_mut(index) {
            *slot = value;
        }
    }

    let has_point = !matches!(
        termination,
        TerminationCondition::Infeasible | TerminationCondition::Unbounded
    );
    Ok(BackendOutcome {
        status,
        termination,
        values: has_point.then_some(values),
    })
}

fn parse_status(header: &str) -> (SolverStatus, TerminationCondition) {
    let header = header.trim();
    if header.starts_with("Optimal") {
        (SolverStatus::Ok, TerminationCondition::Optimal)
    } else if header.starts_with("Infeasible") || header.contains("infeasible") {
        (SolverStatus::Warning, TerminationCondition::Infeasible)
    } else if header.starts_with("Unbounded") || header.contains("unbounded") {
        (SolverStatus::Warning, TerminationCondition::Unbounded)
    } else if header.starts_with("Stopped on time") {
        (SolverStatus::Aborted, TerminationCondition::TimeLimit)
    } else if header.contains("difficulties") {
        (SolverStatus::Error, TerminationCondition::Numerical)
    } else {
        (
            SolverStatus::Warning,
            TerminationCondition::Other(header.to_string()),
        )
    }
}

/// A temporary directory for the solver files, removed on drop unless
/// `keep` is set.
fn solver_dir(keep: bool) -> Result<TempDir, Error> {
    let dir = tempfile::Builder::new()
        .prefix("solph-")
        .keep(keep)
        .tempdir()?;
    if keep {
        tracing::info!("Keeping solver files in {}.", dir.path().display());
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SolverBackend;

    #[test]
    fn test_parse_solution() -> Result<(), Error> {
        let solution = "Optimal - objective value 12.50000000\n\
                        \x20     0 x0                   2.5                       0\n\
                        \x20     2 x2                     1                       1\n\
                        \x20     3 ONE_VAR_CONSTANT       1                       0\n";
        let outcome = parse_solution(solution, 3)?;
        assert_eq!(outcome.status, SolverStatus::Ok);
        assert_eq!(outcome.termination, TerminationCondition::Optimal);
        assert_eq!(outcome.values, Some(vec![2.5, 0.0, 1.0]));
        Ok(())
    }

    #[test]
    fn test_parse_infeasible() -> Result<(), Error> {
        let solution = "Infeasible - objective value 3.00000000\n\
                        **   0 x0                   4.5                       0\n";
        let outcome = parse_solution(solution, 1)?;
        assert_eq!(outcome.termination, TerminationCondition::Infeasible);
        assert!(outcome.values.is_none());

        let outcome = parse_solution("Stopped on time - objective value 7\n", 1)?;
        assert_eq!(outcome.status, SolverStatus::Aborted);
        assert_eq!(outcome.termination, TerminationCondition::TimeLimit);
        assert_eq!(outcome.values, Some(vec![0.0]));

        assert!(parse_solution("", 1)
            .is_err_and(|e| e == Error::solver("The CBC solution file is empty.")));
        Ok(())
    }

    #[test]
    fn test_solver_dir() -> Result<(), Error> {
        let path = {
            let dir = solver_dir(false)?;
            fs::write(dir.path().join("problem.lp"), "end")?;
            dir.path().to_path_buf()
        };
        assert!(!path.exists());

        let path = solver_dir(true)?.path().to_path_buf();
        assert!(path.exists());
        assert!(path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with("solph-")));
        fs::remove_dir_all(&path)?;
        Ok(())
    }

    #[test]
    fn test_missing_executable() -> Result<(), Error> {
        let driver = CbcDriver {
            executable: PathBuf::from("/nonexistent/cbc"),
        };
        let config = SolverConfig {
            backend: SolverBackend::Cbc,
            ..Default::default()
        };
        let result = driver.solve(&LinearProgram::new(), &config);
        assert!(result.is_err_and(|e| e.kind() == crate::ErrorKind::SolverError));
        Ok(())
    }
}
