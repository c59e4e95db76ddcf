//! Thin wrapper over [`std::process::Command`] used by the VCS and language
//! adapters. Output is always captured; `log_stdout` echoes it line by line
//! for long-running external tools.

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};
use crate::log;

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub status_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

/// Run `program` with `args` in `cwd`, failing on a non-zero exit status.
pub fn run(program: &str, args: &[&str], cwd: &Path) -> Result<ProcessOutput> {
    run_with(program, args, cwd, false, true)
}

/// Run `program`, echoing stdout lines, failing on a non-zero exit status.
pub fn run_logged(program: &str, args: &[&str], cwd: &Path) -> Result<ProcessOutput> {
    run_with(program, args, cwd, true, true)
}

/// Run `program` without treating a non-zero exit status as an error.
pub fn run_unchecked(program: &str, args: &[&str], cwd: &Path) -> Result<ProcessOutput> {
    run_with(program, args, cwd, false, false)
}

fn run_with(
    program: &str,
    args: &[&str],
    cwd: &Path,
    log_stdout: bool,
    check: bool,
) -> Result<ProcessOutput> {
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| Error::Subprocess {
            command: render_command(program, args),
            status: "spawn failure".to_string(),
            stderr: e.to_string(),
        })?;

    let result = ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status_code: output.status.code(),
    };

    if log_stdout {
        for line in result.stdout.lines() {
            log::log(line);
        }
    }

    if check && !result.success() {
        for line in result.stderr.lines() {
            log::error_line(line);
        }
        return Err(Error::Subprocess {
            command: render_command(program, args),
            status: result
                .status_code
                .map(|c| format!("status {c}"))
                .unwrap_or_else(|| "signal".to_string()),
            stderr: tail(&result.stderr),
        });
    }

    Ok(result)
}

fn render_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| a.to_string()));
    parts.join(" ")
}

/// Last few stderr lines, enough to identify the failure in an error message.
fn tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(3);
    let text = lines[start..].join("; ");
    if text.is_empty() {
        String::new()
    } else {
        format!(": {text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cwd() -> PathBuf {
        std::env::temp_dir()
    }

    #[test]
    fn test_run_captures_stdout() {
        let out = run("echo", &["hello"], &cwd()).unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.success());
    }

    #[test]
    fn test_run_fails_on_nonzero_status() {
        let err = run("false", &[], &cwd()).unwrap_err();
        match err {
            Error::Subprocess { command, .. } => assert_eq!(command, "false"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_run_unchecked_tolerates_failure() {
        let out = run_unchecked("false", &[], &cwd()).unwrap();
        assert!(!out.success());
    }

    #[test]
    fn test_missing_program_is_reported() {
        let err = run("definitely-not-a-real-program", &[], &cwd()).unwrap_err();
        match err {
            Error::Subprocess { status, .. } => assert_eq!(status, "spawn failure"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
