//! External build tool invocation
//!
//! Runs one build command as a child process with the staging directory as
//! working directory. Output is captured line by line and mirrored to the
//! log; success is determined solely by exit code 0, stdout/stderr are
//! advisory and only used for artifact-identifier extraction.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::BuildToolError;

/// Lines kept from the end of the combined output on failure
const OUTPUT_TAIL_LINES: usize = 40;

/// One external build command: discrete argv, never an interpolated shell
/// string
#[derive(Debug, Clone)]
pub struct BuildCommand {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
}

impl BuildCommand {
    /// Command running `program` with `cwd` as working directory
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// Add a single argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The program name
    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Captured output of a finished build command
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl BuildOutput {
    /// Stdout and stderr concatenated, stdout first
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Run a build command to completion, capturing combined output.
///
/// Lines are mirrored to the log as they arrive: info level when verbose,
/// debug otherwise. A non-zero exit is a fatal [`BuildToolError`] carrying
/// the exit code and the output tail; the caller's staging tree is left
/// untouched for inspection.
pub async fn run_build(command: &BuildCommand, verbose: bool) -> Result<BuildOutput, BuildToolError> {
    let tool = command.program.clone();

    which::which(&tool).map_err(|_| BuildToolError::ToolNotFound { tool: tool.clone() })?;

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(&command.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| BuildToolError::Spawn {
            tool: tool.clone(),
            error: e.to_string(),
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let out_task = drain_lines(stdout, verbose);
    let err_task = drain_lines(stderr, verbose);
    let (stdout, stderr) = tokio::join!(out_task, err_task);

    // exit status and fully drained output are both required before
    // advancing the lifecycle
    let status = child.wait().await.map_err(|e| BuildToolError::Spawn {
        tool: tool.clone(),
        error: e.to_string(),
    })?;

    let output = BuildOutput { stdout, stderr };

    if !status.success() {
        let combined = output.combined();
        let lines: Vec<&str> = combined.lines().collect();
        let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
        return Err(BuildToolError::Failed {
            tool,
            code: status.code().unwrap_or(-1),
            output_tail: lines[start..].join("\n"),
        });
    }

    Ok(output)
}

async fn drain_lines<R>(reader: Option<R>, verbose: bool) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return String::new();
    };
    let mut lines = BufReader::new(reader).lines();
    let mut captured = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        if verbose {
            info!("{line}");
        } else {
            debug!("{line}");
        }
        captured.push_str(&line);
        captured.push('\n');
    }
    captured
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command_captures_stdout() {
        let cmd = BuildCommand::new("echo", "/tmp").arg("hello");
        let output = run_build(&cmd, false).await.unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_code_and_tail() {
        let cmd = BuildCommand::new("sh", "/tmp").arg("-c").arg("echo oops >&2; exit 3");
        let err = run_build(&cmd, false).await.unwrap_err();
        match err {
            BuildToolError::Failed {
                code, output_tail, ..
            } => {
                assert_eq!(code, 3);
                assert!(output_tail.contains("oops"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_tool_detected_before_spawn() {
        let cmd = BuildCommand::new("definitely-not-a-real-tool-12345", "/tmp");
        assert!(matches!(
            run_build(&cmd, false).await,
            Err(BuildToolError::ToolNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = BuildCommand::new("pwd", dir.path());
        let output = run_build(&cmd, false).await.unwrap();
        assert!(output.stdout.trim().ends_with(
            dir.path().file_name().unwrap().to_str().unwrap()
        ));
    }
}
