use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubmuxError};

/// Exit classification and captured diagnostics from one external command.
///
/// A non-zero exit is data, not an error: the caller decides whether it is
/// fatal, usually via [`RunOutcome::check`].
#[derive(Debug)]
pub struct RunOutcome {
    /// Rendered command line, for diagnostics.
    pub command: String,
    /// Process exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Captured stderr text.
    pub stderr: String,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Convert a non-zero exit into the error surfaced to the user.
    pub fn check(self) -> Result<()> {
        if self.success() {
            Ok(())
        } else {
            Err(SubmuxError::ExternalTool {
                command: self.command,
                code: self.code,
                stderr: self.stderr,
            })
        }
    }
}

/// Run an external command, feeding every output line (stdout and stderr,
/// as they arrive) to `on_line`, and wait for it to terminate.
///
/// Stderr lines are additionally captured for the outcome's diagnostics.
pub async fn run<F>(program: &str, args: &[String], mut on_line: F) -> Result<RunOutcome>
where
    F: FnMut(&str),
{
    let command = render_command(program, args);
    debug!("Running: {}", command);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SubmuxError::ExternalTool {
            command: command.clone(),
            code: None,
            stderr: format!("failed to start process: {e}"),
        })?;

    let mut captured = String::new();

    if let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) {
        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut out_done = false;
        let mut err_done = false;

        while !out_done || !err_done {
            tokio::select! {
                line = out_lines.next_line(), if !out_done => match line {
                    Ok(Some(line)) => on_line(&line),
                    _ => out_done = true,
                },
                line = err_lines.next_line(), if !err_done => match line {
                    Ok(Some(line)) => {
                        on_line(&line);
                        captured.push_str(&line);
                        captured.push('\n');
                    }
                    _ => err_done = true,
                },
            }
        }
    }

    let status = child.wait().await?;
    debug!("Finished: {} ({})", command, status);

    Ok(RunOutcome {
        command,
        code: status.code(),
        stderr: captured,
    })
}

fn render_command(program: &str, args: &[String]) -> String {
    let mut rendered = String::from(program);
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}
