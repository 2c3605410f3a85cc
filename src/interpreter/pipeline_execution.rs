//! Pipeline Execution
//!
//! Handles execution of command pipelines (cmd1 | cmd2 | cmd3).

use std::collections::HashMap;
use crate::ast::types::CommandNode;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::ExecResult;

/// Result of executing a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Exit codes of all commands in the pipeline (for PIPESTATUS)
    pub pipestatus: Vec<i32>,
}

impl PipelineResult {
    /// Create a new pipeline result.
    pub fn new(stdout: String, stderr: String, exit_code: i32) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            pipestatus: vec![exit_code],
        }
    }

    /// Create from an ExecResult.
    pub fn from_exec_result(result: &ExecResult) -> Self {
        Self {
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
            exit_code: result.exit_code,
            pipestatus: vec![result.exit_code],
        }
    }

    /// Convert to an ExecResult.
    pub fn to_exec_result(&self) -> ExecResult {
        ExecResult {
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            exit_code: self.exit_code,
            env: None,
        }
    }

    /// Apply negation (! prefix).
    pub fn negate(&mut self) {
        self.exit_code = if self.exit_code == 0 { 1 } else { 0 };
    }
}

/// Pipeline execution state.
#[derive(Debug)]
pub struct PipelineState {
    /// Current stdin for the next command
    pub stdin: String,
    /// Last result from a command
    pub last_result: ExecResult,
    /// Exit codes of all commands (for PIPESTATUS)
    pub pipestatus: Vec<i32>,
    /// Rightmost failing exit code (for pipefail)
    pub pipefail_exit_code: i32,
    /// Saved last argument ($_ before pipeline)
    pub saved_last_arg: Option<String>,
    /// Saved environment (for subshell commands)
    pub saved_env: Option<HashMap<String, String>>,
}

impl PipelineState {
    /// Create a new pipeline state.
    pub fn new() -> Self {
        Self {
            stdin: String::new(),
            last_result: ExecResult::ok(),
            pipestatus: Vec::new(),
            pipefail_exit_code: 0,
            saved_last_arg: None,
            saved_env: None,
        }
    }

    /// Record a command result.
    pub fn record_result(&mut self, result: &ExecResult, is_last: bool, pipe_stderr: bool) {
        self.pipestatus.push(result.exit_code);

        if result.exit_code != 0 {
            self.pipefail_exit_code = result.exit_code;
        }

        if !is_last {
            if pipe_stderr {
                // |& pipes both stdout and stderr to next command's stdin
                self.stdin = format!("{}{}", result.stderr, result.stdout);
                self.last_result = ExecResult {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: result.exit_code,
                    env: None,
                };
            } else {
                // Regular | only pipes stdout
                self.stdin = result.stdout.clone();
                self.last_result = ExecResult {
                    stdout: String::new(),
                    stderr: result.stderr.clone(),
                    exit_code: result.exit_code,
                    env: None,
                };
            }
        } else {
            self.last_result = result.clone();
        }
    }

    /// Get the final exit code, considering pipefail option.
    pub fn final_exit_code(&self, pipefail: bool) -> i32 {
        if pipefail && self.pipefail_exit_code != 0 {
            self.pipefail_exit_code
        } else {
            self.last_result.exit_code
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Set PIPESTATUS array in the environment.
pub fn set_pipestatus(env: &mut HashMap<String, String>, pipestatus: &[i32]) {
    // Clear any previous PIPESTATUS entries
    let keys_to_remove: Vec<String> = env
        .keys()
        .filter(|k| k.starts_with("PIPESTATUS_"))
        .cloned()
        .collect();
    for key in keys_to_remove {
        env.remove(&key);
    }

    // Set new PIPESTATUS entries
    for (i, &code) in pipestatus.iter().enumerate() {
        env.insert(format!("PIPESTATUS_{}", i), code.to_string());
    }
    env.insert("PIPESTATUS__length".to_string(), pipestatus.len().to_string());
}

/// Get PIPESTATUS array from the environment.
pub fn get_pipestatus(env: &HashMap<String, String>) -> Vec<i32> {
    let length = env
        .get("PIPESTATUS__length")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(0);

    let mut result = Vec::with_capacity(length);
    for i in 0..length {
        let code = env
            .get(&format!("PIPESTATUS_{}", i))
            .and_then(|s| s.parse::<i32>().ok())
            .unwrap_or(0);
        result.push(code);
    }
    result
}

/// Options controlling how a pipeline is executed.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// set -o pipefail: exit status is the rightmost non-zero stage, not just the last
    pub pipefail: bool,
    /// shopt -s lastpipe: run the last stage in the current shell instead of a subshell
    pub lastpipe: bool,
    /// Whether the pipeline itself already runs inside a subshell
    pub runs_in_subshell: bool,
    /// Prefix the result with `time` output
    pub time_pipeline: bool,
    /// Use POSIX `-p` formatting for `time`
    pub time_posix_format: bool,
}

/// Absorb a control-flow error raised by a pipeline stage that runs in its own
/// subshell: the error terminates that stage only, surfacing as its exit status.
/// `ExecutionLimit` always propagates since it is a hard safety cutoff.
fn absorb_stage_error(error: InterpreterError) -> Result<ExecResult, InterpreterError> {
    match error {
        InterpreterError::ExecutionLimit(e) => Err(InterpreterError::ExecutionLimit(e)),
        InterpreterError::Exit(e) => Ok(ExecResult::new(e.stdout.clone(), e.stderr.clone(), e.exit_code)),
        InterpreterError::Return(e) => Ok(ExecResult::new(e.stdout.clone(), e.stderr.clone(), e.exit_code)),
        InterpreterError::Break(e) => Ok(ExecResult::new(e.stdout.clone(), e.stderr.clone(), 0)),
        InterpreterError::Continue(e) => Ok(ExecResult::new(e.stdout.clone(), e.stderr.clone(), 0)),
        InterpreterError::Errexit(e) => Ok(ExecResult::new(e.stdout.clone(), e.stderr.clone(), e.exit_code)),
        other => {
            let message = other.to_string();
            Ok(ExecResult::new(String::new(), format!("{}\n", message), 1))
        }
    }
}

/// Execute a pipeline of commands, feeding each stage's stdout into the next
/// stage's stdin. Per POSIX/bash semantics, every stage except the last runs
/// in its own subshell; the last stage only joins the current shell when
/// `lastpipe` is set (and the pipeline isn't already backgrounded).
pub fn execute_pipeline<F>(
    pipe_state: &mut PipelineState,
    commands: &[CommandNode],
    pipe_stderr: &[bool],
    options: &PipelineOptions,
    mut exec_command: F,
) -> Result<PipelineResult, InterpreterError>
where
    F: FnMut(&CommandNode, &str) -> Result<ExecResult, InterpreterError>,
{
    let start = std::time::Instant::now();
    let last_index = commands.len().saturating_sub(1);

    for (i, cmd) in commands.iter().enumerate() {
        let is_last = i == last_index;
        let stdin = pipe_state.stdin.clone();

        let runs_in_current_shell = is_last && (options.lastpipe || options.runs_in_subshell);

        let result = match exec_command(cmd, &stdin) {
            Ok(r) => r,
            Err(e) if runs_in_current_shell => return Err(e),
            Err(e) => absorb_stage_error(e)?,
        };

        let pipe_stderr_flag = pipe_stderr.get(i).copied().unwrap_or(false);
        pipe_state.record_result(&result, !is_last, pipe_stderr_flag);
    }

    let exit_code = pipe_state.final_exit_code(options.pipefail);
    let mut pipeline_result = PipelineResult {
        stdout: pipe_state.last_result.stdout.clone(),
        stderr: pipe_state.last_result.stderr.clone(),
        exit_code,
        pipestatus: pipe_state.pipestatus.clone(),
    };

    if options.time_pipeline {
        let elapsed = start.elapsed().as_secs_f64();
        pipeline_result
            .stderr
            .push_str(&format_timing_output(elapsed, options.time_posix_format));
    }

    Ok(pipeline_result)
}

/// Format timing output for timed pipelines.
pub fn format_timing_output(elapsed_seconds: f64, posix_format: bool) -> String {
    if posix_format {
        // POSIX format (-p): decimal format without leading zeros
        format!("real {:.2}\nuser 0.00\nsys 0.00\n", elapsed_seconds)
    } else {
        // Default bash format: real/user/sys with XmY.YYYs
        let minutes = (elapsed_seconds / 60.0).floor() as u32;
        let seconds = elapsed_seconds % 60.0;
        let real_str = format!("{}m{:.3}s", minutes, seconds);
        format!("\nreal\t{}\nuser\t0m0.000s\nsys\t0m0.000s\n", real_str)
    }
}
