//! Control Flow Execution
//!
//! Handles control flow constructs:
//! - if/elif/else
//! - for loops
//! - C-style for loops
//! - while loops
//! - until loops
//! - case statements
//! - break/continue

use regex_lite::Regex;

use crate::ast::types::StatementNode;
use crate::interpreter::errors::{ExecutionLimitError, InterpreterError, LimitType};
use crate::interpreter::helpers::condition::ConditionResult;
use crate::interpreter::helpers::loop_helpers::{handle_loop_error, LoopAction};
use crate::interpreter::types::{ExecResult, InterpreterState};

/// Result of executing a `for`/`while`/`until` loop.
#[derive(Debug, Clone, Default)]
pub struct ForResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Execute an `if`/`elif`/.../`else` chain.
///
/// `clauses` is the list of (condition statements, body statements) pairs
/// for `if` and each `elif`. The first clause whose condition exits 0 has
/// its body executed; if none match, `else_body` (if present) runs.
pub fn execute_if<F, G>(
    state: &mut InterpreterState,
    clauses: &[(Vec<&StatementNode>, Vec<&StatementNode>)],
    else_body: Option<&[&StatementNode]>,
    mut eval_condition: F,
    mut exec_body: G,
) -> Result<ConditionResult, InterpreterError>
where
    F: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    G: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    let mut stdout = String::new();
    let mut stderr = String::new();

    for (condition, body) in clauses {
        let mut cond_exit = 0;
        for stmt in condition {
            let res = eval_condition(state, stmt)?;
            stdout.push_str(&res.stdout);
            stderr.push_str(&res.stderr);
            cond_exit = res.exit_code;
        }
        if cond_exit == 0 {
            let mut exit_code = 0;
            for stmt in body {
                let res = exec_body(state, stmt)?;
                stdout.push_str(&res.stdout);
                stderr.push_str(&res.stderr);
                exit_code = res.exit_code;
            }
            return Ok(ConditionResult::new(stdout, stderr, exit_code));
        }
    }

    if let Some(body) = else_body {
        let mut exit_code = 0;
        for stmt in body {
            let res = exec_body(state, stmt)?;
            stdout.push_str(&res.stdout);
            stderr.push_str(&res.stderr);
            exit_code = res.exit_code;
        }
        return Ok(ConditionResult::new(stdout, stderr, exit_code));
    }

    Ok(ConditionResult::new(stdout, stderr, 0))
}

/// Execute a `for name in words; do ...; done` loop.
pub fn execute_for<G>(
    state: &mut InterpreterState,
    variable: &str,
    words: &[String],
    body: &[&StatementNode],
    max_iterations: u64,
    mut exec_body: G,
) -> Result<ForResult, InterpreterError>
where
    G: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;

    state.loop_depth += 1;
    let mut iterations: u64 = 0;

    for word in words {
        iterations += 1;
        if iterations > max_iterations {
            state.loop_depth -= 1;
            return Err(InterpreterError::ExecutionLimit(ExecutionLimitError::new(
                format!("maximum loop iterations ({}) exceeded", max_iterations),
                LimitType::Iterations,
                stdout,
                stderr,
            )));
        }

        state.env.insert(variable.to_string(), word.clone());

        let mut broke = false;
        for stmt in body {
            match exec_body(state, stmt) {
                Ok(res) => {
                    stdout.push_str(&res.stdout);
                    stderr.push_str(&res.stderr);
                    exit_code = res.exit_code;
                }
                Err(e) => {
                    let result = handle_loop_error(e, stdout, stderr, state.loop_depth);
                    stdout = result.stdout;
                    stderr = result.stderr;
                    match result.action {
                        LoopAction::Break => {
                            broke = true;
                            break;
                        }
                        LoopAction::Continue => {
                            break;
                        }
                        LoopAction::Rethrow => {
                            state.loop_depth -= 1;
                            return Err(result.error.unwrap());
                        }
                        LoopAction::Error => {
                            exit_code = result.exit_code.unwrap_or(1);
                            broke = true;
                            break;
                        }
                    }
                }
            }
        }
        if broke {
            break;
        }
    }

    state.loop_depth -= 1;
    Ok(ForResult { stdout, stderr, exit_code })
}

/// Execute a `while condition; do ...; done` loop.
pub fn execute_while<F, G>(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    max_iterations: u64,
    eval_condition: F,
    exec_body: G,
) -> Result<ForResult, InterpreterError>
where
    F: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    G: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    execute_while_until(state, condition, body, max_iterations, eval_condition, exec_body, false)
}

/// Execute an `until condition; do ...; done` loop.
pub fn execute_until<F, G>(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    max_iterations: u64,
    eval_condition: F,
    exec_body: G,
) -> Result<ForResult, InterpreterError>
where
    F: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    G: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    execute_while_until(state, condition, body, max_iterations, eval_condition, exec_body, true)
}

fn execute_while_until<F, G>(
    state: &mut InterpreterState,
    condition: &[&StatementNode],
    body: &[&StatementNode],
    max_iterations: u64,
    mut eval_condition: F,
    mut exec_body: G,
    until: bool,
) -> Result<ForResult, InterpreterError>
where
    F: FnMut(&mut InterpreterState, &StatementNode) -> Result<ConditionResult, InterpreterError>,
    G: FnMut(&mut InterpreterState, &StatementNode) -> Result<ExecResult, InterpreterError>,
{
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;

    state.loop_depth += 1;
    let mut iterations: u64 = 0;

    loop {
        let mut cond_exit = 0;
        for stmt in condition {
            match eval_condition(state, stmt) {
                Ok(res) => {
                    stdout.push_str(&res.stdout);
                    stderr.push_str(&res.stderr);
                    cond_exit = res.exit_code;
                }
                Err(e) => {
                    state.loop_depth -= 1;
                    return Err(e);
                }
            }
        }

        let keep_going = if until { cond_exit != 0 } else { cond_exit == 0 };
        if !keep_going {
            break;
        }

        iterations += 1;
        if iterations > max_iterations {
            state.loop_depth -= 1;
            return Err(InterpreterError::ExecutionLimit(ExecutionLimitError::new(
                format!("maximum loop iterations ({}) exceeded", max_iterations),
                LimitType::Iterations,
                stdout,
                stderr,
            )));
        }

        let mut broke = false;
        for stmt in body {
            match exec_body(state, stmt) {
                Ok(res) => {
                    stdout.push_str(&res.stdout);
                    stderr.push_str(&res.stderr);
                    exit_code = res.exit_code;
                }
                Err(e) => {
                    let result = handle_loop_error(e, stdout, stderr, state.loop_depth);
                    stdout = result.stdout;
                    stderr = result.stderr;
                    match result.action {
                        LoopAction::Break => {
                            broke = true;
                            break;
                        }
                        LoopAction::Continue => {
                            break;
                        }
                        LoopAction::Rethrow => {
                            state.loop_depth -= 1;
                            return Err(result.error.unwrap());
                        }
                        LoopAction::Error => {
                            exit_code = result.exit_code.unwrap_or(1);
                            broke = true;
                            break;
                        }
                    }
                }
            }
        }
        if broke {
            break;
        }
    }

    state.loop_depth -= 1;
    Ok(ForResult { stdout, stderr, exit_code })
}

/// Validate that a variable name is a valid identifier.
/// Returns true if valid, false otherwise.
pub fn is_valid_identifier(name: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
    re.is_match(name)
}

/// Case statement terminator types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    /// ;; - stop, no fall-through
    Break,
    /// ;& - unconditional fall-through (execute next body without pattern check)
    FallThrough,
    /// ;;& - continue pattern matching (check next case patterns)
    ContinueMatching,
}

impl CaseTerminator {
    /// Parse a terminator string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            ";;" => Some(CaseTerminator::Break),
            ";&" => Some(CaseTerminator::FallThrough),
            ";;&" => Some(CaseTerminator::ContinueMatching),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseTerminator::Break => ";;",
            CaseTerminator::FallThrough => ";&",
            CaseTerminator::ContinueMatching => ";;&",
        }
    }
}
