//! Execution Engine
//!
//! The core execution engine that ties all interpreter components together.
//! Implements the full AST execution chain:
//!
//! execute_script -> execute_statement -> execute_pipeline -> execute_command

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::types::{
    CaseTerminator, CommandNode, CompoundCommandNode, CondBinaryOperator, CondUnaryOperator,
    ConditionalExpressionNode, PipelineNode, ScriptNode, SimpleCommandNode, StatementNode,
    StatementOperator, WordNode,
};
use crate::commands::types::{ExecFn, FetchFn};
use crate::commands::{CommandContext, CommandRegistry};
use crate::fs::FileSystem as AsyncFileSystem;
use crate::interpreter::arithmetic::evaluate_arithmetic;
use crate::interpreter::builtins::{
    handle_break, handle_cd, handle_compgen, handle_complete, handle_compopt, handle_continue,
    handle_declare, handle_dirs, handle_exit, handle_export, handle_getopts, handle_hash,
    handle_help, handle_let, handle_local, handle_mapfile, handle_popd, handle_pushd, handle_read,
    handle_readonly, handle_return, handle_set, handle_shift, handle_shopt, handle_unset,
    BuiltinResult,
};
use crate::interpreter::builtins::eval_cmd::{eval_parse_error, parse_eval_args, prepare_eval_stdin, restore_eval_stdin};
use crate::interpreter::builtins::source_cmd::{
    parse_source_args, prepare_source_state, resolve_source_paths, restore_source_state,
    source_file_not_found, source_parse_error,
};
use crate::interpreter::conditionals::{match_pattern, parse_numeric, posix_ere_to_regex};
use crate::interpreter::control_flow::{execute_for, execute_if, execute_until, execute_while, ForResult};
use crate::interpreter::errors::{
    ControlFlowError, ErrexitError, ExecutionLimitError, ExitError, InterpreterError, LimitType,
};
use crate::interpreter::functions::{call_function, get_function, is_function_defined};
use crate::interpreter::helpers::condition::ConditionResult;
use crate::interpreter::helpers::file_tests::is_char_device;
use crate::interpreter::helpers::loop_helpers::{handle_loop_error, LoopAction};
use crate::interpreter::helpers::nameref::is_nameref;
use crate::interpreter::helpers::numeric_compare::{compare_numeric, NumericOp};
use crate::interpreter::interpreter::{
    build_exported_env, check_command_limit, should_trigger_errexit, update_exit_code,
    FileSystem as SyncFileSystem,
};
use crate::interpreter::pipeline_execution::{execute_pipeline, set_pipestatus, PipelineOptions, PipelineState};
use crate::interpreter::simple_command_assignments::process_assignments;
use crate::interpreter::redirections::apply_redirections;
use crate::interpreter::subshell_group::{execute_group, execute_subshell};
use crate::interpreter::types::{ExecResult, ExecutionLimits, InterpreterContext, InterpreterState};
use crate::interpreter::word_expand::{Expander, RunScript};

/// The execution engine that ties all interpreter components together.
pub struct ExecutionEngine<'a> {
    /// Execution limits (max commands, recursion depth, iterations)
    pub limits: &'a ExecutionLimits,
    /// Sync filesystem interface, used by word expansion and redirections
    pub fs: &'a dyn SyncFileSystem,
    /// Async filesystem interface, handed to registered external commands
    pub async_fs: Arc<dyn AsyncFileSystem>,
    /// Registry of curated coreutils-style external commands
    pub registry: Arc<CommandRegistry>,
    /// Tokio runtime handle used to drive async commands from sync code
    pub runtime_handle: tokio::runtime::Handle,
    /// Closure that lets registered commands (bash, xargs, ...) recurse into the interpreter
    pub exec_fn: Option<ExecFn>,
    /// Closure that lets registered commands (curl, ...) perform HTTP requests
    pub fetch_fn: Option<FetchFn>,
}

impl<'a> ExecutionEngine<'a> {
    /// Create a new execution engine.
    pub fn new(
        limits: &'a ExecutionLimits,
        fs: &'a dyn SyncFileSystem,
        async_fs: Arc<dyn AsyncFileSystem>,
        registry: Arc<CommandRegistry>,
        runtime_handle: tokio::runtime::Handle,
        exec_fn: Option<ExecFn>,
        fetch_fn: Option<FetchFn>,
    ) -> Self {
        Self {
            limits,
            fs,
            async_fs,
            registry,
            runtime_handle,
            exec_fn,
            fetch_fn,
        }
    }

    /// Build a `RunScript` closure that runs a nested script and folds interpreter
    /// errors (exit, execution limits, control flow escaping a subshell) into an
    /// `ExecResult`, for use by command substitution and process substitution.
    fn run_script_adapter(&self, script: &ScriptNode, state: &mut InterpreterState) -> ExecResult {
        match self.execute_script(state, script) {
            Ok(r) => r,
            Err(InterpreterError::Exit(e)) => ExecResult::new(e.stdout, e.stderr, e.exit_code),
            Err(InterpreterError::ExecutionLimit(e)) => ExecResult::new(e.stdout, e.stderr, ExecutionLimitError::EXIT_CODE),
            Err(e) => ExecResult::new(String::new(), format!("{}\n", e), 1),
        }
    }

    /// Execute a complete script (list of statements).
    pub fn execute_script(
        &self,
        state: &mut InterpreterState,
        ast: &ScriptNode,
    ) -> Result<ExecResult, InterpreterError> {
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for statement in &ast.statements {
            match self.execute_statement(state, statement) {
                Ok(result) => {
                    stdout.push_str(&result.stdout);
                    stderr.push_str(&result.stderr);
                    exit_code = result.exit_code;
                    update_exit_code(state, exit_code);
                }
                Err(InterpreterError::Exit(e)) => {
                    // ExitError propagates up to terminate the script
                    let mut err = e;
                    err.prepend_output(&stdout, &stderr);
                    return Err(InterpreterError::Exit(err));
                }
                Err(InterpreterError::ExecutionLimit(e)) => {
                    // ExecutionLimitError must always propagate
                    return Err(InterpreterError::ExecutionLimit(e));
                }
                Err(InterpreterError::Errexit(e)) => {
                    // Errexit terminates the script
                    stdout.push_str(&e.stdout);
                    stderr.push_str(&e.stderr);
                    exit_code = e.exit_code;
                    return Ok(ExecResult::new(stdout, stderr, exit_code));
                }
                Err(InterpreterError::Break(mut e)) => {
                    // Break/continue outside loops - silently continue
                    e.prepend_output(&stdout, &stderr);
                    stdout = e.stdout.clone();
                    stderr = e.stderr.clone();
                    continue;
                }
                Err(InterpreterError::Continue(mut e)) => {
                    e.prepend_output(&stdout, &stderr);
                    stdout = e.stdout.clone();
                    stderr = e.stderr.clone();
                    continue;
                }
                Err(InterpreterError::Return(mut e)) => {
                    // Return outside function - propagate
                    e.prepend_output(&stdout, &stderr);
                    return Err(InterpreterError::Return(e));
                }
                Err(e) => {
                    // Other errors - convert to result
                    stderr.push_str(&format!("{}\n", e));
                    exit_code = 1;
                }
            }
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a single statement (list of pipelines with && || operators).
    pub fn execute_statement(
        &self,
        state: &mut InterpreterState,
        stmt: &StatementNode,
    ) -> Result<ExecResult, InterpreterError> {
        // Handle deferred syntax errors
        if let Some(ref err) = stmt.deferred_error {
            return Ok(ExecResult::new(
                String::new(),
                format!("bash: syntax error near unexpected token `{}'\n", err.token),
                2,
            ));
        }

        // noexec mode (set -n): parse but don't execute
        if state.options.noexec {
            return Ok(ExecResult::ok());
        }

        // Reset errexit_safe at start of each statement
        state.errexit_safe = Some(false);

        let mut stdout = String::new();
        let mut stderr = String::new();

        // verbose mode (set -v): print source before execution
        if state.options.verbose {
            if let Some(ref source) = stmt.source_text {
                stderr.push_str(source);
                stderr.push('\n');
            }
        }

        let mut exit_code = 0;
        let mut last_executed_index: i32 = -1;
        let mut last_pipeline_negated = false;

        for (i, pipeline) in stmt.pipelines.iter().enumerate() {
            // Check && / || short-circuit
            if i > 0 {
                let op = &stmt.operators[i - 1];
                match op {
                    StatementOperator::And => {
                        if exit_code != 0 {
                            continue;
                        }
                    }
                    StatementOperator::Or => {
                        if exit_code == 0 {
                            continue;
                        }
                    }
                    StatementOperator::Semi => {
                        // Always execute
                    }
                }
            }

            let result = self.execute_pipeline_node(state, pipeline)?;
            stdout.push_str(&result.stdout);
            stderr.push_str(&result.stderr);
            exit_code = result.exit_code;
            last_executed_index = i as i32;
            last_pipeline_negated = pipeline.negated;

            update_exit_code(state, exit_code);
        }

        // Check errexit
        let was_short_circuited = last_executed_index < (stmt.pipelines.len() as i32 - 1);
        let inner_was_safe = state.errexit_safe.unwrap_or(false);

        if should_trigger_errexit(state, exit_code, was_short_circuited, last_pipeline_negated)
            && !inner_was_safe
        {
            return Err(InterpreterError::Errexit(ErrexitError::new(
                exit_code, stdout, stderr,
            )));
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a pipeline (list of commands connected by |).
    pub fn execute_pipeline_node(
        &self,
        state: &mut InterpreterState,
        pipeline: &PipelineNode,
    ) -> Result<ExecResult, InterpreterError> {
        let mut pipe_state = PipelineState::new();
        let pipe_stderr = pipeline.pipe_stderr.clone().unwrap_or_default();

        let options = PipelineOptions {
            pipefail: state.options.pipefail,
            lastpipe: state.shopt_options.lastpipe,
            runs_in_subshell: false,
            time_pipeline: pipeline.timed,
            time_posix_format: pipeline.time_posix,
        };

        // We need to pass state through the closure, but execute_pipeline
        // takes ownership of the closure. Use a RefCell pattern.
        let state_cell = RefCell::new(state);

        let result = execute_pipeline(
            &mut pipe_state,
            &pipeline.commands,
            &pipe_stderr,
            &options,
            |cmd, stdin| {
                let state = &mut *state_cell.borrow_mut();
                self.execute_command(state, cmd, stdin)
            },
        )?;

        // Get state back
        let state = state_cell.into_inner();

        // Set PIPESTATUS
        set_pipestatus(&mut state.env, &result.exit_codes);

        let mut exec_result = result.to_exec_result();

        // Handle negation
        if pipeline.negated {
            exec_result.exit_code = if exec_result.exit_code == 0 { 1 } else { 0 };
        }

        Ok(exec_result)
    }

    /// Execute a single command.
    pub fn execute_command(
        &self,
        state: &mut InterpreterState,
        cmd: &CommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        // Check command limit
        if let Some(msg) = check_command_limit(state, self.limits) {
            return Err(InterpreterError::ExecutionLimit(ExecutionLimitError::simple(
                msg,
                LimitType::Commands,
            )));
        }

        match cmd {
            CommandNode::Simple(simple) => self.execute_simple_command(state, simple, stdin),
            CommandNode::Compound(compound) => {
                self.execute_compound_command(state, compound, stdin)
            }
            CommandNode::FunctionDef(func_def) => {
                let current_source = state.current_source.clone();
                execute_function_def(state, func_def, current_source.as_deref())
                    .map_err(InterpreterError::Exit)
            }
        }
    }

    /// Execute a simple command (name + args + redirections).
    pub fn execute_simple_command(
        &self,
        state: &mut InterpreterState,
        cmd: &SimpleCommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        // Set line number for $LINENO
        if let Some(line) = cmd.line {
            state.current_line = line as u32;
        }

        let expander = Expander::new(self.fs, self.limits);
        let mut run_script = |script: &ScriptNode, st: &mut InterpreterState| -> ExecResult {
            self.run_script_adapter(script, st)
        };
        let run_cell = RefCell::new(&mut run_script as &mut RunScript);
        let expand_fn = |state: &mut InterpreterState, word: &WordNode| -> String {
            expander.expand_plain(state, word, &mut **run_cell.borrow_mut())
        };

        // 1. Process assignments (VAR=value prefixes and assignment-only commands)
        let assignment_result = process_assignments(state, cmd, expand_fn);

        if let Some(error) = assignment_result.error {
            return Ok(error);
        }

        // Assignment-only command: no name, nothing further to run
        if cmd.name.is_none() {
            return Ok(ExecResult::new(String::new(), assignment_result.xtrace_output, 0));
        }

        // 2. Expand command name and arguments
        let name_word = cmd.name.as_ref().unwrap();
        let cmd_name = expand_fn(state, name_word);
        let args = expander.expand_words_full(state, &cmd.args, &mut **run_cell.borrow_mut());

        // 3. Dispatch: builtins -> functions -> registered commands -> not found
        let dispatch_result = self.dispatch_simple_command(state, &cmd_name, &args, stdin)?;

        let mut stderr_prefix = assignment_result.xtrace_output;
        stderr_prefix.push_str(&dispatch_result.stderr);
        let dispatch_result = ExecResult::new(dispatch_result.stdout, stderr_prefix, dispatch_result.exit_code);

        // 4. Apply redirections
        let final_result = apply_redirections(state, dispatch_result, &cmd.redirections, None, self.fs, expand_fn);

        // 5. Restore temporary prefix-assignment bindings (FOO=bar cmd)
        for (key, old_value) in assignment_result.temp_assignments {
            match old_value {
                Some(v) => {
                    state.env.insert(key, v);
                }
                None => {
                    state.env.remove(&key);
                }
            }
        }

        Ok(final_result)
    }

    /// Dispatch a simple command after assignments and expansion: shell builtins,
    /// then user-defined functions, then the registered external commands, then 127.
    fn dispatch_simple_command(
        &self,
        state: &mut InterpreterState,
        cmd_name: &str,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        match cmd_name {
            "break" => handle_break(state, args).map(builtin_to_exec).map_err(Into::into),
            "continue" => handle_continue(state, args).map(builtin_to_exec).map_err(Into::into),
            "return" => handle_return(state, args).map(builtin_to_exec).map_err(Into::into),
            "exit" => match handle_exit(state, args) {
                Ok(_) => unreachable!("handle_exit always returns Err"),
                Err(e) => Err(e),
            },
            "export" => Ok(builtin_to_exec(handle_export(state, args))),
            "unset" => Ok(handle_unset(state, args)),
            "cd" => Ok(handle_cd(state, args, self.fs)),
            "local" => Ok(handle_local(state, args)),
            "set" => handle_set(state, args).map(builtin_to_exec).map_err(Into::into),
            "shift" => handle_shift(state, args).map(builtin_to_exec).map_err(Into::into),
            "shopt" => Ok(builtin_to_exec(handle_shopt(state, args))),
            "help" => Ok(builtin_to_exec(handle_help(args))),
            "getopts" => Ok(builtin_to_exec(handle_getopts(state, args))),
            "hash" => Ok(builtin_to_exec(handle_hash(state, args))),
            "let" => Ok(builtin_to_exec(handle_let(state, args))),
            "mapfile" | "readarray" => Ok(builtin_to_exec(handle_mapfile(state, args, stdin))),
            "read" => Ok(builtin_to_exec(handle_read(state, args, stdin, 0))),
            "declare" | "typeset" => Ok(builtin_to_exec(handle_declare(state, args))),
            "readonly" => Ok(builtin_to_exec(handle_readonly(state, args))),
            "pushd" => Ok(builtin_to_exec(handle_pushd(state, args))),
            "popd" => Ok(builtin_to_exec(handle_popd(state, args))),
            "dirs" => Ok(builtin_to_exec(handle_dirs(state, args))),
            "compgen" => Ok(builtin_to_exec(handle_compgen(state, args))),
            "complete" => Ok(builtin_to_exec(handle_complete(state, args))),
            "compopt" => Ok(builtin_to_exec(handle_compopt(state, args))),
            "eval" => self.handle_eval(state, args),
            "." | "source" => self.handle_source(state, args),
            ":" | "true" => Ok(ExecResult::ok()),
            "false" => Ok(ExecResult::new(String::new(), String::new(), 1)),
            "pwd" => Ok(ExecResult::new(format!("{}\n", state.cwd), String::new(), 0)),
            _ => self.dispatch_function_or_command(state, cmd_name, args, stdin),
        }
    }

    /// Try a user-defined function, then a registered external command, then 127.
    fn dispatch_function_or_command(
        &self,
        state: &mut InterpreterState,
        cmd_name: &str,
        args: &[String],
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        if is_function_defined(state, cmd_name) {
            let func = get_function(state, cmd_name)
                .expect("checked by is_function_defined")
                .clone();
            let call_line = Some(state.current_line);
            return call_function(
                state,
                &func,
                args,
                stdin,
                call_line,
                self.limits.max_recursion_depth,
                |st, body_stdin| self.execute_compound_command(st, &func.body, body_stdin),
            );
        }

        if let Some(command) = self.registry.get(cmd_name) {
            let env = build_exported_env(state);
            let ctx = CommandContext {
                args: args.to_vec(),
                stdin: stdin.to_string(),
                cwd: state.cwd.clone(),
                env,
                fs: self.async_fs.clone(),
                exec_fn: self.exec_fn.clone(),
                fetch_fn: self.fetch_fn.clone(),
            };
            let result = self.runtime_handle.block_on(command.execute(ctx));
            return Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code));
        }

        Ok(ExecResult::new(
            String::new(),
            format!("bash: {}: command not found\n", cmd_name),
            127,
        ))
    }

    /// `eval arg...`: concatenate arguments and execute them as a command in the
    /// current shell environment (assignments and function definitions persist).
    fn handle_eval(&self, state: &mut InterpreterState, args: &[String]) -> Result<ExecResult, InterpreterError> {
        match parse_eval_args(args) {
            Ok(None) => Ok(ExecResult::ok()),
            Ok(Some(eval_cmd)) => {
                let saved = prepare_eval_stdin(state, eval_cmd.stdin.as_deref());
                let result = match crate::parser::parse(&eval_cmd.command) {
                    Ok(ast) => self.execute_script(state, &ast),
                    Err(e) => Ok(eval_parse_error(&e.to_string())),
                };
                restore_eval_stdin(state, saved);
                result
            }
            Err((stdout, stderr, exit_code)) => Ok(ExecResult::new(stdout, stderr, exit_code)),
        }
    }

    /// `source file` / `. file`: read a script from the virtual filesystem and
    /// execute it in the current shell environment.
    fn handle_source(&self, state: &mut InterpreterState, args: &[String]) -> Result<ExecResult, InterpreterError> {
        let cmd = match parse_source_args(args) {
            Ok(cmd) => cmd,
            Err((stdout, stderr, exit_code)) => return Ok(ExecResult::new(stdout, stderr, exit_code)),
        };

        let path_env = state.env.get("PATH").cloned();
        let candidates = resolve_source_paths(&state.cwd, &cmd.filename, path_env.as_deref());

        let content = candidates.iter().find_map(|path| self.fs.read_file(path).ok());
        let content = match content {
            Some(c) => c,
            None => return Ok(source_file_not_found(&cmd.filename)),
        };

        let ast = match crate::parser::parse(&content) {
            Ok(ast) => ast,
            Err(e) => return Ok(source_parse_error(&cmd.filename, &e.to_string())),
        };

        let saved = prepare_source_state(state, &cmd);
        let result = self.execute_script(state, &ast);
        restore_source_state(state, saved);
        result
    }

    /// Execute a compound command (if, for, while, etc.).
    pub fn execute_compound_command(
        &self,
        state: &mut InterpreterState,
        compound: &CompoundCommandNode,
        stdin: &str,
    ) -> Result<ExecResult, InterpreterError> {
        match compound {
            CompoundCommandNode::If(if_node) => {
                // Build clauses for execute_if
                let clauses: Vec<(Vec<&StatementNode>, Vec<&StatementNode>)> = if_node
                    .clauses
                    .iter()
                    .map(|c| {
                        (
                            c.condition.iter().collect(),
                            c.body.iter().collect(),
                        )
                    })
                    .collect();

                let else_body: Option<Vec<&StatementNode>> =
                    if_node.else_body.as_ref().map(|b| b.iter().collect());

                let result = execute_if(
                    state,
                    &clauses,
                    else_body.as_deref(),
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::For(for_node) => {
                // Expand words
                let expander = Expander::new(self.fs, self.limits);
                let mut run_script = |script: &ScriptNode, st: &mut InterpreterState| -> ExecResult {
                    self.run_script_adapter(script, st)
                };

                let mut words: Vec<String> = Vec::new();
                if let Some(ref word_list) = for_node.words {
                    words = expander.expand_words_full(state, word_list, &mut run_script);
                } else {
                    // Default to positional parameters
                    let argc: usize = state.env.get("#")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    for i in 1..=argc {
                        if let Some(val) = state.env.get(&i.to_string()) {
                            words.push(val.clone());
                        }
                    }
                }

                let body: Vec<&StatementNode> = for_node.body.iter().collect();

                let result = execute_for(
                    state,
                    &for_node.variable,
                    &words,
                    &body,
                    self.limits.max_iterations,
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::While(while_node) => {
                let condition: Vec<&StatementNode> = while_node.condition.iter().collect();
                let body: Vec<&StatementNode> = while_node.body.iter().collect();

                let result = execute_while(
                    state,
                    &condition,
                    &body,
                    self.limits.max_iterations,
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::Until(until_node) => {
                let condition: Vec<&StatementNode> = until_node.condition.iter().collect();
                let body: Vec<&StatementNode> = until_node.body.iter().collect();

                let result = execute_until(
                    state,
                    &condition,
                    &body,
                    self.limits.max_iterations,
                    |state, stmt| {
                        let res = self.execute_statement(state, stmt)?;
                        Ok(ConditionResult {
                            stdout: res.stdout,
                            stderr: res.stderr,
                            exit_code: res.exit_code,
                        })
                    },
                    |state, stmt| self.execute_statement(state, stmt),
                )?;

                Ok(ExecResult::new(result.stdout, result.stderr, result.exit_code))
            }

            CompoundCommandNode::Case(case_node) => self.execute_case(state, case_node),

            CompoundCommandNode::Subshell(subshell_node) => {
                execute_subshell(
                    state,
                    &subshell_node.body,
                    Some(stdin),
                    |state, stmt| self.execute_statement(state, stmt),
                )
            }

            CompoundCommandNode::Group(group_node) => {
                execute_group(
                    state,
                    &group_node.body,
                    Some(stdin),
                    |state, stmt| self.execute_statement(state, stmt),
                )
            }

            CompoundCommandNode::ArithmeticCommand(arith) => {
                let mut ctx = InterpreterContext::new(state, self.limits);
                match evaluate_arithmetic(&mut ctx, &arith.expression.expression, false, None) {
                    Ok(value) => {
                        // Arithmetic command: exit 0 if non-zero, exit 1 if zero
                        let exit_code = if value != 0 { 0 } else { 1 };
                        Ok(ExecResult::new(String::new(), String::new(), exit_code))
                    }
                    Err(e) => {
                        Ok(ExecResult::new(
                            String::new(),
                            format!("bash: {}\n", e),
                            1,
                        ))
                    }
                }
            }

            CompoundCommandNode::ConditionalCommand(cond) => {
                let expander = Expander::new(self.fs, self.limits);
                let mut run_script = |script: &ScriptNode, st: &mut InterpreterState| -> ExecResult {
                    self.run_script_adapter(script, st)
                };
                let matched = self.eval_conditional_expr(state, &cond.expression, &mut run_script, &expander);
                Ok(ExecResult::new(String::new(), String::new(), if matched { 0 } else { 1 }))
            }

            CompoundCommandNode::CStyleFor(cfor) => self.execute_c_style_for(state, cfor),
        }
    }

    /// Execute a `case word in pattern) body;; ... esac` statement.
    fn execute_case(
        &self,
        state: &mut InterpreterState,
        case_node: &crate::ast::types::CaseNode,
    ) -> Result<ExecResult, InterpreterError> {
        let expander = Expander::new(self.fs, self.limits);
        let mut run_script = |script: &ScriptNode, st: &mut InterpreterState| -> ExecResult {
            self.run_script_adapter(script, st)
        };
        let word = expander.expand_plain(state, &case_node.word, &mut run_script);

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;
        let mut index = 0;
        let mut force_execute = false;

        while index < case_node.items.len() {
            let item = &case_node.items[index];

            if !force_execute {
                let matched = item.patterns.iter().any(|pattern_word| {
                    let pattern = expander.expand_plain(state, pattern_word, &mut run_script);
                    match_pattern(&word, &pattern, state.shopt_options.nocasematch, state.shopt_options.extglob)
                });
                if !matched {
                    index += 1;
                    continue;
                }
            }

            for stmt in &item.body {
                let res = self.execute_statement(state, stmt)?;
                stdout.push_str(&res.stdout);
                stderr.push_str(&res.stderr);
                exit_code = res.exit_code;
            }

            match item.terminator {
                CaseTerminator::DoubleSemi => break,
                CaseTerminator::SemiAnd => {
                    force_execute = true;
                    index += 1;
                }
                CaseTerminator::SemiSemiAnd => {
                    force_execute = false;
                    index += 1;
                }
            }
        }

        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Execute a `for ((init; cond; update)) ; do ... ; done` loop.
    fn execute_c_style_for(
        &self,
        state: &mut InterpreterState,
        cfor: &crate::ast::types::CStyleForNode,
    ) -> Result<ExecResult, InterpreterError> {
        if let Some(init) = &cfor.init {
            let mut ctx = InterpreterContext::new(state, self.limits);
            let _ = evaluate_arithmetic(&mut ctx, &init.expression, false, None);
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        state.loop_depth += 1;
        let mut iterations: u64 = 0;
        let body: Vec<&StatementNode> = cfor.body.iter().collect();

        loop {
            let keep_going = if let Some(cond) = &cfor.condition {
                let mut ctx = InterpreterContext::new(state, self.limits);
                evaluate_arithmetic(&mut ctx, &cond.expression, false, None).map(|v| v != 0).unwrap_or(false)
            } else {
                true
            };
            if !keep_going {
                break;
            }

            iterations += 1;
            if iterations > self.limits.max_iterations {
                state.loop_depth -= 1;
                return Err(InterpreterError::ExecutionLimit(ExecutionLimitError::new(
                    format!("maximum loop iterations ({}) exceeded", self.limits.max_iterations),
                    LimitType::Iterations,
                    stdout,
                    stderr,
                )));
            }

            let mut broke = false;
            for stmt in &body {
                match self.execute_statement(state, stmt) {
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
                            LoopAction::Break => broke = true,
                            LoopAction::Continue => {}
                            LoopAction::Rethrow => {
                                state.loop_depth -= 1;
                                return Err(result.error.unwrap());
                            }
                            LoopAction::Error => {
                                exit_code = result.exit_code.unwrap_or(1);
                                broke = true;
                            }
                        }
                        break;
                    }
                }
            }
            if broke {
                break;
            }

            if let Some(update) = &cfor.update {
                let mut ctx = InterpreterContext::new(state, self.limits);
                let _ = evaluate_arithmetic(&mut ctx, &update.expression, false, None);
            }
        }

        state.loop_depth -= 1;
        Ok(ExecResult::new(stdout, stderr, exit_code))
    }

    /// Recursively evaluate a `[[ ]]` conditional expression tree.
    fn eval_conditional_expr(
        &self,
        state: &mut InterpreterState,
        expr: &ConditionalExpressionNode,
        run: &mut RunScript,
        expander: &Expander,
    ) -> bool {
        match expr {
            ConditionalExpressionNode::Word(w) => {
                let value = expander.expand_plain(state, &w.word, run);
                !value.is_empty()
            }
            ConditionalExpressionNode::Not(n) => !self.eval_conditional_expr(state, &n.operand, run, expander),
            ConditionalExpressionNode::And(a) => {
                self.eval_conditional_expr(state, &a.left, run, expander)
                    && self.eval_conditional_expr(state, &a.right, run, expander)
            }
            ConditionalExpressionNode::Or(o) => {
                self.eval_conditional_expr(state, &o.left, run, expander)
                    || self.eval_conditional_expr(state, &o.right, run, expander)
            }
            ConditionalExpressionNode::Group(g) => self.eval_conditional_expr(state, &g.expression, run, expander),
            ConditionalExpressionNode::Unary(u) => {
                let operand = expander.expand_plain(state, &u.operand, run);
                self.eval_unary_cond(state, u.operator, &operand)
            }
            ConditionalExpressionNode::Binary(b) => {
                let left = expander.expand_plain(state, &b.left, run);
                let right = expander.expand_plain(state, &b.right, run);
                self.eval_binary_cond(state, b.operator, &left, &right)
            }
        }
    }

    fn eval_binary_cond(&self, state: &InterpreterState, op: CondBinaryOperator, left: &str, right: &str) -> bool {
        match op {
            CondBinaryOperator::Eq | CondBinaryOperator::EqEq => {
                match_pattern(left, right, state.shopt_options.nocasematch, state.shopt_options.extglob)
            }
            CondBinaryOperator::Ne => {
                !match_pattern(left, right, state.shopt_options.nocasematch, state.shopt_options.extglob)
            }
            CondBinaryOperator::Match => {
                let regex_str = posix_ere_to_regex(right);
                regex_lite::Regex::new(&regex_str).map(|re| re.is_match(left)).unwrap_or(false)
            }
            CondBinaryOperator::Lt => left < right,
            CondBinaryOperator::Gt => left > right,
            CondBinaryOperator::NumEq => compare_numeric(NumericOp::Eq, parse_numeric(left), parse_numeric(right)),
            CondBinaryOperator::NumNe => compare_numeric(NumericOp::Ne, parse_numeric(left), parse_numeric(right)),
            CondBinaryOperator::NumLt => compare_numeric(NumericOp::Lt, parse_numeric(left), parse_numeric(right)),
            CondBinaryOperator::NumLe => compare_numeric(NumericOp::Le, parse_numeric(left), parse_numeric(right)),
            CondBinaryOperator::NumGt => compare_numeric(NumericOp::Gt, parse_numeric(left), parse_numeric(right)),
            CondBinaryOperator::NumGe => compare_numeric(NumericOp::Ge, parse_numeric(left), parse_numeric(right)),
            CondBinaryOperator::Nt => self.file_newer_than(&state.cwd, left, right),
            CondBinaryOperator::Ot => self.file_newer_than(&state.cwd, right, left),
            CondBinaryOperator::Ef => {
                let pa = self.fs.resolve_path(&state.cwd, left);
                let pb = self.fs.resolve_path(&state.cwd, right);
                pa == pb && self.fs.exists(&pa)
            }
        }
    }

    fn file_newer_than(&self, cwd: &str, a: &str, b: &str) -> bool {
        let pa = self.fs.resolve_path(cwd, a);
        let pb = self.fs.resolve_path(cwd, b);
        match (self.fs.stat(&pa), self.fs.stat(&pb)) {
            (Ok(sa), Ok(sb)) => sa.mtime > sb.mtime,
            (Ok(_), Err(_)) => true,
            _ => false,
        }
    }

    /// Evaluate a `[[ ]]` / `test` unary operator.
    ///
    /// The virtual filesystem has no real device files, ownership, or tty, so
    /// the device-type and ownership tests (`-b`, `-p`, `-S`, `-G`, `-O`, `-t`,
    /// `-N`) are approximated: device/pipe/socket/tty tests are always false,
    /// and ownership tests degrade to plain existence checks.
    fn eval_unary_cond(&self, state: &InterpreterState, op: CondUnaryOperator, operand: &str) -> bool {
        use CondUnaryOperator::*;

        match op {
            Z => operand.is_empty(),
            LowerN => !operand.is_empty(),
            V => state.env.contains_key(operand),
            UpperR => is_nameref(state, operand),
            LowerO => crate::interpreter::conditionals::evaluate_shell_option(state, operand),
            _ => {
                let path = self.fs.resolve_path(&state.cwd, operand);
                match op {
                    A | E => self.fs.exists(&path),
                    F => self.fs.is_file(&path),
                    D => self.fs.is_dir(&path),
                    R | W | X => self.fs.exists(&path),
                    S => self.fs.stat(&path).map(|s| s.size > 0).unwrap_or(false),
                    H | L => self.fs.stat(&path).map(|s| s.is_symlink).unwrap_or(false),
                    K => self.fs.stat(&path).map(|s| s.mode & 0o1000 != 0).unwrap_or(false),
                    G => self.fs.stat(&path).map(|s| s.mode & 0o2000 != 0).unwrap_or(false),
                    U => self.fs.stat(&path).map(|s| s.mode & 0o4000 != 0).unwrap_or(false),
                    UpperG | UpperO => self.fs.exists(&path),
                    C => is_char_device(operand) || is_char_device(&path),
                    B | P | UpperS | T | N => false,
                    Z | LowerN | V | UpperR | LowerO => unreachable!("handled above"),
                }
            }
        }
    }
}

fn builtin_to_exec(result: BuiltinResult) -> ExecResult {
    ExecResult::new(result.stdout, result.stderr, result.exit_code)
}

use crate::interpreter::functions::execute_function_def;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::default_registry;
    use crate::fs::{FileSystem as AsyncFsTrait, InMemoryFs};
    use crate::interpreter::sync_fs_adapter::SyncFsAdapter;

    fn make_engine_and_state() -> (ExecutionEngine<'static>, InterpreterState, Arc<InMemoryFs>) {
        let fs = Arc::new(InMemoryFs::new());
        let limits = Box::leak(Box::new(ExecutionLimits::default()));

        // We need a static reference for the test, so we leak the adapter
        let handle = tokio::runtime::Handle::current();
        let adapter = Box::leak(Box::new(SyncFsAdapter::new(fs.clone(), handle.clone())));

        let registry = Arc::new(default_registry());
        let engine = ExecutionEngine::new(limits, adapter, fs.clone(), registry, handle, None, None);
        let state = InterpreterState::default();

        (engine, state, fs)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_echo() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("echo hello world").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();

        assert_eq!(result.stdout, "hello world\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_variable_expansion() {
        let (engine, mut state, _fs) = make_engine_and_state();
        state.env.insert("NAME".to_string(), "world".to_string());

        let ast = crate::parser::parse("echo hello $NAME").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();

        assert_eq!(result.stdout, "hello world\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_true_false() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("true").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.exit_code, 0);

        let ast = crate::parser::parse("false").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_and_or() {
        let (engine, mut state, _fs) = make_engine_and_state();

        // true && echo yes
        let ast = crate::parser::parse("true && echo yes").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "yes\n");

        // false && echo no (should not print)
        let ast = crate::parser::parse("false && echo no").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "");

        // false || echo fallback
        let ast = crate::parser::parse("false || echo fallback").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "fallback\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_if() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("if true; then echo yes; fi").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "yes\n");

        let ast = crate::parser::parse("if false; then echo no; else echo else; fi").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "else\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_for() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("for i in a b c; do echo $i; done").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "a\nb\nc\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_while() {
        let (engine, mut state, _fs) = make_engine_and_state();
        state.env.insert("x".to_string(), "3".to_string());

        let ast = crate::parser::parse("while false; do echo loop; done").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_c_style_for() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("for ((i=0; i<3; i++)); do echo $i; done").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "0\n1\n2\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_case() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("case hello in h*) echo matched;; *) echo nope;; esac").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "matched\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_case_fallthrough() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("case a in a) echo one;& b) echo two;; esac").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "one\ntwo\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_conditional_command() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("[[ -n foo && foo == foo ]] && echo yes").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "yes\n");

        let ast = crate::parser::parse("[[ 1 -lt 2 ]] && echo smaller").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "smaller\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_subshell() {
        let (engine, mut state, _fs) = make_engine_and_state();
        state.env.insert("X".to_string(), "original".to_string());

        // Subshell should not affect parent
        let ast = crate::parser::parse("(X=modified; echo $X); echo $X").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        // Note: assignment in subshell not fully implemented yet
        // Just verify subshell executes
        assert!(result.stdout.contains("original"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_group() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("{ echo a; echo b; }").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "a\nb\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_pwd_cd() {
        let fs = Arc::new(InMemoryFs::new());
        let limits = Box::leak(Box::new(ExecutionLimits::default()));

        // Create directory structure using async API directly
        fs.mkdir("/home", &crate::fs::MkdirOptions { recursive: false }).await.unwrap();
        fs.mkdir("/home/user", &crate::fs::MkdirOptions { recursive: false }).await.unwrap();

        // Now create the sync adapter
        let handle = tokio::runtime::Handle::current();
        let adapter = Box::leak(Box::new(SyncFsAdapter::new(fs.clone(), handle.clone())));

        let registry = Arc::new(default_registry());
        let engine = ExecutionEngine::new(limits, adapter, fs.clone(), registry, handle, None, None);
        let mut state = InterpreterState::default();

        state.cwd = "/".to_string();
        state.env.insert("PWD".to_string(), "/".to_string());

        let ast = crate::parser::parse("pwd").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "/\n");

        let ast = crate::parser::parse("cd /home/user && pwd").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "/home/user\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_function_call() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("greet() { echo hi $1; }; greet world").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "hi world\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_registry_command() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("printf '%s\\n' hi").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.stdout, "hi\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execute_command_not_found() {
        let (engine, mut state, _fs) = make_engine_and_state();

        let ast = crate::parser::parse("totally_not_a_real_command").unwrap();
        let result = engine.execute_script(&mut state, &ast).unwrap();
        assert_eq!(result.exit_code, 127);
        assert!(result.stderr.contains("command not found"));
    }
}
