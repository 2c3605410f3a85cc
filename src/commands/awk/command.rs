// src/commands/awk/command.rs
use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use crate::commands::awk::context::AwkContext;
use crate::commands::awk::interpreter::AwkInterpreter;
use crate::commands::awk::parser::parse;
use crate::commands::awk::statements::flush_pipe_sinks;
use crate::commands::awk::variables::set_variable;

pub struct AwkCommand;

#[async_trait]
impl Command for AwkCommand {
    fn name(&self) -> &'static str {
        "awk"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let args = &ctx.args;

        if args.iter().any(|a| a == "--help") {
            return CommandResult::success(
                "Usage: awk [-F fs] [-v var=value] ['prog' | -f progfile] [file ...]\n\n\
                 Pattern scanning and processing language.\n\n\
                 Options:\n  \
                 -F fs            set the field separator\n  \
                 -v var=value     assign value to var before BEGIN runs\n  \
                 -f progfile      read the program text from progfile\n      \
                 --help           display this help and exit\n"
                    .to_string(),
            );
        }

        let mut fs = " ".to_string();
        let mut assignments: Vec<(String, String)> = Vec::new();
        let mut program_files: Vec<String> = Vec::new();
        let mut program_text: Option<String> = None;
        let mut files: Vec<String> = Vec::new();

        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            if arg == "-F" {
                i += 1;
                if i < args.len() {
                    fs = unescape_fs(&args[i]);
                }
            } else if let Some(rest) = arg.strip_prefix("-F") {
                if !rest.is_empty() {
                    fs = unescape_fs(rest);
                }
            } else if arg == "-v" {
                i += 1;
                if i < args.len() {
                    if let Some((name, value)) = args[i].split_once('=') {
                        assignments.push((name.to_string(), value.to_string()));
                    }
                }
            } else if let Some(rest) = arg.strip_prefix("-v") {
                if !rest.is_empty() {
                    if let Some((name, value)) = rest.split_once('=') {
                        assignments.push((name.to_string(), value.to_string()));
                    }
                }
            } else if arg == "-f" {
                i += 1;
                if i < args.len() {
                    program_files.push(args[i].clone());
                }
            } else if let Some(rest) = arg.strip_prefix("-f") {
                if !rest.is_empty() {
                    program_files.push(rest.to_string());
                }
            } else if arg == "--" {
                i += 1;
                while i < args.len() {
                    if program_text.is_none() && program_files.is_empty() {
                        program_text = Some(args[i].clone());
                    } else {
                        files.push(args[i].clone());
                    }
                    i += 1;
                }
                break;
            } else if program_text.is_none() && program_files.is_empty() {
                program_text = Some(arg.clone());
            } else {
                files.push(arg.clone());
            }
            i += 1;
        }

        let mut source = String::new();
        if !program_files.is_empty() {
            for path in &program_files {
                let resolved = ctx.fs.resolve_path(&ctx.cwd, path);
                match ctx.fs.read_file(&resolved).await {
                    Ok(content) => {
                        source.push_str(&content);
                        source.push('\n');
                    }
                    Err(_) => {
                        return CommandResult::with_exit_code(
                            String::new(),
                            format!("awk: can't open file {}\n", path),
                            2,
                        );
                    }
                }
            }
        } else if let Some(text) = program_text {
            source = text;
        } else {
            return CommandResult::with_exit_code(
                String::new(),
                "usage: awk [-F fs][-v var=value] ['prog' | -f progfile] [file ...]\n".to_string(),
                2,
            );
        }

        let program = match parse(&source) {
            Ok(program) => program,
            Err(message) => {
                return CommandResult::with_exit_code(
                    String::new(),
                    format!("awk: syntax error: {}\n", message),
                    2,
                );
            }
        };

        let mut awk_ctx = AwkContext::with_fs(&fs).with_fs_handle(
            std::sync::Arc::new(crate::interpreter::sync_fs_adapter::SyncFsAdapter::new(
                ctx.fs.clone(),
                tokio::runtime::Handle::current(),
            )),
            &ctx.cwd,
        );
        if let Some(exec_fn) = ctx.exec_fn.clone() {
            awk_ctx = awk_ctx.with_exec_handle(
                exec_fn,
                tokio::runtime::Handle::current(),
                ctx.fs.clone(),
            );
        }
        for (key, value) in &ctx.env {
            awk_ctx.environ.insert(key.clone(), value.clone());
        }
        for (name, value) in &assignments {
            set_variable(&mut awk_ctx, name, value);
        }

        awk_ctx.argc = files.len() + 1;
        awk_ctx.argv.insert("0".to_string(), "awk".to_string());
        for (idx, file) in files.iter().enumerate() {
            awk_ctx.argv.insert((idx + 1).to_string(), file.clone());
        }

        let mut interpreter = AwkInterpreter::new(awk_ctx, program);
        interpreter.execute_begin();

        let mut stderr = String::new();
        if interpreter.get_context().limit_exceeded {
            stderr.push_str("awk: maximum loop iteration count exceeded (possible infinite loop)\n");
        }
        if interpreter.get_context().should_exit {
            interpreter.execute_end();
            flush_pipe_sinks(interpreter.get_context_mut());
            for err in &interpreter.get_context().io_errors {
                stderr.push_str(err);
                stderr.push('\n');
            }
            return CommandResult::with_exit_code(
                interpreter.get_output().to_string(),
                stderr,
                interpreter.get_exit_code(),
            );
        }

        let sources: Vec<String> = if files.is_empty() {
            vec![ctx.stdin.clone()]
        } else {
            let mut contents = Vec::new();
            for file in &files {
                if file == "-" {
                    contents.push(ctx.stdin.clone());
                    continue;
                }
                let resolved = ctx.fs.resolve_path(&ctx.cwd, file);
                match ctx.fs.read_file(&resolved).await {
                    Ok(content) => contents.push(content),
                    Err(_) => {
                        stderr.push_str(&format!("awk: can't open file {}\n", file));
                        continue;
                    }
                }
            }
            contents
        };

        'files: for content in &sources {
            interpreter.get_context_mut().fnr = 0;
            for line in split_lines(content) {
                interpreter.execute_line(line);
                if interpreter.get_context().should_exit {
                    break 'files;
                }
            }
        }

        interpreter.execute_end();
        flush_pipe_sinks(interpreter.get_context_mut());

        if interpreter.get_context().limit_exceeded {
            stderr.push_str("awk: maximum loop iteration count exceeded (possible infinite loop)\n");
        }
        for err in &interpreter.get_context().io_errors {
            stderr.push_str(err);
            stderr.push('\n');
        }

        CommandResult::with_exit_code(
            interpreter.get_output().to_string(),
            stderr,
            interpreter.get_exit_code(),
        )
    }
}

fn unescape_fs(raw: &str) -> String {
    if raw == "\\t" {
        "\t".to_string()
    } else {
        raw.to_string()
    }
}

fn split_lines(content: &str) -> Vec<&str> {
    let trimmed = content.strip_suffix('\n').unwrap_or(content);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('\n').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn make_ctx(args: Vec<&str>, stdin: &str) -> CommandContext {
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn test_awk_print_field() {
        let ctx = make_ctx(vec!["{print $1}"], "a b c\nd e f\n");
        let result = AwkCommand.execute(ctx).await;
        assert_eq!(result.stdout, "a\nd\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_awk_field_separator() {
        let ctx = make_ctx(vec!["-F", ":", "{print $2}"], "root:x:0\n");
        let result = AwkCommand.execute(ctx).await;
        assert_eq!(result.stdout, "x\n");
    }

    #[tokio::test]
    async fn test_awk_v_assignment() {
        let ctx = make_ctx(vec!["-v", "n=5", "BEGIN{print n+1}"], "");
        let result = AwkCommand.execute(ctx).await;
        assert_eq!(result.stdout, "6\n");
    }

    #[tokio::test]
    async fn test_awk_begin_infinite_loop_hits_execution_limit() {
        let ctx = make_ctx(vec!["BEGIN{while(1){i++}}"], "");
        let result = AwkCommand.execute(ctx).await;
        assert_eq!(result.exit_code, crate::interpreter::errors::ExecutionLimitError::EXIT_CODE);
        assert!(result.stderr.contains("maximum loop iteration count exceeded"));
    }

    #[tokio::test]
    async fn test_awk_missing_program() {
        let ctx = make_ctx(vec![], "");
        let result = AwkCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 2);
    }
}
