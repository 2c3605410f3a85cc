// src/commands/paste/mod.rs
use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct PasteCommand;

#[async_trait]
impl Command for PasteCommand {
    fn name(&self) -> &'static str {
        "paste"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.args.iter().any(|a| a == "--help") {
            return CommandResult::success(
                "Usage: paste [OPTION]... [FILE]...\n\n\
                 Merge lines of files side-by-side.\n\n\
                 Options:\n\
                   -d, --delimiters=LIST  use characters from LIST instead of TABs\n\
                   -s, --serial           paste one file at a time instead of in parallel\n\
                       --help             display this help and exit\n"
                    .to_string(),
            );
        }

        let mut delimiters: Vec<char> = vec!['\t'];
        let mut serial = false;
        let mut files: Vec<String> = Vec::new();
        let mut i = 0;
        let args = &ctx.args;

        while i < args.len() {
            let arg = &args[i];
            if arg == "-s" || arg == "--serial" {
                serial = true;
            } else if arg == "-d" {
                // -d LIST (separate argument)
                i += 1;
                if i < args.len() {
                    delimiters = args[i].chars().collect();
                    if delimiters.is_empty() {
                        delimiters = vec!['\t'];
                    }
                }
            } else if arg.starts_with("-d") {
                // -dLIST (combined)
                let list = &arg[2..];
                delimiters = list.chars().collect();
                if delimiters.is_empty() {
                    delimiters = vec!['\t'];
                }
            } else if arg.starts_with("--delimiters=") {
                let list = &arg["--delimiters=".len()..];
                delimiters = list.chars().collect();
                if delimiters.is_empty() {
                    delimiters = vec!['\t'];
                }
            } else if !arg.starts_with('-') || arg == "-" {
                files.push(arg.clone());
            }
            i += 1;
        }

        if files.is_empty() {
            return CommandResult::error(
                "paste: missing operand\n".to_string(),
            );
        }

        // Read all file contents
        let mut file_contents: Vec<String> = Vec::new();
        for file in &files {
            if file == "-" {
                file_contents.push(ctx.stdin.clone());
            } else {
                let path = ctx.fs.resolve_path(&ctx.cwd, file);
                match ctx.fs.read_file(&path).await {
                    Ok(c) => file_contents.push(c),
                    Err(_) => {
                        return CommandResult::error(format!(
                            "paste: {}: No such file or directory\n",
                            file
                        ));
                    }
                }
            }
        }

        let mut output = String::new();

        if serial {
            // Serial mode: join all lines of each file into one line
            for content in &file_contents {
                let lines: Vec<&str> = content.lines().collect();
                for (j, line) in lines.iter().enumerate() {
                    output.push_str(line);
                    if j < lines.len() - 1 {
                        let delim_idx = j % delimiters.len();
                        output.push(delimiters[delim_idx]);
                    }
                }
                output.push('\n');
            }
        } else {
            // Parallel mode: merge corresponding lines
            let file_lines: Vec<Vec<&str>> = file_contents
                .iter()
                .map(|c| c.lines().collect::<Vec<&str>>())
                .collect();
            let max_lines = file_lines.iter().map(|l| l.len()).max().unwrap_or(0);

            for line_idx in 0..max_lines {
                for (file_idx, lines) in file_lines.iter().enumerate() {
                    if file_idx > 0 {
                        let delim_idx = (file_idx - 1) % delimiters.len();
                        output.push(delimiters[delim_idx]);
                    }
                    if line_idx < lines.len() {
                        output.push_str(lines[line_idx]);
                    }
                }
                output.push('\n');
            }
        }

        CommandResult::success(output)
    }
}
