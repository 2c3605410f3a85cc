// src/commands/base64_cmd/mod.rs
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct Base64Command;

/// Read binary data from files or stdin.
/// Returns concatenated bytes from all sources.
async fn read_input(ctx: &CommandContext, files: &[String]) -> Result<Vec<u8>, CommandResult> {
    // No files or single "-" means read from stdin
    if files.is_empty() || (files.len() == 1 && files[0] == "-") {
        return Ok(ctx.stdin.as_bytes().to_vec());
    }

    let mut result = Vec::new();
    for file in files {
        if file == "-" {
            result.extend_from_slice(ctx.stdin.as_bytes());
            continue;
        }
        let path = ctx.fs.resolve_path(&ctx.cwd, file);
        match ctx.fs.read_file_buffer(&path).await {
            Ok(data) => result.extend_from_slice(&data),
            Err(_) => {
                return Err(CommandResult::error(format!(
                    "base64: {}: No such file or directory\n",
                    file
                )));
            }
        }
    }
    Ok(result)
}

#[async_trait]
impl Command for Base64Command {
    fn name(&self) -> &'static str {
        "base64"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let args = &ctx.args;

        // Check --help
        if args.iter().any(|a| a == "--help") {
            return CommandResult::success(
                "Usage: base64 [OPTION]... [FILE]\n\
                 base64 encode/decode data and print to standard output.\n\n\
                 Options:\n\
                   -d, --decode    decode data\n\
                   -w, --wrap=COLS wrap encoded lines after COLS character (default 76, 0 to disable)\n\
                       --help      display this help and exit\n"
                    .to_string(),
            );
        }

        // Parse arguments
        let mut decode = false;
        let mut wrap_cols: usize = 76;
        let mut files: Vec<String> = Vec::new();

        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            match arg.as_str() {
                "-d" | "--decode" => decode = true,
                "-w" => {
                    if i + 1 < args.len() {
                        i += 1;
                        match args[i].parse::<usize>() {
                            Ok(n) => wrap_cols = n,
                            Err(_) => {
                                return CommandResult::error(format!(
                                    "base64: invalid wrap size: '{}'\n",
                                    args[i]
                                ));
                            }
                        }
                    }
                }
                _ if arg.starts_with("--wrap=") => {
                    let val = &arg["--wrap=".len()..];
                    match val.parse::<usize>() {
                        Ok(n) => wrap_cols = n,
                        Err(_) => {
                            return CommandResult::error(format!(
                                "base64: invalid wrap size: '{}'\n",
                                val
                            ));
                        }
                    }
                }
                _ => {
                    files.push(arg.clone());
                }
            }
            i += 1;
        }

        let data = match read_input(&ctx, &files).await {
            Ok(d) => d,
            Err(e) => return e,
        };

        if decode {
            // Decode: strip whitespace, then decode base64
            let input = String::from_utf8_lossy(&data);
            let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
            match STANDARD.decode(&cleaned) {
                Ok(decoded) => {
                    // Output decoded bytes as a string (lossy for binary)
                    let output = String::from_utf8_lossy(&decoded).to_string();
                    CommandResult::success(output)
                }
                Err(_) => CommandResult::error("base64: invalid input\n".to_string()),
            }
        } else {
            // Encode
            let mut encoded = STANDARD.encode(&data);

            if wrap_cols > 0 && !encoded.is_empty() {
                let mut wrapped = String::new();
                let chars: Vec<char> = encoded.chars().collect();
                for chunk in chars.chunks(wrap_cols) {
                    let line: String = chunk.iter().collect();
                    wrapped.push_str(&line);
                    wrapped.push('\n');
                }
                encoded = wrapped;
            }

            CommandResult::success(encoded)
        }
    }
}
