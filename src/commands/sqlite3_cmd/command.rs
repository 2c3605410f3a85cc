// src/commands/sqlite3_cmd/command.rs
use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use crate::commands::sqlite3_cmd::engine::{execute_statement, split_statements, Database};

pub struct Sqlite3Command;

enum OutputMode {
    List,
    Csv,
    Json,
}

#[async_trait]
impl Command for Sqlite3Command {
    fn name(&self) -> &'static str {
        "sqlite3"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let args = &ctx.args;

        if args.iter().any(|a| a == "--help") {
            return CommandResult::success(
                "Usage: sqlite3 [OPTIONS] [FILENAME [SQL]]\n\n\
                 A minimal CREATE TABLE / INSERT / SELECT / DELETE / DROP TABLE\n\
                 engine persisted as JSON against the virtual filesystem.\n\n\
                 Options:\n  \
                 -header, -noheader   turn headers on or off\n  \
                 -csv                 set output mode to csv\n  \
                 -json                set output mode to json\n  \
                 -separator SEP       set output field separator\n      \
                 --help               display this help and exit\n"
                    .to_string(),
            );
        }

        let mut show_header = false;
        let mut mode = OutputMode::List;
        let mut separator = "|".to_string();
        let mut positional: Vec<String> = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-header" => show_header = true,
                "-noheader" => show_header = false,
                "-csv" => {
                    mode = OutputMode::Csv;
                    separator = ",".to_string();
                }
                "-json" => mode = OutputMode::Json,
                "-list" => mode = OutputMode::List,
                "-separator" => {
                    i += 1;
                    if i < args.len() {
                        separator = args[i].clone();
                    }
                }
                other => positional.push(other.to_string()),
            }
            i += 1;
        }

        if positional.is_empty() {
            return CommandResult::with_exit_code(
                String::new(),
                "Usage: sqlite3 [OPTIONS] FILENAME [SQL]\n".to_string(),
                1,
            );
        }

        let db_path = positional.remove(0);
        let script = if !positional.is_empty() {
            positional.join(" ")
        } else {
            ctx.stdin.clone()
        };

        let is_memory = db_path == ":memory:";
        let resolved_path = ctx.fs.resolve_path(&ctx.cwd, &db_path);

        let mut database = if is_memory {
            Database::default()
        } else {
            match ctx.fs.read_file(&resolved_path).await {
                Ok(content) => Database::from_json(&content),
                Err(_) => Database::default(),
            }
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for statement in split_statements(&script) {
            match execute_statement(&mut database, &statement) {
                Ok(outcome) => {
                    if !outcome.header.is_empty() || !outcome.rows.is_empty() {
                        stdout.push_str(&render(&outcome.header, &outcome.rows, show_header, &mode, &separator));
                    }
                }
                Err(message) => {
                    stderr.push_str(&format!("Error: {}\n", message));
                    exit_code = 1;
                    break;
                }
            }
        }

        if exit_code == 0 && !is_memory {
            if let Err(err) = ctx.fs.write_file(&resolved_path, database.to_json().as_bytes()).await {
                stderr.push_str(&format!("Error: unable to persist database: {:?}\n", err));
                exit_code = 1;
            }
        }

        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}

fn render(header: &[String], rows: &[Vec<String>], show_header: bool, mode: &OutputMode, separator: &str) -> String {
    match mode {
        OutputMode::Json => render_json(header, rows),
        OutputMode::Csv => render_delimited(header, rows, show_header, ","),
        OutputMode::List => render_delimited(header, rows, show_header, separator),
    }
}

fn render_delimited(header: &[String], rows: &[Vec<String>], show_header: bool, separator: &str) -> String {
    let mut out = String::new();
    if show_header && !header.is_empty() {
        out.push_str(&header.join(separator));
        out.push('\n');
    }
    for row in rows {
        out.push_str(&row.join(separator));
        out.push('\n');
    }
    out
}

fn render_json(header: &[String], rows: &[Vec<String>]) -> String {
    let objects: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            let mut map = serde_json::Map::new();
            for (col, value) in header.iter().zip(row.iter()) {
                map.insert(col.clone(), serde_json::Value::String(value.clone()));
            }
            serde_json::Value::Object(map)
        })
        .collect();
    format!("{}\n", serde_json::to_string(&objects).unwrap_or_else(|_| "[]".to_string()))
}
