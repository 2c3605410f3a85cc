use std::collections::HashMap;
use crate::interpreter::types::ExecResult;

/// Output message type (stdout or stderr)
#[derive(Debug, Clone, PartialEq)]
pub enum OutputType {
    Stdout,
    Stderr,
}

/// A single output message from command execution.
#[derive(Debug, Clone)]
pub struct OutputMessage {
    pub output_type: OutputType,
    pub data: String,
}

/// Options for creating a Sandbox.
#[derive(Debug, Default)]
pub struct SandboxOptions {
    pub cwd: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub timeout_ms: Option<u64>,
    pub max_call_depth: Option<u32>,
    pub max_command_count: Option<u64>,
    pub max_loop_iterations: Option<u64>,
}

/// Options for running a command.
#[derive(Debug, Default)]
pub struct RunCommandOptions {
    pub cwd: Option<String>,
    pub env: Option<HashMap<String, String>>,
}

/// Input for writing files.
#[derive(Debug, Clone)]
pub enum FileContent {
    Text(String),
    Encoded { content: String, encoding: FileEncoding },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileEncoding {
    Utf8,
    Base64,
}

/// Result of a completed command execution.
#[derive(Debug, Clone)]
pub struct SandboxCommand {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl SandboxCommand {
    pub fn from_exec_result(result: &ExecResult) -> Self {
        Self {
            exit_code: result.exit_code,
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
        }
    }

    /// Get combined stdout + stderr output.
    pub fn output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }

    /// Get output messages as a Vec.
    pub fn logs(&self) -> Vec<OutputMessage> {
        let mut messages = Vec::new();
        if !self.stdout.is_empty() {
            messages.push(OutputMessage {
                output_type: OutputType::Stdout,
                data: self.stdout.clone(),
            });
        }
        if !self.stderr.is_empty() {
            messages.push(OutputMessage {
                output_type: OutputType::Stderr,
                data: self.stderr.clone(),
            });
        }
        messages
    }
}
