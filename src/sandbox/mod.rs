pub mod types;
pub mod sandbox;

pub use types::{SandboxOptions, SandboxCommand, RunCommandOptions, FileContent, FileEncoding, OutputMessage, OutputType};
pub use sandbox::Sandbox;
