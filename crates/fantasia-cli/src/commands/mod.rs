//! CLI command handlers. Each handler returns a process exit code.

pub mod init_config;
pub mod initialize;
pub mod run;
