//! Exit-code mapping for the CLI.
//!
//! Configuration and input problems exit with 2 so wrappers can tell "fix
//! your config" apart from "the run failed" (1). Success is 0.

use fantasia_core::CoreError;
use fantasia_pipeline::PipelineError;

/// Exit code for a fatal pipeline error.
#[must_use]
pub fn exit_code_for(error: &PipelineError) -> i32 {
    match error {
        PipelineError::Core(CoreError::ConfigError(_) | CoreError::UnknownModel { .. }) => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_2() {
        let e = PipelineError::Core(CoreError::ConfigError("bad".into()));
        assert_eq!(exit_code_for(&e), 2);
    }

    #[test]
    fn run_errors_exit_with_1() {
        let e = PipelineError::TotalEmbeddingFailure { total: 3 };
        assert_eq!(exit_code_for(&e), 1);
    }
}
