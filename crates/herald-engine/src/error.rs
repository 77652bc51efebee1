//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup, the run itself,
//! and the post-run report, so `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: herald_core::ConfigError,
    },

    /// The `scenario` section could not be read.
    #[error("scenario error: {message}")]
    Scenario {
        /// Description of the scenario failure.
        message: String,
    },

    /// A participant could not be added to the simulation.
    #[error("setup error: {source}")]
    Setup {
        /// The underlying tick error.
        #[from]
        source: herald_core::TickError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: herald_core::RunnerError,
    },

    /// The message log could not be rendered.
    #[error("report error: {source}")]
    Report {
        /// The underlying codec error.
        #[from]
        source: herald_acl::MessageError,
    },

    /// The message log could not be written.
    #[error("failed to write message log: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use herald_core::{RunnerError, TickError};
    use herald_types::AgentId;

    use super::*;

    #[test]
    fn runner_failures_keep_their_source() {
        let err = EngineError::from(RunnerError::from(TickError::UnknownAgent(AgentId::from("R009"))));
        assert!(matches!(err, EngineError::Runner { .. }));
        assert_eq!(err.to_string(), "runner error: tick error: unknown agent: R009");
    }
}
