use std::process::{ExitCode, Termination};

/// Outcome of a stage run that completed without a fatal error.
///
/// The wrapper scripts distinguish a clean load from one that finished but
/// left reportable conflicts behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitStatus {
    /// All records loaded or rejected individually.
    #[default]
    Clean,
    /// A new strain carried more than one colony ID; the extra colonies
    /// were reported and their annotations withheld.
    NewStrainConflict,
}

impl Termination for ExitStatus {
    fn report(self) -> ExitCode {
        match self {
            ExitStatus::Clean => ExitCode::SUCCESS,
            ExitStatus::NewStrainConflict => ExitCode::from(2),
        }
    }
}

/// Errors on the configuration surface.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid strain-info entry: {0:?}")]
    StrainInfoInvalid(String),
}
