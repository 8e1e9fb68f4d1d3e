use std::sync::Arc;

use crate::flags::InvalidFlagError;

/// Result type used throughout FlagForge.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can be returned by FlagForge.
///
/// Evaluation itself never fails because of a bad targeting rule (those are skipped), so most of
/// these describe a missing or unusable configuration rather than a per-request problem.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// No configuration snapshot has been stored yet.
    #[error("configuration missing")]
    ConfigurationMissing,

    /// The requested flag is not part of the active configuration.
    #[error("flag not found")]
    FlagNotFound,

    /// The flag record could not be parsed, so it cannot be evaluated. Other flags of the same
    /// configuration are unaffected.
    #[error("error parsing flag configuration")]
    ConfigurationParseError,

    /// The configuration document as a whole is not valid.
    #[error("invalid configuration document")]
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    InvalidConfiguration(#[source] Arc<serde_json::Error>),

    /// The flag definition is malformed (e.g., its default payloads do not match its type).
    #[error(transparent)]
    InvalidFlag(InvalidFlagError),

    /// A flag was requested in an environment its project does not have.
    #[error("environment {environment:?} does not exist in project {project:?}")]
    UnknownEnvironment {
        /// Requested environment.
        environment: String,
        /// Project id.
        project: String,
    },
}

impl Error {
    /// Return `true` if the error is a normal running condition (e.g., the storage collaborator
    /// has not published a snapshot yet) and the caller should silently serve its own default.
    pub fn is_normal(&self) -> bool {
        matches!(self, Error::ConfigurationMissing | Error::FlagNotFound)
    }
}

impl From<InvalidFlagError> for Error {
    fn from(value: InvalidFlagError) -> Self {
        Error::InvalidFlag(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::InvalidConfiguration(Arc::new(value))
    }
}
