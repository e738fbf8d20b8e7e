use std::fmt;

use crate::model::ResourceKind;

/// Errors that abort an export (or, for child resources, a subtree)
#[derive(Debug)]
pub enum ExportError {
    /// The platform rejected the API token (401/403)
    Auth {
        kind: ResourceKind,
        resource_id: String,
        status: u16,
    },

    /// The platform answered with a non-2xx status or an unusable payload
    Upstream {
        kind: ResourceKind,
        resource_id: String,
        message: String,
    },

    /// The state backend binary is missing or cannot be executed
    BackendUnavailable { command: String, message: String },

    /// Reading or writing the output directory failed
    FileSystem(String),
}

impl ExportError {
    pub fn file_system(err: anyhow::Error) -> Self {
        ExportError::FileSystem(format!("{:#}", err))
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Auth {
                kind,
                resource_id,
                status,
            } => {
                write!(
                    f,
                    "Authentication failed while fetching {} '{}' (HTTP {}): check the API token and realm",
                    kind, resource_id, status
                )
            }
            ExportError::Upstream {
                kind,
                resource_id,
                message,
            } => {
                write!(f, "Failed to fetch {} '{}': {}", kind, resource_id, message)
            }
            ExportError::BackendUnavailable { command, message } => {
                write!(f, "State backend '{}' is unavailable: {}", command, message)
            }
            ExportError::FileSystem(msg) => {
                write!(f, "File system error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ExportError {}

/// Ways a single resource import can fail
#[derive(Debug, Clone, PartialEq)]
pub enum ImportFailure {
    /// The backend binary could not be started
    BackendUnavailable { command: String, message: String },

    /// A backend invocation exceeded the configured time limit
    BackendTimeout { command: String, seconds: u64 },

    /// `import` exited non-zero (deleted resource, type mismatch)
    ImportRejected { address: String, message: String },

    /// The address was already imported for a different resource in this run
    AddressTaken { address: String, holder: String },

    /// `state show` exited non-zero
    StateUnreadable { address: String, message: String },
}

impl ImportFailure {
    /// Only a missing backend aborts the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, ImportFailure::BackendUnavailable { .. })
    }
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportFailure::BackendUnavailable { command, message } => {
                write!(f, "Failed to run '{}': {}", command, message)
            }
            ImportFailure::BackendTimeout { command, seconds } => {
                write!(f, "'{}' did not finish within {}s", command, seconds)
            }
            ImportFailure::ImportRejected { address, message } => {
                write!(f, "Import of {} was rejected", address)?;
                if !message.is_empty() {
                    write!(f, ": {}", message)?;
                }
                Ok(())
            }
            ImportFailure::AddressTaken { address, holder } => {
                write!(f, "{} already holds resource {}", address, holder)
            }
            ImportFailure::StateUnreadable { address, message } => {
                write!(f, "Could not read state of {}", address)?;
                if !message.is_empty() {
                    write!(f, ": {}", message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ImportFailure {}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;
