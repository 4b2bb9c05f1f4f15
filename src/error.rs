//! Error types for the provisioning service
//!
//! Errors are grouped by where a provisioning request can break: the caller's
//! input, the cluster API, the post-create existence check, local persistence,
//! and the cleanup that runs after any of those.

use thiserror::Error;

use crate::gateway::{GatewayError, ResourceKind};
use crate::store::StoreError;

/// Main error type for provisioning and listing operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed input, rejected before any remote call
    #[error("validation error: {0}")]
    Validation(String),

    /// The cluster API refused the request (4xx, e.g. name conflict or quota)
    #[error("cluster rejected {kind} {name} ({code}): {body}")]
    RemoteRejected {
        /// Kind of resource the call was about
        kind: ResourceKind,
        /// Resource name
        name: String,
        /// HTTP status returned by the API server
        code: u16,
        /// Message body returned by the API server
        body: String,
    },

    /// Network failure, 5xx or timeout talking to the cluster API
    #[error("cluster unavailable while handling {kind} {name}: {message}")]
    RemoteUnavailable {
        /// Kind of resource the call was about
        kind: ResourceKind,
        /// Resource name
        name: String,
        /// Transport or server error
        message: String,
    },

    /// A created resource could not be read back before the deadline
    #[error("{kind} {name} not observable after creation: {message}")]
    VerificationFailed {
        /// Kind of resource that failed verification
        kind: ResourceKind,
        /// Resource name
        name: String,
        /// Last read error seen
        message: String,
    },

    /// Local store read or write failed
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Cleanup after a failed provisioning step did not fully succeed.
    ///
    /// `cause` is the failure that triggered cleanup; it is always kept.
    #[error("{cause} (cleanup incomplete: {})", format_failures(.failures))]
    CompensationFailed {
        /// The original failure
        #[source]
        cause: Box<Error>,
        /// Resources that could not be deleted
        failures: Vec<CompensationFailure>,
    },

    /// Internal/operational error
    #[error("internal error: {0}")]
    Internal(String),
}

/// A resource left behind because its compensating delete failed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompensationFailure {
    /// Kind of the orphaned resource
    pub kind: ResourceKind,
    /// Name of the orphaned resource
    pub name: String,
    /// Why the delete failed
    pub message: String,
}

fn format_failures(failures: &[CompensationFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} {}: {}", f.kind, f.name, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map a gateway failure on a create/delete call into the caller-facing taxonomy
    pub fn from_gateway(err: GatewayError) -> Self {
        match err {
            GatewayError::Conflict { kind, name } => Self::RemoteRejected {
                kind,
                name,
                code: 409,
                body: "already exists".to_string(),
            },
            GatewayError::NotFound { kind, name } => Self::RemoteRejected {
                kind,
                name,
                code: 404,
                body: "not found".to_string(),
            },
            GatewayError::Rejected {
                kind,
                name,
                code,
                body,
            } => Self::RemoteRejected {
                kind,
                name,
                code,
                body,
            },
            GatewayError::Unavailable {
                kind,
                name,
                message,
            } => Self::RemoteUnavailable {
                kind,
                name,
                message,
            },
        }
    }

    /// The failure that started it all, looking through compensation wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::CompensationFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// True when the cluster reported that the name is already taken
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::RemoteRejected { code: 409, .. }
        )
    }
}
