//! Engine error types
//!
//! Every fallible operation in the engine returns [`Result<T>`]. Errors carry a
//! machine-readable code (e.g. `DIVISION_BY_ZERO`) alongside the message so
//! callers can match on the failure without parsing text.
//!
//! Failures raised inside component hooks or child traversals are not
//! propagated: the scene graph routes them through [`isolate`], which logs and
//! swallows them so one broken node cannot halt the frame.

use thiserror::Error;

use crate::scene::{ComponentId, NodeId};

/// Broad classification of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad argument value or shape
    Validation,
    /// A required collaborator (device, node, component) is missing or busy
    Resource,
    /// Arithmetic that would otherwise produce infinity or NaN
    Arithmetic,
}

/// Main error type for the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// An argument was rejected at the boundary of an operation
    #[error("{message} ({code})")]
    Validation {
        /// Machine-readable error code
        code: &'static str,
        /// Human readable description
        message: String,
    },

    /// A collaborator needed by the operation is unavailable
    #[error("{message} ({code})")]
    Resource {
        /// Machine-readable error code
        code: &'static str,
        /// Human readable description
        message: String,
    },

    /// Division by zero and friends
    #[error("{message} ({code})")]
    Arithmetic {
        /// Machine-readable error code
        code: &'static str,
        /// Human readable description
        message: String,
    },

    /// The node id is stale or was never issued by this graph
    #[error("Node {0:?} not found (NODE_NOT_FOUND)")]
    NodeNotFound(NodeId),

    /// The component id is stale or the component is detached
    #[error("Component {0:?} not found (COMPONENT_NOT_FOUND)")]
    ComponentNotFound(ComponentId),

    /// Attaching the child would make a node its own ancestor
    #[error("Attaching {child:?} under {parent:?} would create a cycle (HIERARCHY_CYCLE)")]
    HierarchyCycle {
        /// Node that was about to become the parent
        parent: NodeId,
        /// Node that was about to become the child
        child: NodeId,
    },

    /// Shader stage failed to compile
    #[error("{stage} shader compile error: {log} (SHADER_COMPILE_ERROR)")]
    ShaderCompile {
        /// Stage name ("Vertex" or "Fragment")
        stage: &'static str,
        /// Driver info log
        log: String,
    },

    /// Shader program failed to link
    #[error("Shader program link error: {0} (SHADER_LINK_ERROR)")]
    ShaderLink(String),

    /// Configuration could not be parsed
    #[error("Config error: {0} (CONFIG_ERROR)")]
    Config(String),
}

impl EngineError {
    /// Build a validation error
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    /// Build a resource error
    pub fn resource(code: &'static str, message: impl Into<String>) -> Self {
        Self::Resource {
            code,
            message: message.into(),
        }
    }

    /// Build an arithmetic error
    pub fn arithmetic(code: &'static str, message: impl Into<String>) -> Self {
        Self::Arithmetic {
            code,
            message: message.into(),
        }
    }

    /// Machine-readable code of this error
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. }
            | Self::Resource { code, .. }
            | Self::Arithmetic { code, .. } => code,
            Self::NodeNotFound(_) => "NODE_NOT_FOUND",
            Self::ComponentNotFound(_) => "COMPONENT_NOT_FOUND",
            Self::HierarchyCycle { .. } => "HIERARCHY_CYCLE",
            Self::ShaderCompile { .. } => "SHADER_COMPILE_ERROR",
            Self::ShaderLink(_) => "SHADER_LINK_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Broad classification of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::HierarchyCycle { .. } | Self::Config(_) => {
                ErrorKind::Validation
            }
            Self::Arithmetic { .. } => ErrorKind::Arithmetic,
            Self::Resource { .. }
            | Self::NodeNotFound(_)
            | Self::ComponentNotFound(_)
            | Self::ShaderCompile { .. }
            | Self::ShaderLink(_) => ErrorKind::Resource,
        }
    }
}

/// Alias for `Result<T, EngineError>`
pub type Result<T> = std::result::Result<T, EngineError>;

/// Reject non-finite values with a validation error carrying `code`
pub(crate) fn ensure_finite(values: &[f32], code: &'static str, what: &str) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(EngineError::validation(
            code,
            format!("{what} must be finite numbers, got {values:?}"),
        ))
    }
}

/// Run-and-swallow boundary used by the scene traversals.
///
/// On failure the error is logged together with the scope description and
/// `None` is returned; the caller carries on with the next sibling.
pub fn isolate<T>(result: Result<T>, scope: impl FnOnce() -> String) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            log::error!("{}: {err}", scope());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_kinds() {
        let err = EngineError::arithmetic("DIVISION_BY_ZERO", "division by zero");
        assert_eq!(err.code(), "DIVISION_BY_ZERO");
        assert_eq!(err.kind(), ErrorKind::Arithmetic);

        let err = EngineError::ShaderLink("bad varying".into());
        assert_eq!(err.code(), "SHADER_LINK_ERROR");
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(err.to_string().contains("bad varying"));
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite(&[1.0, -2.0, 0.0], "X", "values").is_ok());
        let err = ensure_finite(&[1.0, f32::NAN], "INVALID_X", "values").unwrap_err();
        assert_eq!(err.code(), "INVALID_X");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_isolate_swallows_errors() {
        assert_eq!(isolate(Ok(3), || "scope".into()), Some(3));
        let failed: Option<()> = isolate(
            Err(EngineError::resource("GONE", "device missing")),
            || "scope".into(),
        );
        assert!(failed.is_none());
    }
}
