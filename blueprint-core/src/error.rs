//! Error Types
//!
//! Every fallible blueprint operation returns [`BlueprintError`]. The
//! variants are programming-invariant violations rather than transient
//! faults: they abort the triggering call and are never retried.

use thiserror::Error;

use crate::graph::{NodeId, NodeKind};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BlueprintError>;

/// Errors raised by the blueprint state core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlueprintError {
    /// The requested node id is absent from the node table.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// The node exists but is not of the expected kind.
    #[error("node {id} is a {found:?} node, expected {expected:?}")]
    NodeTypeMismatch {
        id: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },

    /// A variable has no attachments when its canonical control is read.
    #[error("variable {0} is not attached to any control")]
    EmptyVariable(NodeId),

    /// The control cannot be bound by a variable of this program.
    #[error("control {control_id} is outside the scope of program {program_id}")]
    ControlOutOfScope {
        control_id: NodeId,
        program_id: NodeId,
    },

    /// A choice was requested for an option index the control does not have.
    #[error("control {control_id} has {len} options, index {index} is out of range")]
    OptionIndexOutOfRange {
        control_id: NodeId,
        index: usize,
        len: usize,
    },

    /// A single change kept fanning out past the configured step limit.
    #[error("change propagation exceeded {limit} steps")]
    PropagationLimitExceeded { limit: usize },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_message_names_both_kinds() {
        let err = BlueprintError::NodeTypeMismatch {
            id: NodeId::from(7),
            expected: NodeKind::Control,
            found: NodeKind::Variable,
        };
        assert_eq!(err.to_string(), "node 7 is a Variable node, expected Control");
    }
}
