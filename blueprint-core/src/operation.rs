//! Programs and Operations
//!
//! Scope and computational-unit nodes. The executor running operations
//! lives outside the core; it reads `request_version` and
//! `priority_control_ids` and reports back through [`Blueprint::set_operation_state`].

use tracing::debug;

use crate::error::{BlueprintError, Result};
use crate::graph::{
    unique_unshift, Blueprint, NodeData, NodeId, NodeKind, OperationNode, OperationState,
    ProgramNode, Rect,
};

impl Blueprint {
    /// Add a program. Without a parent the program is the root (if there
    /// is none yet), otherwise it is nested in the given program.
    pub fn add_program_node(
        &mut self,
        parent_id: Option<NodeId>,
        frame: Option<Rect>,
        label: &str,
    ) -> Result<NodeId> {
        if let Some(parent_id) = parent_id {
            self.node_of_kind(parent_id, NodeKind::Program)?;
        }
        let program = ProgramNode {
            label: label.to_string(),
        };
        self.add_node(parent_id, frame, NodeData::Program(program))
    }

    /// Add a ready operation to a program.
    pub fn add_operation_node(
        &mut self,
        program_id: NodeId,
        name: &str,
        frame: Option<Rect>,
    ) -> Result<NodeId> {
        self.node_of_kind(program_id, NodeKind::Program)?;
        let operation = OperationNode {
            name: name.to_string(),
            label: crate::names::capital_case(name),
            ..OperationNode::default()
        };
        self.add_node(Some(program_id), frame, NodeData::Operation(operation))
    }

    /// Set the lifecycle state of an operation.
    pub fn set_operation_state(&mut self, operation_id: NodeId, state: OperationState) -> Result<()> {
        let operation = self.operation_mut(operation_id)?;
        if operation.state != state {
            debug!(operation = %operation_id, from = ?operation.state, to = ?state, "operation state");
            operation.state = state;
        }
        Ok(())
    }

    /// Record an externally sourced change of one of the operation's
    /// controls: busy, new request version, control first in priority.
    pub(crate) fn request_operation_update(
        &mut self,
        operation_id: NodeId,
        control_id: NodeId,
    ) -> Result<()> {
        self.set_operation_state(operation_id, OperationState::Busy)?;
        let operation = self.operation_mut(operation_id)?;
        operation.request_version = operation.request_version.saturating_add(1);
        unique_unshift(&mut operation.priority_control_ids, control_id);
        Ok(())
    }

    /// The program an operation belongs to.
    pub fn operation_program_id(&self, operation_id: NodeId) -> Result<NodeId> {
        let node = self.node_of_kind(operation_id, NodeKind::Operation)?;
        node.parent_id().ok_or(BlueprintError::NodeNotFound(operation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_parentless_program_is_root() {
        let mut blueprint = Blueprint::new();
        let root = blueprint.add_program_node(None, None, "Main").unwrap();
        let nested = blueprint.add_program_node(Some(root), None, "Nested").unwrap();

        assert_eq!(blueprint.root_program_id(), Some(root));
        assert_eq!(blueprint.program(nested).unwrap().label, "Nested");
        assert_eq!(blueprint.node(nested).unwrap().parent_id(), Some(root));
    }

    #[test]
    fn operations_require_a_program() {
        let mut blueprint = Blueprint::new();
        let root = blueprint.add_program_node(None, None, "Main").unwrap();
        let op = blueprint.add_operation_node(root, "caesarCipher", None).unwrap();

        let operation = blueprint.operation(op).unwrap();
        assert_eq!(operation.label, "Caesar Cipher");
        assert_eq!(operation.state, OperationState::Ready);
        assert_eq!(operation.request_version, 0);
        assert_eq!(blueprint.operation_program_id(op).unwrap(), root);

        assert!(matches!(
            blueprint.add_operation_node(op, "nested", None),
            Err(BlueprintError::NodeTypeMismatch { expected: NodeKind::Program, .. })
        ));
    }

    #[test]
    fn update_requests_bump_version_and_priority() {
        let mut blueprint = Blueprint::new();
        let root = blueprint.add_program_node(None, None, "Main").unwrap();
        let op = blueprint.add_operation_node(root, "hash", None).unwrap();
        let (a, b) = (NodeId::from(100), NodeId::from(101));

        blueprint.request_operation_update(op, a).unwrap();
        blueprint.request_operation_update(op, b).unwrap();
        blueprint.request_operation_update(op, a).unwrap();

        let operation = blueprint.operation(op).unwrap();
        assert_eq!(operation.state, OperationState::Busy);
        assert_eq!(operation.request_version, 3);
        assert_eq!(operation.priority_control_ids.as_slice(), &[a, b]);

        blueprint.set_operation_state(op, OperationState::Ready).unwrap();
        assert_eq!(blueprint.operation(op).unwrap().state, OperationState::Ready);
    }
}
