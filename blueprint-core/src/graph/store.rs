//! Node Store
//!
//! The [`Blueprint`] owns every node in a flat table keyed by [`NodeId`].
//! Parent and child links are maintained together on insertion and removal,
//! so the tree is never derived ad hoc.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use super::node::{
    ControlNode, Node, NodeData, NodeId, NodeKind, OperationNode, ProgramNode, Rect, VariableNode,
};
use crate::config::BlueprintConfig;
use crate::error::{BlueprintError, Result};
use crate::value::{StandardCodec, ValueCodec};

/// The blueprint state: node table, root program and value codec.
#[derive(Debug, Clone)]
pub struct Blueprint {
    /// All nodes, indexed by ID, in insertion order.
    nodes: IndexMap<NodeId, Node>,

    /// The single program without an outer scope.
    root_program_id: Option<NodeId>,

    /// Next id handed out by `add_node`.
    next_id: u64,

    pub(crate) config: BlueprintConfig,
    pub(crate) codec: Arc<dyn ValueCodec>,
}

impl Blueprint {
    /// Create an empty blueprint with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BlueprintConfig::default())
    }

    /// Create an empty blueprint with the given configuration.
    pub fn with_config(config: BlueprintConfig) -> Self {
        Self {
            nodes: IndexMap::new(),
            root_program_id: None,
            next_id: 0,
            config,
            codec: Arc::new(StandardCodec),
        }
    }

    /// Replace the value codec.
    pub fn with_codec(mut self, codec: Arc<dyn ValueCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &BlueprintConfig {
        &self.config
    }

    pub fn codec(&self) -> &dyn ValueCodec {
        self.codec.as_ref()
    }

    pub fn root_program_id(&self) -> Option<NodeId> {
        self.root_program_id
    }

    /// The id the next inserted node will receive.
    pub fn next_node_id(&self) -> NodeId {
        NodeId::from(self.next_id)
    }

    /// Insert a node below `parent_id` and return its id.
    ///
    /// Only programs may be inserted without a parent. The first such
    /// program becomes the root.
    pub fn add_node(
        &mut self,
        parent_id: Option<NodeId>,
        frame: Option<Rect>,
        data: NodeData,
    ) -> Result<NodeId> {
        let kind = data.kind();
        let id = self.next_node_id();

        let order = match parent_id {
            Some(parent_id) => self.node(parent_id)?.child_ids.len() as i32,
            None => {
                if kind != NodeKind::Program {
                    return Err(BlueprintError::NodeTypeMismatch {
                        id,
                        expected: NodeKind::Program,
                        found: kind,
                    });
                }
                0
            }
        };

        let mut node = Node::new(id, parent_id, frame, data);
        node.order = order;

        if let Some(parent_id) = parent_id {
            self.node_mut(parent_id)?.child_ids.push(id);
        } else if self.root_program_id.is_none() {
            self.root_program_id = Some(id);
        }

        self.nodes.insert(id, node);
        self.next_id += 1;

        debug!(node = %id, ?kind, parent = ?parent_id.map(|p| p.raw()), "added node");
        Ok(id)
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(BlueprintError::NodeNotFound(id))
    }

    /// Look up a node by id for mutation.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(BlueprintError::NodeNotFound(id))
    }

    /// Look up a node and check its kind.
    pub fn node_of_kind(&self, id: NodeId, kind: NodeKind) -> Result<&Node> {
        self.node(id)?.expect_kind(kind)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Children of a node, optionally filtered by kind, in child order.
    pub fn node_children(&self, parent_id: NodeId, kind: Option<NodeKind>) -> Result<Vec<&Node>> {
        let parent = self.node(parent_id)?;
        parent
            .child_ids
            .iter()
            .map(|child_id| self.node(*child_id))
            .filter(|child| match (child, kind) {
                (Ok(child), Some(kind)) => child.kind() == kind,
                _ => true,
            })
            .collect()
    }

    pub fn program(&self, id: NodeId) -> Result<&ProgramNode> {
        self.node(id)?.as_program()
    }

    pub fn operation(&self, id: NodeId) -> Result<&OperationNode> {
        self.node(id)?.as_operation()
    }

    pub fn operation_mut(&mut self, id: NodeId) -> Result<&mut OperationNode> {
        self.node_mut(id)?.as_operation_mut()
    }

    pub fn control(&self, id: NodeId) -> Result<&ControlNode> {
        self.node(id)?.as_control()
    }

    pub fn control_mut(&mut self, id: NodeId) -> Result<&mut ControlNode> {
        self.node_mut(id)?.as_control_mut()
    }

    pub fn variable(&self, id: NodeId) -> Result<&VariableNode> {
        self.node(id)?.as_variable()
    }

    pub fn variable_mut(&mut self, id: NodeId) -> Result<&mut VariableNode> {
        self.node_mut(id)?.as_variable_mut()
    }

    /// Iterate over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the total number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Remove a node and its whole subtree.
    ///
    /// Removed controls are detached from every variable. A variable left
    /// without attachments is removed as well, and bindings pointing at
    /// removed variables are cleared.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let parent_id = self.node(id)?.parent_id;

        let mut removed = HashSet::new();
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            if let Some(node) = self.nodes.shift_remove(&node_id) {
                stack.extend(node.child_ids.iter().copied());
                removed.insert(node_id);
            }
        }

        if let Some(parent) = parent_id.and_then(|parent_id| self.nodes.get_mut(&parent_id)) {
            parent.child_ids.retain(|child_id| *child_id != id);
        }
        if self.root_program_id.is_some_and(|root| removed.contains(&root)) {
            self.root_program_id = None;
        }

        debug!(node = %id, count = removed.len(), "removed subtree");
        self.prune_references(removed);
        Ok(())
    }

    /// Drop attachments and bindings that point at removed nodes, removing
    /// variables that end up empty. Repeats until nothing else is pruned.
    fn prune_references(&mut self, mut removed: HashSet<NodeId>) {
        while !removed.is_empty() {
            let mut emptied = Vec::new();

            for node in self.nodes.values_mut() {
                match &mut node.data {
                    NodeData::Variable(variable) => {
                        variable.attachment_ids.retain(|id| !removed.contains(id));
                        if variable.attachment_ids.is_empty() {
                            emptied.push(node.id);
                        }
                    }
                    NodeData::Control(control) => {
                        if control.attached_variable_id.is_some_and(|v| removed.contains(&v)) {
                            control.attached_variable_id = None;
                        }
                        if control.attached_intern_variable_id.is_some_and(|v| removed.contains(&v)) {
                            control.attached_intern_variable_id = None;
                        }
                    }
                    NodeData::Operation(operation) => {
                        operation.priority_control_ids.retain(|id| !removed.contains(id));
                    }
                    NodeData::Program(_) => {}
                }
            }

            removed = HashSet::new();
            for variable_id in emptied {
                if let Some(node) = self.nodes.shift_remove(&variable_id) {
                    if let Some(parent) = node.parent_id.and_then(|p| self.nodes.get_mut(&p)) {
                        parent.child_ids.retain(|child_id| *child_id != variable_id);
                    }
                    info!(variable = %variable_id, "removed variable without attachments");
                    removed.insert(variable_id);
                }
            }
        }
    }
}

impl Default for Blueprint {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> NodeData {
        NodeData::Program(ProgramNode::default())
    }

    fn control() -> NodeData {
        NodeData::Control(ControlNode::default())
    }

    #[test]
    fn add_and_remove_nodes() {
        let mut blueprint = Blueprint::new();

        let root = blueprint.add_node(None, None, program()).unwrap();
        let a = blueprint.add_node(Some(root), None, control()).unwrap();
        let b = blueprint.add_node(Some(root), None, control()).unwrap();

        assert_eq!(blueprint.root_program_id(), Some(root));
        assert_eq!(blueprint.node_count(), 3);
        assert_eq!(blueprint.node(root).unwrap().child_ids(), &[a, b]);
        assert_eq!(blueprint.node(b).unwrap().order, 1);

        blueprint.remove_node(a).unwrap();
        assert_eq!(blueprint.node_count(), 2);
        assert_eq!(blueprint.node(a).unwrap_err(), BlueprintError::NodeNotFound(a));
        assert_eq!(blueprint.node(root).unwrap().child_ids(), &[b]);
    }

    #[test]
    fn ids_are_allocated_sequentially() {
        let mut blueprint = Blueprint::new();
        let expected = blueprint.next_node_id();
        let root = blueprint.add_node(None, None, program()).unwrap();
        assert_eq!(root, expected);
        assert_eq!(blueprint.next_node_id(), NodeId::from(root.raw() + 1));
    }

    #[test]
    fn only_programs_may_be_parentless() {
        let mut blueprint = Blueprint::new();
        let err = blueprint.add_node(None, None, control()).unwrap_err();
        assert!(matches!(
            err,
            BlueprintError::NodeTypeMismatch { expected: NodeKind::Program, found: NodeKind::Control, .. }
        ));
        assert_eq!(blueprint.node_count(), 0);
    }

    #[test]
    fn missing_parent_is_not_found() {
        let mut blueprint = Blueprint::new();
        let missing = NodeId::from(42);
        assert_eq!(
            blueprint.add_node(Some(missing), None, control()).unwrap_err(),
            BlueprintError::NodeNotFound(missing)
        );
    }

    #[test]
    fn children_filter_by_kind() {
        let mut blueprint = Blueprint::new();
        let root = blueprint.add_node(None, None, program()).unwrap();
        let nested = blueprint.add_node(Some(root), None, program()).unwrap();
        let c = blueprint.add_node(Some(root), None, control()).unwrap();

        let controls: Vec<NodeId> = blueprint
            .node_children(root, Some(NodeKind::Control))
            .unwrap()
            .iter()
            .map(|node| node.id())
            .collect();
        assert_eq!(controls, vec![c]);
        assert_eq!(blueprint.node_children(root, None).unwrap().len(), 2);
        assert!(blueprint.program(nested).is_ok());
    }

    #[test]
    fn removing_subtree_removes_descendants() {
        let mut blueprint = Blueprint::new();
        let root = blueprint.add_node(None, None, program()).unwrap();
        let nested = blueprint.add_node(Some(root), None, program()).unwrap();
        let inner = blueprint.add_node(Some(nested), None, control()).unwrap();

        blueprint.remove_node(nested).unwrap();
        assert!(!blueprint.contains(nested));
        assert!(!blueprint.contains(inner));
        assert!(blueprint.node(root).unwrap().child_ids().is_empty());
    }
}
