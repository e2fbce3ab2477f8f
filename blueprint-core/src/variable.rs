//! Variables
//!
//! A variable binds controls of one program scope together. The first
//! attachment is the canonical control: its value is the variable's value.
//! Attachments are reordered whenever a control propagates through the
//! variable, so index 0 is always the control that last pushed a value.
//!
//! A boundary control (a program port) can be bound on both sides of its
//! program: `attached_intern_variable_id` inside, `attached_variable_id` in
//! the enclosing program. Operation controls carry no binding fields and
//! are found through the attachment lists of their program's variables.

use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use tracing::{info, warn};

use crate::control::ControlChange;
use crate::error::{BlueprintError, Result};
use crate::graph::{Blueprint, ControlNode, NodeData, NodeId, NodeKind, VariableNode};
use crate::value::SerializedValue;

/// A wire endpoint for rendering a variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireWaypoint {
    /// Whether this end pushes the value (the canonical control).
    pub push: bool,
    pub x: f64,
    pub y: f64,
    pub node_x: f64,
    pub node_y: f64,
    pub node_width: f64,
    pub node_height: f64,
}

impl Blueprint {
    /// Create a variable in `program_id` attached to `control_id`.
    pub fn add_variable(&mut self, program_id: NodeId, control_id: NodeId) -> Result<NodeId> {
        self.node_of_kind(program_id, NodeKind::Program)?;
        self.ensure_control_in_scope(control_id, program_id)?;

        let variable = VariableNode {
            attachment_ids: smallvec![control_id],
        };
        let variable_id = self.add_node(Some(program_id), None, NodeData::Variable(variable))?;
        self.bind_control(control_id, program_id, Some(variable_id))?;

        info!(variable = %variable_id, program = %program_id, control = %control_id, "added variable");
        Ok(variable_id)
    }

    /// Attach another control to a variable. The control takes the
    /// variable's current value, sourced from the variable.
    ///
    /// If that sync fails the attachment and binding are undone. Values
    /// already pushed to other controls stay.
    pub fn attach_control(&mut self, variable_id: NodeId, control_id: NodeId) -> Result<()> {
        let program_id = self.variable_program_id(variable_id)?;
        self.ensure_control_in_scope(control_id, program_id)?;

        let variable = self.variable_mut(variable_id)?;
        if variable.attachment_ids.contains(&control_id) {
            return Ok(());
        }
        variable.attachment_ids.push(control_id);

        let control = self.control(control_id)?;
        let bindings = (control.attached_variable_id, control.attached_intern_variable_id);
        self.bind_control(control_id, program_id, Some(variable_id))?;

        let value = self.variable_value(variable_id)?;
        let synced = self.change_control(control_id, ControlChange::new(variable_id).with_value(value));
        if let Err(err) = synced {
            warn!(variable = %variable_id, control = %control_id, %err, "attach failed, undoing");
            self.variable_mut(variable_id)?
                .attachment_ids
                .retain(|id| *id != control_id);
            let control = self.control_mut(control_id)?;
            (control.attached_variable_id, control.attached_intern_variable_id) = bindings;
            return Err(err);
        }
        Ok(())
    }

    /// Detach a control from a variable. Detaching the last control
    /// removes the variable.
    pub fn detach_control(&mut self, variable_id: NodeId, control_id: NodeId) -> Result<()> {
        let program_id = self.variable_program_id(variable_id)?;

        let variable = self.variable_mut(variable_id)?;
        let before = variable.attachment_ids.len();
        variable.attachment_ids.retain(|id| *id != control_id);
        if variable.attachment_ids.len() == before {
            return Ok(());
        }
        let empty = variable.attachment_ids.is_empty();

        let control = self.control_mut(control_id)?;
        if control.attached_variable_id == Some(variable_id) {
            control.attached_variable_id = None;
        }
        if control.attached_intern_variable_id == Some(variable_id) {
            control.attached_intern_variable_id = None;
        }

        if empty {
            info!(variable = %variable_id, program = %program_id, "last control detached");
            self.remove_node(variable_id)?;
        }
        Ok(())
    }

    /// Variables owned by a program.
    pub fn program_variables(&self, program_id: NodeId) -> Result<Vec<NodeId>> {
        self.node_of_kind(program_id, NodeKind::Program)?;
        Ok(self
            .node_children(program_id, Some(NodeKind::Variable))?
            .iter()
            .map(|node| node.id())
            .collect())
    }

    /// The variable a control is bound to within a program context.
    ///
    /// For a boundary control the context selects the side: its own
    /// program means the intern binding, anything else the outer one.
    pub fn control_variable(&self, control_id: NodeId, program_id: NodeId) -> Result<Option<NodeId>> {
        let node = self.node(control_id)?;
        let control = node.as_control()?;

        let owner_is_program = match node.parent_id() {
            Some(parent_id) => self.node(parent_id)?.kind() == NodeKind::Program,
            None => false,
        };

        let variable_id = if owner_is_program {
            if node.parent_id() == Some(program_id) {
                control.attached_intern_variable_id
            } else {
                control.attached_variable_id
            }
        } else {
            self.program_variables(program_id)?
                .into_iter()
                .find(|variable_id| {
                    self.variable(*variable_id)
                        .is_ok_and(|variable| variable.attachment_ids.contains(&control_id))
                })
        };

        if let Some(variable_id) = variable_id {
            self.variable(variable_id)?;
        }
        Ok(variable_id)
    }

    /// The canonical control of a variable.
    pub fn variable_control(&self, variable_id: NodeId) -> Result<&ControlNode> {
        let variable = self.variable(variable_id)?;
        let canonical = variable
            .attachment_ids
            .first()
            .ok_or(BlueprintError::EmptyVariable(variable_id))?;
        self.control(*canonical)
    }

    /// The current value of a variable.
    pub fn variable_value(&self, variable_id: NodeId) -> Result<SerializedValue> {
        Ok(self.variable_control(variable_id)?.value.clone())
    }

    /// All controls attached to a variable, canonical first.
    pub fn variable_attached_controls(&self, variable_id: NodeId) -> Result<Vec<&ControlNode>> {
        self.variable(variable_id)?
            .attachment_ids
            .iter()
            .map(|control_id| self.control(*control_id))
            .collect()
    }

    /// Wire endpoints of a variable, in attachment order.
    ///
    /// A port of the variable's own program is drawn at the port itself;
    /// any other control at the node owning it. Attachments without layout
    /// information are skipped.
    pub fn variable_wire_waypoints(&self, variable_id: NodeId) -> Result<Vec<WireWaypoint>> {
        let context_program_id = self.variable_program_id(variable_id)?;
        let variable = self.variable(variable_id)?;
        let mut waypoints = Vec::with_capacity(variable.attachment_ids.len());

        for (index, control_id) in variable.attachment_ids.iter().enumerate() {
            let control_node = self.node(*control_id)?;
            let control = control_node.as_control()?;

            let layout_node = match control_node.parent_id() {
                Some(parent_id) if parent_id != context_program_id => self.node(parent_id)?,
                _ => control_node,
            };

            if let (Some(frame), Some(outlet_x), Some(outlet_y)) =
                (layout_node.frame, control.node_outlet_x, control.node_outlet_y)
            {
                waypoints.push(WireWaypoint {
                    push: index == 0,
                    x: frame.x + outlet_x,
                    y: frame.y + outlet_y,
                    node_x: frame.x,
                    node_y: frame.y,
                    node_width: frame.width,
                    node_height: frame.height,
                });
            }
        }

        Ok(waypoints)
    }

    /// A control can join a variable of `program_id` when it belongs to one
    /// of the program's operations or is a port on either side of the
    /// program's boundary.
    fn ensure_control_in_scope(&self, control_id: NodeId, program_id: NodeId) -> Result<()> {
        let node = self.node(control_id)?;
        node.as_control()?;

        let in_scope = match node.parent_id() {
            Some(owner_id) => {
                let owner = self.node(owner_id)?;
                match owner.kind() {
                    NodeKind::Operation => self.operation_program_id(owner_id)? == program_id,
                    NodeKind::Program => {
                        owner_id == program_id || owner.parent_id() == Some(program_id)
                    }
                    _ => false,
                }
            }
            None => false,
        };

        if in_scope {
            Ok(())
        } else {
            Err(BlueprintError::ControlOutOfScope {
                control_id,
                program_id,
            })
        }
    }

    fn variable_program_id(&self, variable_id: NodeId) -> Result<NodeId> {
        let node = self.node_of_kind(variable_id, NodeKind::Variable)?;
        node.parent_id().ok_or(BlueprintError::NodeNotFound(variable_id))
    }

    /// Record a binding on a boundary control. Operation controls are left
    /// untouched.
    fn bind_control(
        &mut self,
        control_id: NodeId,
        program_id: NodeId,
        variable_id: Option<NodeId>,
    ) -> Result<()> {
        let owner_id = self.node(control_id)?.parent_id();
        let owner_is_program = match owner_id {
            Some(owner_id) => self.node(owner_id)?.kind() == NodeKind::Program,
            None => false,
        };
        if !owner_is_program {
            return Ok(());
        }

        let control = self.control_mut(control_id)?;
        if owner_id == Some(program_id) {
            control.attached_intern_variable_id = variable_id;
        } else {
            control.attached_variable_id = variable_id;
        }
        Ok(())
    }
}
