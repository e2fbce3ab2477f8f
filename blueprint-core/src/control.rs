//! Controls
//!
//! Creation of controls and the change entry point. Every value change,
//! whether typed by a user, produced by an operation or synchronized through
//! a variable, goes through [`Blueprint::change_control`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{BlueprintError, Result};
use crate::graph::{
    Blueprint, ChangeSource, ControlNode, ControlOption, Node, NodeData, NodeId, NodeKind,
    ParentScope, PendingChange, PropagationDirectives, PropagationQueue, Rect, Visibility,
};
use crate::names::{capital_case, derive_unique_name};
use crate::value::{SerializedValue, ValueType};

/// A requested control change.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlChange {
    /// The node causing the change: the control itself, an operation or a
    /// variable.
    pub source_node_id: NodeId,

    /// The new value. `None` keeps the current value.
    pub value: Option<SerializedValue>,
}

impl ControlChange {
    pub fn new(source_node_id: NodeId) -> Self {
        Self {
            source_node_id,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<SerializedValue>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// A control as declared by a computational unit. Unset fields fall back
/// to the default control template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlDefinition {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub types: Option<Vec<ValueType>>,
    pub value: SerializedValue,
    pub options: Vec<ControlOption>,
    pub enforce_options: Option<bool>,
    pub visibility: Option<Visibility>,
    pub writable: Option<bool>,
    pub mask_preview: Option<bool>,
}

impl Blueprint {
    /// Add an empty port control to a program. The label is made unique
    /// among the program's controls.
    pub fn add_control_node(
        &mut self,
        program_id: NodeId,
        frame: Rect,
        label: Option<&str>,
    ) -> Result<&Node> {
        self.node_of_kind(program_id, NodeKind::Program)?;
        let id = self.next_node_id();

        let used: Vec<String> = self
            .node_children(program_id, Some(NodeKind::Control))?
            .into_iter()
            .map(|node| node.as_control().map(|control| control.label.clone()))
            .collect::<Result<_>>()?;
        let requested = label.unwrap_or(self.config.default_control_label.as_str());
        let label = derive_unique_name(requested, &used);

        let control = ControlNode {
            name: format!("control{id}"),
            label,
            ..ControlNode::default()
        };
        let id = self.add_node(Some(program_id), Some(frame), NodeData::Control(control))?;
        self.node(id)
    }

    /// Add a control to an operation from the operation's declaration.
    pub fn add_operation_control_node(
        &mut self,
        operation_id: NodeId,
        definition: ControlDefinition,
    ) -> Result<&Node> {
        self.node_of_kind(operation_id, NodeKind::Operation)?;

        let selected_option_index = definition
            .options
            .iter()
            .position(|option| self.codec.compare(&option.value, &definition.value));

        let template = ControlNode::default();
        let control = ControlNode {
            label: definition
                .label
                .unwrap_or_else(|| capital_case(&definition.name)),
            name: definition.name,
            description: definition.description,
            types: definition.types.unwrap_or(template.types),
            initial_value: Some(definition.value.clone()),
            value: definition.value,
            options: definition.options,
            selected_option_index,
            enforce_options: definition.enforce_options.unwrap_or(template.enforce_options),
            visibility: definition.visibility.unwrap_or(template.visibility),
            writable: definition.writable.unwrap_or(template.writable),
            mask_preview: definition.mask_preview.unwrap_or(template.mask_preview),
            ..template
        };
        let id = self.add_node(Some(operation_id), None, NodeData::Control(control))?;
        self.node(id)
    }

    /// Apply a control change and propagate it to every bound control.
    ///
    /// Changing a control to a value structurally equal to its current one
    /// has no effect at all.
    pub fn change_control(&mut self, control_id: NodeId, change: ControlChange) -> Result<()> {
        let limit = self.config.max_propagation_steps;
        let mut queue = PropagationQueue::new();
        queue.push(PendingChange {
            control_id,
            source_node_id: change.source_node_id,
            value: change.value,
        });

        while let Some(pending) = queue.pop() {
            if queue.processed() > limit {
                warn!(
                    control = %control_id,
                    limit,
                    pending = queue.len(),
                    "propagation step limit exceeded"
                );
                return Err(BlueprintError::PropagationLimitExceeded { limit });
            }
            self.apply_control_change(pending, &mut queue)?;
        }
        Ok(())
    }

    fn apply_control_change(&mut self, change: PendingChange, queue: &mut PropagationQueue) -> Result<()> {
        let PendingChange {
            control_id,
            source_node_id,
            value,
        } = change;

        let node = self.node(control_id)?;
        let control = node.as_control()?;
        let Some(value) = value else {
            trace!(control = %control_id, "change without value");
            return Ok(());
        };
        if self.codec.compare(&control.value, &value) {
            trace!(control = %control_id, "value unchanged");
            return Ok(());
        }

        let Some(parent_id) = node.parent_id() else {
            self.control_mut(control_id)?.value = value;
            return Ok(());
        };
        let parent = self.node(parent_id)?;
        let outer_scope_id = parent.parent_id();
        let scope = match parent.kind() {
            NodeKind::Operation => ParentScope::Operation,
            NodeKind::Program => ParentScope::Program {
                is_root: self.root_program_id() == Some(parent_id),
            },
            found => {
                return Err(BlueprintError::NodeTypeMismatch {
                    id: parent_id,
                    expected: NodeKind::Program,
                    found,
                })
            }
        };
        let source = self.classify_source(control_id, parent_id, source_node_id)?;
        let directives = PropagationDirectives::classify(scope, source);

        self.control_mut(control_id)?.value = value;

        debug!(
            control = %control_id,
            source_node = %source_node_id,
            ?source,
            ?directives,
            "control changed"
        );

        if directives.mark_busy {
            self.request_operation_update(parent_id, control_id)?;
        }
        if directives.outward {
            if let Some(outer_scope_id) = outer_scope_id {
                self.propagate_change(control_id, outer_scope_id, queue)?;
            }
        }
        if directives.inward {
            self.propagate_change(control_id, parent_id, queue)?;
        }
        Ok(())
    }

    fn classify_source(
        &self,
        control_id: NodeId,
        parent_id: NodeId,
        source_node_id: NodeId,
    ) -> Result<ChangeSource> {
        if source_node_id == control_id {
            return Ok(ChangeSource::SelfControl);
        }
        let source = self.node(source_node_id)?;
        Ok(match source.kind() {
            NodeKind::Operation if source_node_id == parent_id => ChangeSource::OwningOperation,
            NodeKind::Variable => {
                let control = self.control(control_id)?;
                if control.attached_intern_variable_id == Some(source_node_id) {
                    ChangeSource::InternVariable
                } else {
                    ChangeSource::OtherVariable
                }
            }
            _ => ChangeSource::Other,
        })
    }

    /// Set a control to one of its options.
    ///
    /// The selected index is recorded even if the value was already equal.
    pub fn change_control_value_to_choice(&mut self, control_id: NodeId, option_index: usize) -> Result<()> {
        let control = self.control(control_id)?;
        let option = control
            .options
            .get(option_index)
            .ok_or(BlueprintError::OptionIndexOutOfRange {
                control_id,
                index: option_index,
                len: control.options.len(),
            })?;
        let value = option.value.clone();

        self.change_control(control_id, ControlChange::new(control_id).with_value(value))?;
        self.control_mut(control_id)?.selected_option_index = Some(option_index);
        Ok(())
    }

    /// Change the type of a control value, casting the current value or
    /// falling back to the empty value of the new type.
    pub fn change_control_value_to_type(&mut self, control_id: NodeId, value_type: ValueType) -> Result<()> {
        let codec = Arc::clone(&self.codec);
        let control = self.control_mut(control_id)?;
        control.selected_option_index = None;

        if codec.identify(&control.value) == value_type {
            return Ok(());
        }
        let value = match codec.cast(&control.value, value_type) {
            Some(value) => value,
            None => {
                debug!(control = %control_id, %value_type, "cast failed, using empty value");
                codec.empty(Some(value_type))
            }
        };
        self.change_control(control_id, ControlChange::new(control_id).with_value(value))
    }

    /// Bind a control to a new variable in `program_id`.
    ///
    /// An existing binding on the same side is replaced on the control but
    /// the previous variable keeps listing the control.
    pub fn add_variable_from_control(&mut self, control_id: NodeId, program_id: NodeId) -> Result<NodeId> {
        // TODO: detach the control from its current variable in this context first
        self.add_variable(program_id, control_id)
    }
}
