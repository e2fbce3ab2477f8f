//! Change Scheduler
//!
//! The scheduler decides where a control change travels and queues the
//! resulting updates.
//!
//! # Algorithm
//!
//! 1. A change enters the queue as `(control, source, value)`.
//! 2. The control applies it (see `Blueprint::change_control`), unless the
//!    value is structurally equal to the current one.
//! 3. The pair (parent scope, change source) is classified into
//!    [`PropagationDirectives`] by a pure decision table.
//! 4. For each program context the directives name, the control's variable
//!    in that context is resolved and every other attached control is
//!    queued with the variable as source.
//! 5. The queue drains breadth-first until empty.
//!
//! Tagging the variable as source keeps a change from bouncing back across
//! the binding it arrived through, and the equality check in step 2 stops
//! the walk at every control that already holds the value.

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::node::{unique_unshift, ControlIds, NodeId};
use super::store::Blueprint;
use crate::error::Result;
use crate::value::SerializedValue;

/// The kind of node owning a changed control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentScope {
    /// The control is a parameter of an operation.
    Operation,

    /// The control is a port on a program boundary.
    Program { is_root: bool },
}

/// Where a change came from, relative to the changed control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// The control itself (a direct edit).
    SelfControl,

    /// The operation owning the control (its output).
    OwningOperation,

    /// The variable bound inside the control's own program.
    InternVariable,

    /// Any other variable, i.e. a binding in the surrounding scope.
    OtherVariable,

    /// Any other node.
    Other,
}

impl ChangeSource {
    pub fn is_variable(&self) -> bool {
        matches!(self, ChangeSource::InternVariable | ChangeSource::OtherVariable)
    }
}

/// What a change does after the control value was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropagationDirectives {
    /// Propagate into the scope around the parent (the operation's program,
    /// or the program's parent program).
    pub outward: bool,

    /// Propagate into the parent program itself.
    pub inward: bool,

    /// Mark the owning operation busy and invalidate in-flight work.
    pub mark_busy: bool,
}

impl PropagationDirectives {
    /// The directionality policy.
    pub fn classify(parent: ParentScope, source: ChangeSource) -> Self {
        match parent {
            ParentScope::Operation => Self {
                outward: !source.is_variable(),
                inward: false,
                mark_busy: source != ChangeSource::OwningOperation,
            },
            ParentScope::Program { is_root } => match source {
                ChangeSource::InternVariable => Self {
                    outward: !is_root,
                    ..Self::default()
                },
                ChangeSource::OtherVariable => Self {
                    inward: true,
                    ..Self::default()
                },
                ChangeSource::SelfControl => Self {
                    outward: !is_root,
                    inward: true,
                    mark_busy: false,
                },
                ChangeSource::OwningOperation | ChangeSource::Other => Self::default(),
            },
        }
    }
}

/// A control update waiting to be applied.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingChange {
    pub control_id: NodeId,
    pub source_node_id: NodeId,
    pub value: Option<SerializedValue>,
}

/// FIFO of pending control updates for one change.
#[derive(Debug, Default)]
pub(crate) struct PropagationQueue {
    pending: VecDeque<PendingChange>,
    processed: usize,
}

impl PropagationQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, change: PendingChange) {
        self.pending.push_back(change);
    }

    /// Take the next update, counting it as processed.
    pub(crate) fn pop(&mut self) -> Option<PendingChange> {
        let change = self.pending.pop_front()?;
        self.processed += 1;
        Some(change)
    }

    /// Number of updates taken from the queue so far.
    pub(crate) fn processed(&self) -> usize {
        self.processed
    }

    /// Updates still waiting.
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

impl Blueprint {
    /// Fan the current value of `control_id` out through its variable in
    /// the given program context.
    ///
    /// The propagating control moves to the front of the attachment list,
    /// making it the canonical control of the variable.
    pub(crate) fn propagate_change(
        &mut self,
        control_id: NodeId,
        program_id: NodeId,
        queue: &mut PropagationQueue,
    ) -> Result<()> {
        let Some(variable_id) = self.control_variable(control_id, program_id)? else {
            trace!(control = %control_id, program = %program_id, "no variable in context");
            return Ok(());
        };

        let value = self.control(control_id)?.value.clone();
        let variable = self.variable_mut(variable_id)?;
        if !variable.attachment_ids.contains(&control_id) {
            trace!(control = %control_id, variable = %variable_id, "stale binding, not attached");
            return Ok(());
        }
        unique_unshift(&mut variable.attachment_ids, control_id);

        let targets: ControlIds = variable.attachment_ids.iter().skip(1).copied().collect();
        debug!(
            control = %control_id,
            variable = %variable_id,
            targets = targets.len(),
            "propagating change"
        );

        for target in targets {
            queue.push(PendingChange {
                control_id: target,
                source_node_id: variable_id,
                value: Some(value.clone()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATION: ParentScope = ParentScope::Operation;
    const PROGRAM: ParentScope = ParentScope::Program { is_root: false };
    const ROOT: ParentScope = ParentScope::Program { is_root: true };

    fn directives(outward: bool, inward: bool, mark_busy: bool) -> PropagationDirectives {
        PropagationDirectives {
            outward,
            inward,
            mark_busy,
        }
    }

    #[test]
    fn operation_controls_bubble_unless_fed_by_variable() {
        use ChangeSource::*;
        let classify = |source| PropagationDirectives::classify(OPERATION, source);

        assert_eq!(classify(SelfControl), directives(true, false, true));
        assert_eq!(classify(Other), directives(true, false, true));
        assert_eq!(classify(OwningOperation), directives(true, false, false));
        assert_eq!(classify(OtherVariable), directives(false, false, true));
        assert_eq!(classify(InternVariable), directives(false, false, true));
    }

    #[test]
    fn boundary_edit_goes_both_ways() {
        assert_eq!(
            PropagationDirectives::classify(PROGRAM, ChangeSource::SelfControl),
            directives(true, true, false)
        );
    }

    #[test]
    fn root_boundary_never_goes_outward() {
        assert_eq!(
            PropagationDirectives::classify(ROOT, ChangeSource::InternVariable),
            PropagationDirectives::default()
        );
        assert_eq!(
            PropagationDirectives::classify(ROOT, ChangeSource::SelfControl),
            directives(false, true, false)
        );
    }

    #[test]
    fn boundary_variables_flow_across_the_boundary() {
        assert_eq!(
            PropagationDirectives::classify(PROGRAM, ChangeSource::InternVariable),
            directives(true, false, false)
        );
        assert_eq!(
            PropagationDirectives::classify(PROGRAM, ChangeSource::OtherVariable),
            directives(false, true, false)
        );
        assert_eq!(
            PropagationDirectives::classify(PROGRAM, ChangeSource::Other),
            PropagationDirectives::default()
        );
    }

    #[test]
    fn queue_is_fifo_and_counts() {
        let mut queue = PropagationQueue::new();
        for id in 0..3 {
            queue.push(PendingChange {
                control_id: NodeId::from(id),
                source_node_id: NodeId::from(9),
                value: None,
            });
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop().unwrap().control_id, NodeId::from(0));
        assert_eq!(queue.pop().unwrap().control_id, NodeId::from(1));
        assert_eq!(queue.processed(), 2);
        assert_eq!(queue.len(), 1);
    }
}
