//! Blueprint Graph
//!
//! This module implements the node tree of a blueprint and the scheduler
//! that keeps bound control values consistent.
//!
//! # Overview
//!
//! The blueprint is a tree of nodes:
//!
//! - Programs are scopes. They own operations, port controls, variables
//!   and nested programs.
//! - Operations wrap computational units and own their parameter controls.
//! - Controls hold values.
//! - Variables bind controls of one program scope together.
//!
//! Variables add a second, non-tree relation on top: every control listed
//! in a variable's attachments shares the variable's value.
//!
//! # Design Decisions
//!
//! 1. Nodes live in one arena keyed by id, with typed accessors that fail
//!    on kind mismatch instead of trusting the caller.
//!
//! 2. Parent and child links are updated together, never recomputed.
//!
//! 3. Propagation runs on an explicit queue rather than recursion, so a
//!    long chain of bindings cannot exhaust the stack.

mod node;
mod scheduler;
mod store;

pub use node::{
    ControlIds, ControlNode, ControlOption, Node, NodeData, NodeId, NodeKind, OperationNode,
    OperationState, ProgramNode, Rect, VariableNode, Visibility, DEFAULT_CONTROL_LABEL,
};
pub(crate) use node::unique_unshift;
pub use scheduler::{ChangeSource, ParentScope, PropagationDirectives};
pub(crate) use scheduler::{PendingChange, PropagationQueue};
pub use store::Blueprint;
