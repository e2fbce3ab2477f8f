//! Blueprint Core
//!
//! This crate provides the reactive state core of the blueprint node-graph
//! editor. It implements:
//!
//! - The node tree (programs, operations, controls, variables)
//! - Control creation and the value-change entry point
//! - Variable bindings and change propagation between bound controls
//! - A single-writer container for sharing one blueprint between threads
//!
//! Running operations, rendering and persistence live outside the crate.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Node arena and the propagation scheduler
//! - `control`: Control creation and `change_control`
//! - `variable`: Variable bindings, canonical values and wire geometry
//! - `operation`: Program and operation nodes
//! - `value`: Serialized values and the value codec
//! - `state`: Shared single-writer blueprint handle
//!
//! # Example
//!
//! ```rust
//! use blueprint_core::{Blueprint, ControlChange, ControlDefinition, SerializedValue};
//!
//! let mut blueprint = Blueprint::new();
//! let root = blueprint.add_program_node(None, None, "Main")?;
//! let left = blueprint.add_operation_node(root, "left", None)?;
//! let right = blueprint.add_operation_node(root, "right", None)?;
//! let a = blueprint.add_operation_control_node(left, ControlDefinition::default())?.id();
//! let b = blueprint.add_operation_control_node(right, ControlDefinition::default())?.id();
//!
//! // Bind both controls through one variable
//! let variable = blueprint.add_variable(root, a)?;
//! blueprint.attach_control(variable, b)?;
//!
//! // Editing one control updates the other
//! blueprint.change_control(a, ControlChange::new(a).with_value(5i64))?;
//! assert_eq!(blueprint.control(b)?.value, SerializedValue::Integer(5));
//! # Ok::<(), blueprint_core::BlueprintError>(())
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod graph;
pub mod names;
pub mod operation;
pub mod state;
pub mod value;
pub mod variable;

pub use config::BlueprintConfig;
pub use control::{ControlChange, ControlDefinition};
pub use error::{BlueprintError, Result};
pub use graph::{
    Blueprint, ControlNode, ControlOption, Node, NodeId, NodeKind, OperationState, Rect,
    Visibility,
};
pub use state::SharedBlueprint;
pub use value::{SerializedValue, StandardCodec, ValueCodec, ValueType};
pub use variable::WireWaypoint;
