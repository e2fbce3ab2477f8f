//! Blueprint Nodes
//!
//! This module defines the node types that live in the blueprint tree.
//! Every node carries the same structural header (id, parent, children,
//! sibling order, frame) and a kind-specific payload in [`NodeData`].

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{BlueprintError, Result};
use crate::value::{SerializedValue, ValueType};

/// Label given to controls created without one.
pub const DEFAULT_CONTROL_LABEL: &str = "Control";

/// Unique identifier for a node in the blueprint.
///
/// Ids are allocated by the [`Blueprint`](super::Blueprint) and stay stable
/// for the lifetime of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered list of control ids (variable attachments, operation priorities).
pub type ControlIds = SmallVec<[NodeId; 4]>;

/// The kind of node in the blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A scope boundary owning operations, port controls and variables.
    Program,

    /// An instance of a computational unit.
    Operation,

    /// A named, typed value holder.
    Control,

    /// A synchronization point binding one or more controls.
    Variable,
}

/// Layout rectangle of a node on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// Lifecycle of an operation, driven by the external executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationState {
    Busy,
    #[default]
    Ready,
    Error,
}

/// How much of a control is shown on its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Collapsed,
    Expanded,
    Hidden,
}

/// A selectable literal offered by a control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlOption {
    pub value: SerializedValue,
    pub label: Option<String>,
}

impl ControlOption {
    pub fn new(value: impl Into<SerializedValue>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }
}

/// Payload of a program node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgramNode {
    pub label: String,
}

/// Payload of an operation node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationNode {
    pub name: String,
    pub label: String,
    pub state: OperationState,

    /// Bumped once per externally sourced control change. The executor
    /// discards results computed for an older version.
    pub request_version: u64,

    /// Most recently changed control first, no duplicates.
    pub priority_control_ids: ControlIds,
}

/// Payload of a control node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlNode {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub types: Vec<ValueType>,
    pub value: SerializedValue,
    pub initial_value: Option<SerializedValue>,
    pub options: Vec<ControlOption>,

    /// Index into `options` matching `value` when it was last set.
    /// Informational only: a later value change may leave it stale.
    pub selected_option_index: Option<usize>,

    pub enforce_options: bool,
    pub visibility: Visibility,
    pub writable: bool,
    pub mask_preview: bool,
    pub node_outlet_x: Option<f64>,
    pub node_outlet_y: Option<f64>,

    /// Binding in the scope containing this control's program.
    pub attached_variable_id: Option<NodeId>,

    /// Binding in the scope inside this control's program.
    pub attached_intern_variable_id: Option<NodeId>,
}

/// The canonical zero-value control template.
impl Default for ControlNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            label: DEFAULT_CONTROL_LABEL.to_string(),
            description: None,
            types: ValueType::ALL.to_vec(),
            value: SerializedValue::default(),
            initial_value: None,
            options: Vec::new(),
            selected_option_index: None,
            enforce_options: true,
            visibility: Visibility::Collapsed,
            writable: true,
            mask_preview: false,
            node_outlet_x: None,
            node_outlet_y: None,
            attached_variable_id: None,
            attached_intern_variable_id: None,
        }
    }
}

/// Payload of a variable node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableNode {
    /// Never empty once created. Index 0 is the canonical control.
    pub attachment_ids: ControlIds,
}

/// Kind-specific node payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeData {
    Program(ProgramNode),
    Operation(OperationNode),
    Control(ControlNode),
    Variable(VariableNode),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Program(_) => NodeKind::Program,
            NodeData::Operation(_) => NodeKind::Operation,
            NodeData::Control(_) => NodeKind::Control,
            NodeData::Variable(_) => NodeKind::Variable,
        }
    }
}

/// A node in the blueprint tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node.
    pub(crate) id: NodeId,

    /// Owner of this node. `None` for the root program.
    pub(crate) parent_id: Option<NodeId>,

    /// Owned children, in insertion order.
    pub(crate) child_ids: Vec<NodeId>,

    /// Sibling sort key.
    pub order: i32,

    /// Canvas rectangle, if the node has been laid out.
    pub frame: Option<Rect>,

    /// Kind-specific payload.
    pub data: NodeData,
}

macro_rules! typed_accessors {
    ($variant:ident, $payload:ty, $as_ref:ident, $as_mut:ident) => {
        #[doc = concat!("Borrow the ", stringify!($variant), " payload, failing on kind mismatch.")]
        pub fn $as_ref(&self) -> Result<&$payload> {
            match &self.data {
                NodeData::$variant(payload) => Ok(payload),
                other => Err(BlueprintError::NodeTypeMismatch {
                    id: self.id,
                    expected: NodeKind::$variant,
                    found: other.kind(),
                }),
            }
        }

        #[doc = concat!("Mutably borrow the ", stringify!($variant), " payload, failing on kind mismatch.")]
        pub fn $as_mut(&mut self) -> Result<&mut $payload> {
            let id = self.id;
            match &mut self.data {
                NodeData::$variant(payload) => Ok(payload),
                other => Err(BlueprintError::NodeTypeMismatch {
                    id,
                    expected: NodeKind::$variant,
                    found: other.kind(),
                }),
            }
        }
    };
}

impl Node {
    /// Create an unattached node. The blueprint assigns the final parent.
    pub(crate) fn new(id: NodeId, parent_id: Option<NodeId>, frame: Option<Rect>, data: NodeData) -> Self {
        Self {
            id,
            parent_id,
            child_ids: Vec::new(),
            order: 0,
            frame,
            data,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent_id
    }

    pub fn child_ids(&self) -> &[NodeId] {
        &self.child_ids
    }

    /// Fail with a type mismatch unless this node is of the given kind.
    pub fn expect_kind(&self, expected: NodeKind) -> Result<&Self> {
        if self.kind() == expected {
            Ok(self)
        } else {
            Err(BlueprintError::NodeTypeMismatch {
                id: self.id,
                expected,
                found: self.kind(),
            })
        }
    }

    typed_accessors!(Program, ProgramNode, as_program, as_program_mut);
    typed_accessors!(Operation, OperationNode, as_operation, as_operation_mut);
    typed_accessors!(Control, ControlNode, as_control, as_control_mut);
    typed_accessors!(Variable, VariableNode, as_variable, as_variable_mut);
}

/// Move `id` to the front of `ids`, removing any previous occurrence.
pub(crate) fn unique_unshift(ids: &mut ControlIds, id: NodeId) {
    ids.retain(|existing| *existing != id);
    ids.insert(0, id);
}
