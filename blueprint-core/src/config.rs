//! Blueprint Configuration

use serde::{Deserialize, Serialize};

use crate::error::{BlueprintError, Result};
use crate::graph::DEFAULT_CONTROL_LABEL;

/// Tunables of the state core.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use blueprint_core::BlueprintConfig;
///
/// let config = BlueprintConfig::from_json_str(r#"{ "default_control_label": "Port" }"#).unwrap();
/// assert_eq!(config.default_control_label, "Port");
/// assert_eq!(config.max_propagation_steps, BlueprintConfig::default().max_propagation_steps);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueprintConfig {
    /// Label requested for program controls created without one.
    pub default_control_label: String,

    /// Upper bound on control updates processed for a single change.
    /// Acyclic bindings settle far below this; hitting it means a cycle.
    pub max_propagation_steps: usize,
}

impl BlueprintConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| BlueprintError::InvalidConfig(err.to_string()))
    }
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self {
            default_control_label: DEFAULT_CONTROL_LABEL.to_string(),
            max_propagation_steps: 100_000,
        }
    }
}
