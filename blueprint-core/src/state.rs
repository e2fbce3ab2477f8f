//! Shared State
//!
//! The blueprint itself is a plain single-threaded value: every mutation
//! takes `&mut Blueprint` and runs to completion, propagation included.
//! [`SharedBlueprint`] is the single-writer container for callers on
//! several threads (UI, executor callbacks): each `edit` holds the lock
//! for one whole change, so no caller ever sees a half-propagated state.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::graph::Blueprint;

/// A cloneable handle to one blueprint.
#[derive(Debug, Clone, Default)]
pub struct SharedBlueprint {
    inner: Arc<Mutex<Blueprint>>,
}

impl SharedBlueprint {
    pub fn new(blueprint: Blueprint) -> Self {
        Self {
            inner: Arc::new(Mutex::new(blueprint)),
        }
    }

    /// Run a mutation with exclusive access.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Blueprint) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Run a read-only query.
    pub fn read<R>(&self, f: impl FnOnce(&Blueprint) -> R) -> R {
        let guard = self.inner.lock();
        f(&guard)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Blueprint {
        self.inner.lock().clone()
    }
}

impl From<Blueprint> for SharedBlueprint {
    fn from(blueprint: Blueprint) -> Self {
        Self::new(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ControlChange, ControlDefinition};
    use crate::value::SerializedValue;
    use std::thread;

    #[test]
    fn edits_from_many_threads_are_serialized() {
        let shared = SharedBlueprint::default();
        let (op, control) = shared.edit(|blueprint| {
            let root = blueprint.add_program_node(None, None, "Main").unwrap();
            let op = blueprint.add_operation_node(root, "counter", None).unwrap();
            let control = blueprint
                .add_operation_control_node(op, ControlDefinition::default())
                .unwrap()
                .id();
            (op, control)
        });

        let handles: Vec<_> = (0..8i64)
            .map(|n| {
                let shared = shared.clone();
                thread::spawn(move || {
                    shared.edit(|blueprint| {
                        blueprint
                            .change_control(control, ControlChange::new(control).with_value(n + 1))
                            .unwrap();
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let version = shared.read(|blueprint| blueprint.operation(op).unwrap().request_version);
        assert_eq!(version, 8);

        let snapshot = shared.snapshot();
        assert!(matches!(
            snapshot.control(control).unwrap().value,
            SerializedValue::Integer(1..=8)
        ));
    }
}
